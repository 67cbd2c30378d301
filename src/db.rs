use crate::error::{LookupError, StoreError};
use crate::table::{CellValue, NormalizedTable, Record};
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

pub const DB_FILE: &str = "examboard.sqlite3";
const INTERNAL_PREFIX: &str = "_examboard_";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _examboard_uploads(
            id TEXT PRIMARY KEY,
            table_name TEXT NOT NULL,
            source TEXT NOT NULL,
            sha256 TEXT,
            row_count INTEGER NOT NULL,
            column_count INTEGER NOT NULL,
            uploaded_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_examboard_uploads_table ON _examboard_uploads(table_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS _examboard_settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let bad = name.trim().is_empty()
        || name.contains('\0')
        || name.starts_with(INTERNAL_PREFIX)
        || name.to_ascii_lowercase().starts_with("sqlite_");
    if bad {
        return Err(StoreError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |_| Ok(()),
    )
    .optional()
    .map(|v| v.is_some())
}

pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let cols = stmt
        .query_map([], |r| r.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub table_name: String,
    pub created: bool,
    pub rows_inserted: usize,
    pub column_count: usize,
}

/// Creates the table on first use (every column TEXT) and appends all rows
/// in their original order. The whole append runs in one transaction.
pub fn upload(
    conn: &Connection,
    table_name: &str,
    table: &NormalizedTable,
) -> Result<UploadSummary, StoreError> {
    validate_table_name(table_name)?;
    let expected = table.columns.len();
    for (i, row) in table.rows.iter().enumerate() {
        if row.len() != expected {
            return Err(StoreError::RowArity {
                row: i,
                found: row.len(),
                expected,
            });
        }
    }

    let tx = conn.unchecked_transaction()?;
    let created = !table_exists(&tx, table_name)?;
    if created {
        let cols = table
            .columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute(
            &format!("CREATE TABLE {} ({})", quote_ident(table_name), cols),
            [],
        )?;
    } else {
        let existing = table_columns(&tx, table_name)?;
        if let Some(missing) = table.columns.iter().find(|c| !existing.contains(c)) {
            return Err(StoreError::SchemaMismatch {
                table: table_name.to_string(),
                column: missing.clone(),
            });
        }
    }

    if !table.rows.is_empty() {
        let col_list = table
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; expected].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table_name),
            col_list,
            placeholders
        );
        let mut stmt = tx.prepare(&sql)?;
        for row in &table.rows {
            stmt.execute(params_from_iter(row.iter().map(CellValue::to_sql_text)))?;
        }
    }
    tx.commit()?;

    info!(
        table = table_name,
        created,
        rows = table.rows.len(),
        columns = expected,
        "dataset rows appended"
    );
    Ok(UploadSummary {
        table_name: table_name.to_string(),
        created,
        rows_inserted: table.rows.len(),
        column_count: expected,
    })
}

pub fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names
        .into_iter()
        .filter(|n| !n.starts_with(INTERNAL_PREFIX) && !n.starts_with("sqlite_"))
        .collect())
}

fn value_to_cell(v: Value) -> CellValue {
    match v {
        Value::Null => CellValue::Empty,
        Value::Integer(i) => CellValue::Int(i),
        Value::Real(f) => CellValue::Float(f),
        Value::Text(s) => CellValue::Text(s),
        Value::Blob(b) => CellValue::Text(String::from_utf8_lossy(&b).to_string()),
    }
}

pub fn get_all(conn: &Connection, table: &str) -> Result<NormalizedTable, StoreError> {
    if !table_exists(conn, table)? {
        return Err(StoreError::UnknownTable(table.to_string()));
    }
    let columns = table_columns(conn, table)?;
    let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let width = columns.len();
    let rows = stmt
        .query_map([], |r| {
            (0..width)
                .map(|i| r.get::<_, Value>(i).map(value_to_cell))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NormalizedTable { columns, rows })
}

/// Empty table when the dataset is absent or cannot be read.
pub fn get_all_or_empty(conn: &Connection, table: &str) -> NormalizedTable {
    match get_all(conn, table) {
        Ok(t) => t,
        Err(e) => {
            warn!(table, error = %e, "dataset could not be read");
            NormalizedTable::default()
        }
    }
}

pub fn get_by_key(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: &str,
) -> Result<Record, LookupError> {
    if !table_exists(conn, table)? {
        return Err(LookupError::UnknownTable(table.to_string()));
    }
    let columns = table_columns(conn, table)?;
    if !columns.iter().any(|c| c == key_column) {
        return Err(LookupError::MissingKeyColumn {
            table: table.to_string(),
            column: key_column.to_string(),
        });
    }

    let sql = format!(
        "SELECT * FROM {} WHERE {} = ? ORDER BY rowid LIMIT 1",
        quote_ident(table),
        quote_ident(key_column)
    );
    let width = columns.len();
    let values = conn
        .query_row(&sql, [key], |r| {
            (0..width)
                .map(|i| r.get::<_, Value>(i).map(value_to_cell))
                .collect::<Result<Vec<_>, _>>()
        })
        .optional()?;

    match values {
        Some(values) => Ok(Record::new(columns.into_iter().zip(values).collect())),
        None => Err(LookupError::NotFound {
            column: key_column.to_string(),
            key: key.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub id: String,
    pub table_name: String,
    pub source: String,
    pub sha256: Option<String>,
    pub row_count: i64,
    pub column_count: i64,
    pub uploaded_at: String,
}

pub fn record_upload(conn: &Connection, rec: &UploadRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO _examboard_uploads(
            id, table_name, source, sha256, row_count, column_count, uploaded_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        (
            &rec.id,
            &rec.table_name,
            &rec.source,
            &rec.sha256,
            rec.row_count,
            rec.column_count,
            &rec.uploaded_at,
        ),
    )?;
    Ok(())
}

pub fn uploads_list(
    conn: &Connection,
    table: Option<&str>,
) -> rusqlite::Result<Vec<UploadRecord>> {
    let mut sql = String::from(
        "SELECT id, table_name, source, sha256, row_count, column_count, uploaded_at
         FROM _examboard_uploads",
    );
    let mut bind: Vec<Value> = Vec::new();
    if let Some(t) = table {
        sql.push_str(" WHERE table_name = ?");
        bind.push(Value::Text(t.to_string()));
    }
    sql.push_str(" ORDER BY uploaded_at, rowid");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bind), |r| {
            Ok(UploadRecord {
                id: r.get(0)?,
                table_name: r.get(1)?,
                source: r.get(2)?,
                sha256: r.get(3)?,
                row_count: r.get(4)?,
                column_count: r.get(5)?,
                uploaded_at: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> Result<Option<serde_json::Value>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM _examboard_settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), StoreError> {
    let s = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO _examboard_settings(key, value_json) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, s),
    )?;
    Ok(())
}
