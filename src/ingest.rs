use crate::db;
use crate::decode::{self, RawSheet};
use crate::normalize::{self, NormalizeOptions, OVERALL_GRADE};
use anyhow::Context;
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub upload_id: String,
    pub table_name: String,
    pub source: String,
    pub sha256: Option<String>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub created: bool,
    pub warnings: Vec<String>,
}

/// `Semester 1 Results.xlsx` -> `semester_1_results`.
pub fn table_name_for_file(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_lowercase().replace(' ', "_"))
        .unwrap_or_default()
}

/// The normalizer never rejects a header; these are the problems worth
/// surfacing to whoever uploaded the file.
pub fn check_columns(columns: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();
    for (i, c) in columns.iter().enumerate() {
        if c.is_empty() {
            warnings.push(format!("column {} has an empty name", i));
        }
    }
    let overall = columns.iter().filter(|c| *c == OVERALL_GRADE).count();
    if overall > 1 {
        warnings.push(format!("{} columns were detected as {}", overall, OVERALL_GRADE));
    }
    let mut seen = HashSet::new();
    for c in columns {
        if !c.is_empty() && c != OVERALL_GRADE && !seen.insert(c.as_str()) {
            warnings.push(format!("duplicate column name {}", c));
        }
    }
    warnings
}

pub fn ingest_sheet(
    conn: &Connection,
    table_name: &str,
    sheet: RawSheet,
    source: &str,
    sha256: Option<String>,
    options: NormalizeOptions,
) -> anyhow::Result<IngestSummary> {
    let span = info_span!("ingest", table = table_name, source);
    let _enter = span.enter();

    let table = normalize::normalize_table(&sheet.header, sheet.rows, options);
    let warnings = check_columns(&table.columns);
    for w in &warnings {
        warn!("{}", w);
    }

    let uploaded = db::upload(conn, table_name, &table)
        .with_context(|| format!("failed to store dataset {}", table_name))?;

    let rec = db::UploadRecord {
        id: Uuid::new_v4().to_string(),
        table_name: table_name.to_string(),
        source: source.to_string(),
        sha256: sha256.clone(),
        row_count: table.rows.len() as i64,
        column_count: table.columns.len() as i64,
        uploaded_at: chrono::Utc::now().to_rfc3339(),
    };
    db::record_upload(conn, &rec).context("failed to record upload")?;

    info!(
        rows = table.rows.len(),
        columns = table.columns.len(),
        created = uploaded.created,
        "dataset ingested"
    );
    Ok(IngestSummary {
        upload_id: rec.id,
        table_name: table_name.to_string(),
        source: source.to_string(),
        sha256,
        columns: table.columns,
        row_count: uploaded.rows_inserted,
        created: uploaded.created,
        warnings,
    })
}

pub fn ingest_file(
    conn: &Connection,
    path: &Path,
    table_name: Option<&str>,
    options: NormalizeOptions,
) -> anyhow::Result<IngestSummary> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));

    let sheet = decode::read_workbook(path)
        .with_context(|| format!("failed to decode {}", path.to_string_lossy()))?;

    let name = match table_name {
        Some(n) => n.to_string(),
        None => table_name_for_file(path),
    };
    let source = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    ingest_sheet(conn, &name, sheet, &source, Some(sha256), options)
}
