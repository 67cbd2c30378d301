use crate::config::Settings;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::normalize::RawHeaderCell;
use crate::table::CellValue;
use rusqlite::Connection;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn db_conn<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn settings(conn: &Connection, req: &Request) -> Result<Settings, serde_json::Value> {
    Settings::load(conn).map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))
}

/// `header: [[main, sub], ...]`. Labels may be strings, numbers or booleans.
pub fn parse_header(req: &Request) -> Result<Vec<RawHeaderCell>, serde_json::Value> {
    let Some(raw) = req.params.get("header").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing header", None));
    };
    let mut out = Vec::with_capacity(raw.len());
    for (i, pair) in raw.iter().enumerate() {
        match pair.as_array().map(|p| p.as_slice()) {
            Some([main, sub]) => out.push(RawHeaderCell::from_values(
                &CellValue::from_json(main),
                &CellValue::from_json(sub),
            )),
            _ => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("header[{}] must be a [main, sub] pair", i),
                    None,
                ))
            }
        }
    }
    Ok(out)
}

/// `rows: [[cell, ...], ...]`, each row exactly as wide as the header.
pub fn parse_rows(
    req: &Request,
    width: usize,
) -> Result<Vec<Vec<CellValue>>, serde_json::Value> {
    let Some(raw) = req.params.get("rows") else {
        return Ok(Vec::new());
    };
    let Some(rows) = raw.as_array() else {
        return Err(err(&req.id, "bad_params", "rows must be an array", None));
    };
    let mut out = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let Some(cells) = row.as_array() else {
            return Err(err(
                &req.id,
                "bad_params",
                format!("rows[{}] must be an array", i),
                None,
            ));
        };
        if cells.len() != width {
            return Err(err(
                &req.id,
                "bad_params",
                format!("rows[{}] has {} cells, header has {}", i, cells.len(), width),
                None,
            ));
        }
        out.push(cells.iter().map(CellValue::from_json).collect());
    }
    Ok(out)
}
