use crate::db;
use crate::decode::RawSheet;
use crate::ingest;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, optional_str, parse_header, parse_rows, required_str, settings,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::error;

fn upload_failed(req: &Request, e: anyhow::Error) -> serde_json::Value {
    let message = format!("{e:#}");
    error!(id = %req.id, error = %message, "upload failed");
    err(&req.id, "upload_failed", format!("Upload failed: {}", message), None)
}

fn handle_upload_file(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let settings = match settings(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table_name = optional_str(req, "tableName");

    match ingest::ingest_file(
        conn,
        &path,
        table_name.as_deref(),
        settings.normalize_options(),
    ) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => upload_failed(req, e),
    }
}

/// The client already decoded the workbook and ships the two header rows
/// and the data as JSON.
fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table_name = match required_str(req, "tableName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let header = match parse_header(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rows = match parse_rows(req, header.len()) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let settings = match settings(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let source = optional_str(req, "source").unwrap_or_else(|| "ipc".to_string());

    match ingest::ingest_sheet(
        conn,
        &table_name,
        RawSheet { header, rows },
        &source,
        None,
        settings.normalize_options(),
    ) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => upload_failed(req, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "tables": [] }));
    };
    match db::list_tables(conn) {
        Ok(tables) => ok(&req.id, json!({ "tables": tables })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table_name = match required_str(req, "tableName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = db::get_all_or_empty(conn, &table_name);
    ok(
        &req.id,
        json!({
            "tableName": table_name,
            "columns": table.columns,
            "rowCount": table.rows.len(),
            "rows": table.rows_json()
        }),
    )
}

fn handle_uploads(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table_name = optional_str(req, "tableName");
    match db::uploads_list(conn, table_name.as_deref()) {
        Ok(uploads) => ok(&req.id, json!({ "uploads": uploads })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "datasets.uploadFile" => Some(handle_upload_file(state, req)),
        "datasets.import" => Some(handle_import(state, req)),
        "datasets.list" => Some(handle_list(state, req)),
        "datasets.get" => Some(handle_get(state, req)),
        "datasets.uploads" => Some(handle_uploads(state, req)),
        _ => None,
    }
}
