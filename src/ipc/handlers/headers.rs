use crate::config::Settings;
use crate::ingest;
use crate::ipc::error::ok;
use crate::ipc::helpers::parse_header;
use crate::ipc::types::{AppState, Request};
use crate::normalize::{self, display_label, NormalizeOptions};
use serde_json::json;

/// Previews the flat names for a header without storing anything. Uses the
/// workspace's normalize settings when a workspace is open.
fn handle_headers_normalize(state: &mut AppState, req: &Request) -> serde_json::Value {
    let header = match parse_header(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let options = match req.params.get("unifyGradePunctuation").and_then(|v| v.as_bool()) {
        Some(b) => NormalizeOptions {
            unify_grade_punctuation: b,
        },
        None => state
            .db
            .as_ref()
            .and_then(|conn| Settings::load(conn).ok())
            .map(|s| s.normalize_options())
            .unwrap_or_default(),
    };

    let columns = normalize::normalize_headers(&header, options);
    let labels = columns.iter().map(|c| display_label(c)).collect::<Vec<_>>();
    let warnings = ingest::check_columns(&columns);
    ok(
        &req.id,
        json!({
            "columns": columns,
            "labels": labels,
            "warnings": warnings
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "headers.normalize" => Some(handle_headers_normalize(state, req)),
        _ => None,
    }
}
