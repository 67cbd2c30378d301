use crate::config::Settings;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, settings};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "settings": Settings::default() }));
    };
    match settings(conn, req) {
        Ok(s) => ok(&req.id, json!({ "settings": s })),
        Err(e) => e,
    }
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch") else {
        return err(&req.id, "bad_params", "missing patch", None);
    };
    let entries = match Settings::parse_patch(patch) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                e.message,
                Some(json!({ "key": e.key })),
            )
        }
    };
    match Settings::apply_patch(conn, &entries) {
        Ok(s) => {
            info!(keys = entries.len(), "settings updated");
            ok(&req.id, json!({ "settings": s }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
