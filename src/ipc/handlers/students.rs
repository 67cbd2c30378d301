use crate::dashboard;
use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{db_conn, required_str, settings};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::debug;

/// Single-student lookup by roll number. "Not found" and "could not look"
/// both answer `student: null`; `reason` says which one it was.
fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table_name = match required_str(req, "tableName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roll_no = match required_str(req, "rollNo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let settings = match settings(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match db::get_by_key(conn, &table_name, &settings.key_column, &roll_no) {
        Ok(record) => ok(
            &req.id,
            json!({
                "student": dashboard::student_profile(&record, settings.pass_mark),
                "reason": null
            }),
        ),
        Err(e) => {
            debug!(table = %table_name, error = %e, "student lookup empty");
            ok(
                &req.id,
                json!({
                    "student": null,
                    "reason": e.code(),
                    "message": e.to_string()
                }),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.get" => Some(handle_students_get(state, req)),
        _ => None,
    }
}
