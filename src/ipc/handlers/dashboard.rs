use crate::config::Settings;
use crate::dashboard::{Analysis, Outcome, EXAM_BINS};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str, settings};
use crate::ipc::types::{AppState, Request};
use crate::normalize::display_label;
use rusqlite::Connection;
use serde_json::json;

fn parse_bins(req: &Request, default: usize) -> Result<usize, serde_json::Value> {
    match req.params.get("bins") {
        None | Some(serde_json::Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .filter(|n| (1..=200).contains(n))
            .map(|n| n as usize)
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    "bins must be an integer in 1..=200",
                    None,
                )
            }),
    }
}

fn open_analysis(
    conn: &Connection,
    req: &Request,
) -> Result<(String, Settings, Analysis), serde_json::Value> {
    let table_name = required_str(req, "tableName")?;
    let settings = settings(conn, req)?;
    let table = db::get_all_or_empty(conn, &table_name);
    let analysis = Analysis::new(table, settings.pass_mark);
    Ok((table_name, settings, analysis))
}

fn handle_dashboard_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (table_name, settings, analysis) = match open_analysis(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bins = match parse_bins(req, settings.dashboard_bins) {
        Ok(v) => v,
        Err(e) => return e,
    };

    if analysis.table.is_empty() {
        return ok(
            &req.id,
            json!({
                "tableName": table_name,
                "displayName": display_label(&table_name),
                "empty": true
            }),
        );
    }

    ok(
        &req.id,
        json!({
            "tableName": table_name,
            "displayName": display_label(&table_name),
            "empty": false,
            "course": analysis.course_name(),
            "passMark": settings.pass_mark,
            "kpis": analysis.kpis(),
            "overallDistribution": analysis.overall_distribution(bins),
            "departmentAverages": analysis.department_averages(),
            "resultCounts": analysis.result_counts(),
            "passByDepartment": analysis.outcome_by_department(Outcome::Pass),
            "failByDepartment": analysis.outcome_by_department(Outcome::Fail),
            "examDistributions": analysis.exam_distributions(EXAM_BINS),
            "examComparison": analysis.exam_comparison()
        }),
    )
}

fn handle_dashboard_departments(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (table_name, _, analysis) = match open_analysis(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bins = match parse_bins(req, EXAM_BINS) {
        Ok(v) => v,
        Err(e) => return e,
    };

    ok(
        &req.id,
        json!({
            "tableName": table_name,
            "hasDepartment": analysis.has_department(),
            "departments": analysis.department_details(bins)
        }),
    )
}

fn handle_dashboard_roster(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (table_name, _, analysis) = match open_analysis(conn, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let roster = analysis.roster();
    ok(
        &req.id,
        json!({
            "tableName": table_name,
            "columns": roster.columns,
            "rows": roster.rows
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.open" => Some(handle_dashboard_open(state, req)),
        "dashboard.departments" => Some(handle_dashboard_departments(state, req)),
        "dashboard.roster" => Some(handle_dashboard_roster(state, req)),
        _ => None,
    }
}
