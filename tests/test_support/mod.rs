#![allow(dead_code)]

#[path = "../../src/test_xlsx.rs"]
pub mod xlsx;

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp dir")
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_examboardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn examboardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(json!({}))
}

pub fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Header and rows in the shape `datasets.import` takes: two header rows
/// zipped into `[main, sub]` pairs.
pub fn results_import(table_name: &str) -> serde_json::Value {
    json!({
        "tableName": table_name,
        "source": "semester1.xlsx",
        "header": [
            ["Roll No.", "Unnamed: 0_level_1"],
            ["Student Name", "Unnamed: 1_level_1"],
            ["Department", "Unnamed: 2_level_1"],
            ["Course", "Unnamed: 3_level_1"],
            ["Grade", "Q1 /100"],
            ["Grade", "Q2/100"],
            ["Grade", "Q3/100"],
            ["Total", "Grade.300"]
        ],
        "rows": [
            ["21CS001", "Asha", "CSE", "B.Tech", 90, 80, 80, 250],
            ["21CS002", "Ravi", "CSE", "B.Tech", 20, 20, 19.9, 59.9],
            ["21EC001", "Meena", "ECE", "B.Tech", 20, 20, 20, 60],
            ["21EC002", "Kiran", "ECE", "B.Tech", null, null, null, null]
        ]
    })
}
