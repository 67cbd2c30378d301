//! Two-level header flattening.
//!
//! Exam exports carry a "main" header row whose cells span one or more
//! "sub" header cells in the row beneath. Each `(main, sub)` pair collapses
//! into one flat, lower-case, underscore-separated column name. Cells are
//! handled independently; the output always has one name per input pair,
//! in input order.

use crate::table::{float_text, CellValue, NormalizedTable};

/// Marker the decoder writes for a blank header cell, in lower case.
pub const PLACEHOLDER: &str = "unnamed";
pub const OVERALL_GRADE: &str = "overall_grade";

const GRADE_MAIN: &str = "grade";
const GRADE_PERIODS: [(&str, &str); 3] = [
    ("q1", "grade_q1"),
    ("q2", "grade_q2"),
    ("q3", "grade_q3"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeaderCell {
    pub main: String,
    pub sub: String,
}

impl RawHeaderCell {
    pub fn new(main: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            sub: sub.into(),
        }
    }

    /// Header cells can come back from the workbook as numbers or booleans;
    /// they are turned into text before any cleaning happens.
    pub fn from_values(main: &CellValue, sub: &CellValue) -> Self {
        Self::new(header_text(main), header_text(sub))
    }
}

pub fn header_text(v: &CellValue) -> String {
    match v {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) => float_text(*f),
        CellValue::Bool(true) => "True".to_string(),
        CellValue::Bool(false) => "False".to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Also replace `.` and spaces in the fallback name of the `grade`
    /// branch. Off by default so names match tables stored earlier.
    pub unify_grade_punctuation: bool,
}

pub fn normalize_header(cell: &RawHeaderCell, options: NormalizeOptions) -> String {
    let main = cell.main.trim().to_lowercase();
    let sub = cell.sub.trim().to_lowercase();

    if main == GRADE_MAIN {
        return grade_period_name(&sub, options);
    }

    if sub.contains(PLACEHOLDER) {
        return overall_grade_or(flatten(&main));
    }

    overall_grade_or(flatten(&format!("{}_{}", main, sub)))
}

fn grade_period_name(sub: &str, options: NormalizeOptions) -> String {
    for (needle, name) in GRADE_PERIODS {
        if sub.contains(needle) {
            return name.to_string();
        }
    }
    let name = sub.replace('/', "_");
    if options.unify_grade_punctuation {
        flatten(&name)
    } else {
        name
    }
}

fn flatten(s: &str) -> String {
    s.replace('.', "_").replace(' ', "_")
}

/// A "grade out of 300" column, however it is worded, is the overall grade.
fn overall_grade_or(name: String) -> String {
    if name.contains("grade") && name.contains("300") {
        OVERALL_GRADE.to_string()
    } else {
        name
    }
}

pub fn post_pass(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_lowercase())
        .collect()
}

pub fn normalize_headers(cells: &[RawHeaderCell], options: NormalizeOptions) -> Vec<String> {
    post_pass(
        cells
            .iter()
            .map(|c| normalize_header(c, options))
            .collect(),
    )
}

/// Renames the columns; the rows are handed through as they are.
pub fn normalize_table(
    header: &[RawHeaderCell],
    rows: Vec<Vec<CellValue>>,
    options: NormalizeOptions,
) -> NormalizedTable {
    NormalizedTable {
        columns: normalize_headers(header, options),
        rows,
    }
}

/// Column names read back from storage get one more pass before the
/// dashboards look them up.
pub fn clean_loaded_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_").replace('\n', "")
}

/// `roll_no_` -> `Roll No `. Display only.
pub fn display_label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_cased = false;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if prev_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(ch);
            prev_cased = false;
        }
    }
    out
}
