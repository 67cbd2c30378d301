//! Numbers behind the dashboards: KPIs, distributions, department
//! breakdowns, the roster and single-student profiles. Rendering is the
//! front-end's job; everything here is plain serializable data.

use crate::normalize::{clean_loaded_column, display_label, OVERALL_GRADE};
use crate::table::{CellValue, NormalizedTable, Record};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const GRADE_COLUMNS: [&str; 3] = ["grade_q1", "grade_q2", "grade_q3"];
pub const ROSTER_COLUMNS: [&str; 7] = [
    "student_name",
    "roll_no_",
    "register_no_",
    "department",
    "year",
    OVERALL_GRADE,
    "result",
];
pub const NO_VALUE: &str = "—";
pub const EXAM_BINS: usize = 15;
const TOP_PER_DEPARTMENT: usize = 3;

/// Non-numeric and non-finite values count as missing.
pub fn numeric(v: &CellValue) -> Option<f64> {
    let n = match v {
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Float(f) => Some(*f),
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
    };
    n.filter(|f| f.is_finite())
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    /// A missing grade is a fail.
    pub fn from_grade(grade: Option<f64>, pass_mark: f64) -> Outcome {
        match grade {
            Some(g) if g >= pass_mark => Outcome::Pass,
            _ => Outcome::Fail,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "Pass",
            Outcome::Fail => "Fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRow {
    pub overall_grade: Option<f64>,
    /// `None` when the dataset has no overall grade column at all.
    pub result: Option<Outcome>,
    pub department: Option<String>,
    pub student_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub student_count: usize,
    pub average: Option<f64>,
    pub top: Option<f64>,
    pub lowest: Option<f64>,
    pub pass_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentAverage {
    pub department: String,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamDistribution {
    pub column: String,
    pub label: String,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamMean {
    pub column: String,
    pub label: String,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStudent {
    pub rank: usize,
    pub name: String,
    pub overall_grade: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDetail {
    pub department: String,
    pub student_count: usize,
    pub average: Option<f64>,
    pub distribution: Vec<Bin>,
    pub top: Vec<TopStudent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnLabel {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    pub columns: Vec<ColumnLabel>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileField {
    pub key: String,
    pub label: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RadarPoint {
    pub axis: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub name: String,
    pub left: Vec<ProfileField>,
    pub right: Vec<ProfileField>,
    pub result: Option<Outcome>,
    pub radar: Vec<RadarPoint>,
}

pub fn exam_label(column: &str) -> String {
    match column {
        "grade_q1" => "Q1 (out of 100)".to_string(),
        "grade_q2" => "Q2 (out of 100)".to_string(),
        "grade_q3" => "Q3 (out of 100)".to_string(),
        other => other.to_string(),
    }
}

/// Equal-width bins over the observed range; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![Bin {
            label: format!("{}", min),
            min,
            max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lo = min + width * i as f64;
            let hi = if i + 1 == bins { max } else { min + width * (i + 1) as f64 };
            Bin {
                label: format!("{}-{}", round1(lo), round1(hi)),
                min: lo,
                max: hi,
                count,
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn text_value(v: Option<&CellValue>) -> Option<String> {
    v.and_then(CellValue::as_text)
        .filter(|s| !s.trim().is_empty())
}

/// Grade descending, missing grades last.
fn by_grade_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct Analysis {
    pub table: NormalizedTable,
    pub rows: Vec<DerivedRow>,
}

impl Analysis {
    pub fn new(mut table: NormalizedTable, pass_mark: f64) -> Self {
        table.columns = table
            .columns
            .iter()
            .map(|c| clean_loaded_column(c))
            .collect();

        let overall_idx = table.column_index(OVERALL_GRADE);
        let dept_idx = table.column_index("department");
        let name_idx = table.column_index("student_name");

        let rows = table
            .rows
            .iter()
            .map(|r| {
                let overall_grade = overall_idx.and_then(|i| r.get(i)).and_then(numeric);
                DerivedRow {
                    overall_grade,
                    result: overall_idx.map(|_| Outcome::from_grade(overall_grade, pass_mark)),
                    department: text_value(dept_idx.and_then(|i| r.get(i))),
                    student_name: text_value(name_idx.and_then(|i| r.get(i))),
                }
            })
            .collect();

        Self { table, rows }
    }

    pub fn has_overall(&self) -> bool {
        self.table.has_column(OVERALL_GRADE)
    }

    pub fn has_department(&self) -> bool {
        self.table.has_column("department")
    }

    fn overall_values(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.overall_grade).collect()
    }

    fn column_values(&self, column: &str) -> Vec<f64> {
        let Some(idx) = self.table.column_index(column) else {
            return Vec::new();
        };
        self.table
            .rows
            .iter()
            .filter_map(|r| r.get(idx).and_then(numeric))
            .collect()
    }

    pub fn course_name(&self) -> String {
        self.table
            .column_index("course")
            .and_then(|i| self.table.rows.first().and_then(|r| r.get(i)))
            .and_then(CellValue::as_text)
            .unwrap_or_else(|| NO_VALUE.to_string())
    }

    pub fn kpis(&self) -> Option<Kpis> {
        if !self.has_overall() {
            return None;
        }
        let values = self.overall_values();
        let total = self.rows.len();
        let passed = self
            .rows
            .iter()
            .filter(|r| r.result == Some(Outcome::Pass))
            .count();
        Some(Kpis {
            student_count: total,
            average: mean(&values).map(round1),
            top: values.iter().copied().reduce(f64::max),
            lowest: values.iter().copied().reduce(f64::min),
            pass_rate: if total > 0 {
                Some(round1(100.0 * passed as f64 / total as f64))
            } else {
                None
            },
        })
    }

    pub fn overall_distribution(&self, bins: usize) -> Vec<Bin> {
        histogram(&self.overall_values(), bins)
    }

    fn by_department(&self) -> BTreeMap<String, Vec<&DerivedRow>> {
        let mut out: BTreeMap<String, Vec<&DerivedRow>> = BTreeMap::new();
        for r in &self.rows {
            if let Some(d) = &r.department {
                out.entry(d.clone()).or_default().push(r);
            }
        }
        out
    }

    /// Ascending by average; departments without any numeric grade last.
    pub fn department_averages(&self) -> Vec<DepartmentAverage> {
        if !self.has_overall() {
            return Vec::new();
        }
        let mut out = self
            .by_department()
            .into_iter()
            .map(|(department, rows)| {
                let values = rows.iter().filter_map(|r| r.overall_grade).collect::<Vec<_>>();
                DepartmentAverage {
                    department,
                    average: mean(&values),
                }
            })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| match (a.average, b.average) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        out
    }

    pub fn result_counts(&self) -> Vec<LabelCount> {
        if !self.has_overall() {
            return Vec::new();
        }
        let mut out = [Outcome::Pass, Outcome::Fail]
            .iter()
            .map(|o| LabelCount {
                label: o.as_str().to_string(),
                count: self.rows.iter().filter(|r| r.result == Some(*o)).count(),
            })
            .filter(|lc| lc.count > 0)
            .collect::<Vec<_>>();
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    /// Department counts among rows with the given outcome, largest first.
    pub fn outcome_by_department(&self, outcome: Outcome) -> Vec<LabelCount> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in &self.rows {
            if r.result == Some(outcome) {
                if let Some(d) = &r.department {
                    *counts.entry(d.clone()).or_default() += 1;
                }
            }
        }
        let mut out = counts
            .into_iter()
            .map(|(label, count)| LabelCount { label, count })
            .collect::<Vec<_>>();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        out
    }

    pub fn exam_columns(&self) -> Vec<&'static str> {
        GRADE_COLUMNS
            .iter()
            .copied()
            .filter(|c| self.table.has_column(c))
            .collect()
    }

    pub fn exam_distributions(&self, bins: usize) -> Vec<ExamDistribution> {
        self.exam_columns()
            .into_iter()
            .map(|c| ExamDistribution {
                column: c.to_string(),
                label: exam_label(c),
                bins: histogram(&self.column_values(c), bins),
            })
            .collect()
    }

    pub fn exam_comparison(&self) -> Vec<ExamMean> {
        self.exam_columns()
            .into_iter()
            .map(|c| ExamMean {
                column: c.to_string(),
                label: exam_label(c),
                mean: mean(&self.column_values(c)),
            })
            .collect()
    }

    pub fn department_details(&self, bins: usize) -> Vec<DepartmentDetail> {
        self.by_department()
            .into_iter()
            .map(|(department, mut rows)| {
                let values = rows.iter().filter_map(|r| r.overall_grade).collect::<Vec<_>>();
                rows.sort_by(|a, b| by_grade_desc(a.overall_grade, b.overall_grade));
                let top = rows
                    .iter()
                    .take(TOP_PER_DEPARTMENT)
                    .enumerate()
                    .map(|(i, r)| TopStudent {
                        rank: i + 1,
                        name: r
                            .student_name
                            .clone()
                            .unwrap_or_else(|| NO_VALUE.to_string()),
                        overall_grade: r.overall_grade,
                    })
                    .collect();
                DepartmentDetail {
                    department,
                    student_count: rows.len(),
                    average: mean(&values),
                    distribution: histogram(&values, bins),
                    top,
                }
            })
            .collect()
    }

    pub fn roster(&self) -> Roster {
        let present = ROSTER_COLUMNS
            .iter()
            .copied()
            .filter(|c| {
                if *c == "result" {
                    self.has_overall()
                } else {
                    self.table.has_column(c)
                }
            })
            .collect::<Vec<_>>();

        let columns = present
            .iter()
            .map(|c| ColumnLabel {
                key: c.to_string(),
                label: display_label(c),
            })
            .collect();

        let rows = self
            .table
            .rows
            .iter()
            .zip(&self.rows)
            .map(|(raw, derived)| {
                present
                    .iter()
                    .map(|c| match *c {
                        "result" => derived
                            .result
                            .map(|o| serde_json::json!(o.as_str()))
                            .unwrap_or(serde_json::Value::Null),
                        OVERALL_GRADE => derived
                            .overall_grade
                            .map(|g| serde_json::json!(g))
                            .unwrap_or(serde_json::Value::Null),
                        other => self
                            .table
                            .column_index(other)
                            .and_then(|i| raw.get(i))
                            .map(CellValue::to_json)
                            .unwrap_or(serde_json::Value::Null),
                    })
                    .collect()
            })
            .collect();

        Roster { columns, rows }
    }
}

/// Field list split in two halves for side-by-side display, plus Q1..Q3
/// radar values (empty grades plot as 0).
pub fn student_profile(record: &Record, pass_mark: f64) -> StudentProfile {
    let fields = record
        .fields()
        .iter()
        .map(|(k, v)| ProfileField {
            key: k.clone(),
            label: display_label(k),
            value: v.to_json(),
        })
        .collect::<Vec<_>>();
    let mid = fields.len() / 2;
    let right = fields[mid..].to_vec();
    let left = fields[..mid].to_vec();

    let radar = GRADE_COLUMNS
        .iter()
        .filter_map(|c| {
            record.get(c).map(|v| RadarPoint {
                axis: c.trim_start_matches("grade_").to_uppercase(),
                value: numeric(v).unwrap_or(0.0),
            })
        })
        .collect();

    let result = record
        .get(OVERALL_GRADE)
        .map(|v| Outcome::from_grade(numeric(v), pass_mark));

    StudentProfile {
        name: record
            .text("student_name")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Student".to_string()),
        left,
        right,
        result,
        radar,
    }
}
