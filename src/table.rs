use serde_json::json;

/// One data cell as it came out of the workbook, or as it was read back from
/// storage (where everything is TEXT or NULL).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Text stored in a TEXT column. `None` is written as NULL.
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) if f.is_nan() => None,
            CellValue::Float(f) => Some(float_text(*f)),
            CellValue::Bool(b) => Some(if *b { "1".to_string() } else { "0".to_string() }),
        }
    }

    pub fn as_text(&self) -> Option<String> {
        self.to_sql_text()
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Empty => serde_json::Value::Null,
            CellValue::Text(s) => json!(s),
            CellValue::Int(i) => json!(i),
            CellValue::Float(f) if f.is_finite() => json!(f),
            CellValue::Float(_) => serde_json::Value::Null,
            CellValue::Bool(b) => json!(b),
        }
    }

    pub fn from_json(v: &serde_json::Value) -> CellValue {
        match v {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else {
                    n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Empty)
                }
            }
            serde_json::Value::String(s) if s.is_empty() => CellValue::Empty,
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

/// Whole floats print like integers (`21001`, not `21001.0`).
pub fn float_text(f: f64) -> String {
    match whole_number(f) {
        Some(i) => i.to_string(),
        None => f.to_string(),
    }
}

/// `Some` for finite floats without a fraction that fit in an `i64`.
/// Workbooks store every number as a float; these are the integers.
pub fn whole_number(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    if f.is_finite() && f.fract() == 0.0 && in_range {
        Some(f as i64)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl NormalizedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rows_json(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|r| serde_json::Value::Array(r.iter().map(CellValue::to_json).collect()))
            .collect()
    }
}

/// A single stored row keyed by column name, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new(fields: Vec<(String, CellValue)>) -> Self {
        Self { fields }
    }

    /// `None` when the column does not exist; `Some(CellValue::Empty)` when
    /// it exists but holds nothing.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v)
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(CellValue::as_text)
    }

    pub fn fields(&self) -> &[(String, CellValue)] {
        &self.fields
    }
}
