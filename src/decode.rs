use crate::normalize::RawHeaderCell;
use crate::table::{whole_number, CellValue};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("worksheet has no columns")]
    EmptySheet,
    #[error("worksheet needs two header rows, found {0}")]
    MissingHeader(usize),
}

/// First worksheet split into its two header rows and the data below them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub header: Vec<RawHeaderCell>,
    pub rows: Vec<Vec<CellValue>>,
}

pub fn read_workbook(path: &Path) -> Result<RawSheet, DecodeError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(r) => r?,
        None => return Err(DecodeError::NoWorksheet),
    };
    split_two_level_header(&range)
}

/// Dates are stored the way a dataframe prints a timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn cell_value(d: &Data) -> CellValue {
    match d {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        // xlsx keeps every number as a float; whole ones were typed as integers.
        Data::Float(f) => match whole_number(*f) {
            Some(i) => CellValue::Int(i),
            None => CellValue::Float(*f),
        },
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if !dt.is_duration() => {
                CellValue::Text(ts.format(TIMESTAMP_FORMAT).to_string())
            }
            _ => CellValue::Text(dt.to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Column indexes count from column A, even when the used range starts
/// further right. Leading blank rows are not part of the range.
pub fn split_two_level_header(range: &Range<Data>) -> Result<RawSheet, DecodeError> {
    if range.width() == 0 {
        return Err(DecodeError::EmptySheet);
    }
    let offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);
    let width = offset + range.width();
    let cell = |row: &[Data], col: usize| {
        col.checked_sub(offset)
            .and_then(|c| row.get(c))
            .map(cell_value)
            .unwrap_or(CellValue::Empty)
    };
    let height = range.height();
    if height < 2 {
        return Err(DecodeError::MissingHeader(height));
    }

    let mut rows = range.rows();
    let (Some(main_row), Some(sub_row)) = (rows.next(), rows.next()) else {
        return Err(DecodeError::MissingHeader(height));
    };

    let mut header = Vec::with_capacity(width);
    // Merged main cells only carry their label in the leftmost cell.
    let mut last_main: Option<CellValue> = None;
    for col in 0..width {
        let main = cell(main_row, col);
        let main = if main.is_empty() {
            match &last_main {
                Some(prev) => prev.clone(),
                None => CellValue::Text(format!("Unnamed: {}_level_0", col)),
            }
        } else {
            last_main = Some(main.clone());
            main
        };

        let sub = cell(sub_row, col);
        let sub = if sub.is_empty() {
            CellValue::Text(format!("Unnamed: {}_level_1", col))
        } else {
            sub
        };

        header.push(RawHeaderCell::from_values(&main, &sub));
    }

    let data = rows
        .map(|row| (0..width).map(|col| cell(row, col)).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(CellValue::is_empty))
        .collect();

    Ok(RawSheet { header, rows: data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_xlsx::{numeric_results_rows, write_xlsx};

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn merged_main_labels_fill_right_and_blank_subs_get_placeholders() {
        let mut range = Range::new((0, 0), (3, 4));
        range.set_value((0, 0), text("Roll No."));
        range.set_value((0, 1), text("Grade"));
        range.set_value((0, 4), text("Department"));
        range.set_value((1, 1), text("Q1 /100"));
        range.set_value((1, 2), text("Q2/100"));
        range.set_value((1, 3), text("Q3/100"));
        range.set_value((2, 0), text("21CS001"));
        range.set_value((2, 1), Data::Float(81.0));
        range.set_value((2, 4), text("CSE"));

        let sheet = split_two_level_header(&range).expect("split");
        assert_eq!(
            sheet.header,
            vec![
                RawHeaderCell::new("Roll No.", "Unnamed: 0_level_1"),
                RawHeaderCell::new("Grade", "Q1 /100"),
                RawHeaderCell::new("Grade", "Q2/100"),
                RawHeaderCell::new("Grade", "Q3/100"),
                RawHeaderCell::new("Department", "Unnamed: 4_level_1"),
            ]
        );
        // The all-empty fourth row is dropped.
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].len(), 5);
        assert_eq!(sheet.rows[0][1], CellValue::Int(81));
        assert_eq!(sheet.rows[0][2], CellValue::Empty);
    }

    #[test]
    fn leading_blank_main_label_becomes_placeholder() {
        let mut range = Range::new((0, 0), (1, 1));
        range.set_value((1, 0), text("S.No"));
        range.set_value((0, 1), text("Name"));
        let sheet = split_two_level_header(&range).expect("split");
        assert_eq!(sheet.header[0].main, "Unnamed: 0_level_0");
        assert_eq!(sheet.header[0].sub, "S.No");
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn blank_column_a_keeps_its_position() {
        let mut range = Range::new((0, 1), (2, 2));
        range.set_value((0, 1), text("Name"));
        range.set_value((0, 2), text("Grade"));
        range.set_value((1, 2), text("Q1"));
        range.set_value((2, 1), text("Asha"));
        range.set_value((2, 2), Data::Float(72.5));

        let sheet = split_two_level_header(&range).expect("split");
        assert_eq!(
            sheet.header,
            vec![
                RawHeaderCell::new("Unnamed: 0_level_0", "Unnamed: 0_level_1"),
                RawHeaderCell::new("Name", "Unnamed: 1_level_1"),
                RawHeaderCell::new("Grade", "Q1"),
            ]
        );
        assert_eq!(
            sheet.rows,
            vec![vec![
                CellValue::Empty,
                CellValue::Text("Asha".to_string()),
                CellValue::Float(72.5),
            ]]
        );
    }

    #[test]
    fn whitespace_only_cells_stay_text() {
        let mut range = Range::new((0, 0), (2, 0));
        range.set_value((0, 0), text("Remarks"));
        range.set_value((1, 0), text(" "));
        range.set_value((2, 0), text("  "));
        let sheet = split_two_level_header(&range).expect("split");
        assert_eq!(sheet.header, vec![RawHeaderCell::new("Remarks", " ")]);
        assert_eq!(sheet.rows, vec![vec![CellValue::Text("  ".to_string())]]);
        assert_eq!(cell_value(&text("")), CellValue::Empty);
    }

    #[test]
    fn workbook_numbers_and_dates_decode_like_typed_cells() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.xlsx");
        write_xlsx(&path, &numeric_results_rows()).expect("write workbook");

        let sheet = read_workbook(&path).expect("read");
        assert_eq!(
            sheet.header,
            vec![
                RawHeaderCell::new("Roll No.", "Unnamed: 0_level_1"),
                RawHeaderCell::new("Year", "2"),
                RawHeaderCell::new("Total", "Grade.300"),
                RawHeaderCell::new("Exam Date", "Unnamed: 3_level_1"),
            ]
        );
        assert_eq!(
            sheet.rows[0],
            vec![
                CellValue::Int(21001),
                CellValue::Int(3),
                CellValue::Int(245),
                CellValue::Text("2024-01-15 00:00:00".to_string()),
            ]
        );
        assert_eq!(sheet.rows[1][2], CellValue::Float(59.5));
        assert_eq!(
            sheet.rows[1][3],
            CellValue::Text("2024-01-15 12:00:00".to_string())
        );
    }

    #[test]
    fn single_row_sheet_is_rejected() {
        let mut range = Range::new((0, 0), (0, 2));
        range.set_value((0, 0), text("Name"));
        let e = split_two_level_header(&range).expect_err("one row");
        assert!(matches!(e, DecodeError::MissingHeader(1)));
    }
}
