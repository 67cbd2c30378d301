//! Writes small `.xlsx` workbooks for tests: one sheet, shared strings,
//! numbers, and a date style (built-in number format 14).

use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Blank,
    Text(&'static str),
    Number(f64),
    /// Excel serial day number shown with a date format.
    Date(f64),
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Results" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn column_letter(col: usize) -> char {
    (b'A' + col as u8) as char
}

/// Rows are written from A1 down; at most 26 columns.
pub fn write_xlsx(path: &Path, rows: &[Vec<Cell>]) -> zip::result::ZipResult<()> {
    let mut strings: Vec<&'static str> = Vec::new();
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let at = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Blank => {}
                Cell::Text(s) => {
                    let idx = match strings.iter().position(|x| x == s) {
                        Some(i) => i,
                        None => {
                            strings.push(*s);
                            strings.len() - 1
                        }
                    };
                    sheet_rows.push_str(&format!(r#"<c r="{}" t="s"><v>{}</v></c>"#, at, idx));
                }
                Cell::Number(n) => {
                    sheet_rows.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, at, n));
                }
                Cell::Date(n) => {
                    sheet_rows.push_str(&format!(r#"<c r="{}" s="1"><v>{}</v></c>"#, at, n));
                }
            }
        }
        sheet_rows.push_str("</row>");
    }

    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#,
        MAIN_NS, sheet_rows
    );
    let shared = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="{}" count="{}" uniqueCount="{}">{}</sst>"#,
        MAIN_NS,
        strings.len(),
        strings.len(),
        strings
            .iter()
            .map(|s| format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s)))
            .collect::<String>()
    );

    let file = std::fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/sharedStrings.xml", shared),
        ("xl/worksheets/sheet1.xml", sheet),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

/// A results sheet with numeric header and key cells plus a date column.
pub fn numeric_results_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![
            Cell::Text("Roll No."),
            Cell::Text("Year"),
            Cell::Text("Total"),
            Cell::Text("Exam Date"),
        ],
        vec![
            Cell::Blank,
            Cell::Number(2.0),
            Cell::Text("Grade.300"),
            Cell::Blank,
        ],
        vec![
            Cell::Number(21001.0),
            Cell::Number(3.0),
            Cell::Number(245.0),
            Cell::Date(45306.0),
        ],
        vec![
            Cell::Number(21002.0),
            Cell::Number(3.0),
            Cell::Number(59.5),
            Cell::Date(45306.5),
        ],
    ]
}
