//! Minimal `.xlsx` writer.
//!
//! The workbook is assembled straight from OOXML parts inside a zip archive: one worksheet
//! per [`Sheet`], a header row with the column names, numbers as numeric cells and
//! everything else as inline strings. No shared-string table and no styles.

use std::fmt::Write as _;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;

use polars::prelude::{Column, DataType};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PipelineError, Result};
use crate::grouping::Sheet;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Excel refuses sheet names longer than this.
const MAX_SHEET_NAME: usize = 31;

enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
    Blank,
}

pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let bytes = workbook_bytes(sheets)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)?;
    info!(
        path = %path.display(),
        sheets = sheets.len(),
        bytes = bytes.len(),
        "Wrote workbook"
    );
    Ok(())
}

pub fn workbook_bytes(sheets: &[Sheet]) -> Result<Vec<u8>> {
    validate_sheet_names(sheets)?;

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut zip = ZipWriter::new(&mut cursor);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(content_types_xml(sheets.len()).as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(root_rels_xml().as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(workbook_xml(sheets).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(workbook_rels_xml(sheets.len()).as_bytes())?;

        for (idx, sheet) in sheets.iter().enumerate() {
            let xml = worksheet_xml(sheet)?;
            zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)?;
            zip.write_all(xml.as_bytes())?;
        }

        zip.finish()?;
    }
    Ok(buffer)
}

fn validate_sheet_names(sheets: &[Sheet]) -> Result<()> {
    if sheets.is_empty() {
        return Err(PipelineError::Validation(
            "a workbook needs at least one sheet".to_string(),
        ));
    }
    for (idx, sheet) in sheets.iter().enumerate() {
        let name = sheet.name.as_str();
        if name.is_empty() || name.chars().count() > MAX_SHEET_NAME {
            return Err(PipelineError::Validation(format!(
                "sheet name '{name}' must be 1-{MAX_SHEET_NAME} characters"
            )));
        }
        if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
            return Err(PipelineError::Validation(format!(
                "sheet name '{name}' contains a character Excel does not allow"
            )));
        }
        if sheets[..idx]
            .iter()
            .any(|earlier| earlier.name.eq_ignore_ascii_case(name))
        {
            return Err(PipelineError::Validation(format!(
                "sheet name '{name}' is used twice"
            )));
        }
    }
    Ok(())
}

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#
    );
    for idx in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{idx}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels_xml() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )
}

fn workbook_xml(sheets: &[Sheet]) -> String {
    let mut xml = format!(r#"{XML_DECL}<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#);
    for (idx, sheet) in sheets.iter().enumerate() {
        let id = idx + 1;
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(&sheet.name)
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = format!(r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}">"#);
    for id in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{id}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(sheet: &Sheet) -> Result<String> {
    let frame = &sheet.frame;
    let columns: Vec<Vec<CellValue>> = frame
        .get_columns()
        .iter()
        .map(column_values)
        .collect::<Result<_>>()?;

    let mut xml = format!(r#"{XML_DECL}<worksheet xmlns="{MAIN_NS}"><sheetData>"#);

    xml.push_str(r#"<row r="1">"#);
    for (col_idx, column) in frame.get_columns().iter().enumerate() {
        push_cell(
            &mut xml,
            col_idx,
            1,
            &CellValue::Text(column.name().to_string()),
        );
    }
    xml.push_str("</row>");

    for row_idx in 0..frame.height() {
        let row_number = row_idx + 2;
        let _ = write!(xml, r#"<row r="{row_number}">"#);
        for (col_idx, values) in columns.iter().enumerate() {
            if let Some(value) = values.get(row_idx) {
                push_cell(&mut xml, col_idx, row_number, value);
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    Ok(xml)
}

fn column_values(column: &Column) -> Result<Vec<CellValue>> {
    let values = match column.dtype() {
        DataType::Int64 => column
            .i64()?
            .into_iter()
            .map(|value| value.map_or(CellValue::Blank, CellValue::Integer))
            .collect(),
        DataType::Float64 => column
            .f64()?
            .into_iter()
            .map(|value| match value {
                Some(number) if number.is_finite() => CellValue::Number(number),
                _ => CellValue::Blank,
            })
            .collect(),
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| value.map_or(CellValue::Blank, |text| CellValue::Text(text.to_string())))
            .collect(),
        other => {
            return Err(PipelineError::Validation(format!(
                "column '{}' has type {other}, which the workbook writer does not support",
                column.name()
            )))
        }
    };
    Ok(values)
}

fn push_cell(xml: &mut String, col_idx: usize, row_number: usize, value: &CellValue) {
    let reference = format!("{}{row_number}", column_letter(col_idx));
    let _ = match value {
        CellValue::Integer(number) => write!(xml, r#"<c r="{reference}"><v>{number}</v></c>"#),
        CellValue::Number(number) => write!(xml, r#"<c r="{reference}"><v>{number}</v></c>"#),
        CellValue::Text(text) => write!(
            xml,
            r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            escape_xml(text)
        ),
        CellValue::Blank => Ok(()),
    };
}

/// Zero-based column index to its spreadsheet letters: 0 -> A, 25 -> Z, 26 -> AA.
pub(crate) fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index;
    loop {
        letters.push(char::from(b'A' + (remaining % 26) as u8));
        if remaining < 26 {
            break;
        }
        remaining = remaining / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // XML 1.0 forbids most control characters
            '\t' | '\n' | '\r' => escaped.push(ch),
            ch if (ch as u32) < 0x20 => {}
            ch => escaped.push(ch),
        }
    }
    escaped
}
