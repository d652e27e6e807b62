use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use crate::error::{PipelineError, Result};

const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "xla", "xlam", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Renders one worksheet as CSV text so the positional readers see the same columns they
/// would in an exported file. Leading empty columns are kept, so offsets still line up.
pub fn worksheet_csv(path: &Path, contents: &[u8], sheet: Option<&str>) -> Result<String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(contents.to_vec())).map_err(|source| {
            PipelineError::Spreadsheet {
                path: path.to_path_buf(),
                source,
            }
        })?;

    let names = workbook.sheet_names();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|name| name.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                PipelineError::Validation(format!(
                    "{} has no sheet named '{wanted}' (found: {})",
                    path.display(),
                    names.join(", ")
                ))
            })?,
        None => names.first().cloned().ok_or_else(|| {
            PipelineError::Validation(format!("{} has no worksheets", path.display()))
        })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| PipelineError::Spreadsheet {
            path: path.to_path_buf(),
            source,
        })?;
    let offset = range.start().map_or(0, |(_, col)| col as usize);

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in range.rows() {
        let record = std::iter::repeat(String::new())
            .take(offset)
            .chain(row.iter().map(render));
        writer.write_record(record).map_err(std::io::Error::from)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| PipelineError::Io(err.into_error()))?;

    debug!(
        path = %path.display(),
        sheet = %name,
        rows = range.height(),
        "Read worksheet"
    );
    String::from_utf8(bytes).map_err(|_| PipelineError::Encoding {
        path: path.to_path_buf(),
    })
}

fn render(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        // IDs and whole numbers come back from Excel as floats.
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            (*value as i64).to_string()
        }
        Data::Float(value) => value.to_string(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}
