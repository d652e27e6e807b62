use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::StudentId;

use super::schema::{ResolvedSchema, SchemaDescriptor};

pub(crate) struct DataRows {
    pub schema: ResolvedSchema,
    pub rows: Vec<(usize, StringRecord)>,
}

impl DataRows {
    pub fn value<'r>(&self, record: &'r StringRecord, field: usize) -> &'r str {
        self.schema.value(record, field)
    }
}

pub(crate) fn load_rows(
    reader: &'static str,
    schema: &'static SchemaDescriptor,
    content: &str,
) -> Result<DataRows, ParserError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    let mut csv_reader = builder.from_reader(content.as_bytes());
    let mut records = csv_reader.records();

    let header = records
        .next()
        .ok_or(ParserError::ColumnShape {
            reader,
            schema: schema.id,
            reason: "file missing header row".to_string(),
        })?
        .map_err(|source| ParserError::Csv { reader, source })?;
    let resolved = schema.resolve(reader, &header)?;

    let mut rows = Vec::new();
    for (offset, record) in records.enumerate() {
        let record = record.map_err(|source| ParserError::Csv { reader, source })?;
        let line_index = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(offset + 2);

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if record.len() < resolved.width() {
            return Err(ParserError::DataRow {
                reader,
                line_index,
                message: format!(
                    "expected at least {} columns, found {}",
                    resolved.width(),
                    record.len()
                ),
            });
        }
        rows.push((line_index, record));
    }

    if rows.is_empty() {
        return Err(ParserError::EmptyData { reader });
    }

    Ok(DataRows {
        schema: resolved,
        rows,
    })
}

pub(crate) fn parse_student_id(
    reader: &'static str,
    value: &str,
    line_index: usize,
) -> Result<Option<StudentId>, ParserError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    StudentId::try_from(value)
        .map(Some)
        .map_err(|message| ParserError::DataRow {
            reader,
            line_index,
            message,
        })
}

pub(crate) fn parse_required_i64(
    reader: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<i64, ParserError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    digits
        .parse::<i64>()
        .map_err(|err| ParserError::DataRow {
            reader,
            line_index,
            message: format!("failed to parse column '{column}' as integer: {err}"),
        })
}

pub(crate) fn parse_optional_f64(
    reader: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|err| ParserError::DataRow {
            reader,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        })
}

pub(crate) fn parse_optional_percent(
    reader: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
    parse_optional_f64(reader, number, line_index, column)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
