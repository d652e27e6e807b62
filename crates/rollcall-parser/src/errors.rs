use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{reader} CSV error: {source}")]
    Csv {
        reader: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{reader} does not match schema {schema}: {reason}")]
    ColumnShape {
        reader: &'static str,
        schema: &'static str,
        reason: String,
    },

    #[error("{reader} data row {line_index} invalid: {message}")]
    DataRow {
        reader: &'static str,
        line_index: usize,
        message: String,
    },

    #[error("{reader} data row {line_index}: no mapping for value '{value}': {message}")]
    Unmappable {
        reader: &'static str,
        line_index: usize,
        value: String,
        message: String,
    },

    #[error("{reader} lists student {student_id} more than once (rows {first_line} and {line_index})")]
    DuplicateStudent {
        reader: &'static str,
        student_id: i64,
        first_line: usize,
        line_index: usize,
    },

    #[error("{reader} validation error: {message}")]
    Validation {
        reader: &'static str,
        message: String,
    },

    #[error("{reader} file did not contain any data rows")]
    EmptyData { reader: &'static str },
}
