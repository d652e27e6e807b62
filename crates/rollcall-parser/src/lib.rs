pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::ParserError;
pub use model::{
    Cell, ColumnKind, ColumnSpec, GradeLevel, ReportingPeriod, SourceKind, SourceTable,
    StudentId, StudentRow, GRADE_COLUMN,
};
pub use registry::{all_schemas, SourceReader};

#[cfg(test)]
mod tests;
