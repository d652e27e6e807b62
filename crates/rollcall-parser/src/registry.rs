use once_cell::sync::Lazy;

use crate::errors::ParserError;
use crate::formats::{
    schema::SchemaDescriptor, ClassRankReader, CurrentGradesReader, EmailReader, GpaReader,
    SatReader, ServiceLearningReader, SwipeReader, WeeklyAttendanceReader,
    YearToDateAttendanceReader,
};
use crate::model::SourceTable;

pub trait SourceReader {
    fn name(&self) -> &'static str;
    fn schema(&self) -> &'static SchemaDescriptor;
    fn parse(&self, content: &str) -> Result<SourceTable, ParserError>;
}

static SCHEMAS: Lazy<Vec<&'static SchemaDescriptor>> = Lazy::new(|| {
    vec![
        GpaReader::SCHEMA,
        ClassRankReader::SCHEMA,
        WeeklyAttendanceReader::SCHEMA,
        YearToDateAttendanceReader::SCHEMA,
        SwipeReader::SCHEMA,
        SatReader::SCHEMA,
        ServiceLearningReader::SCHEMA,
        CurrentGradesReader::SCHEMA,
        EmailReader::SCHEMA,
    ]
});

/// Every input layout this crate understands, in pipeline order.
pub fn all_schemas() -> &'static [&'static SchemaDescriptor] {
    SCHEMAS.as_slice()
}
