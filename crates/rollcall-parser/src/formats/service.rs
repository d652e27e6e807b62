use tracing::info;

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, GradeLevel, SourceKind, SourceTable, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_optional_f64, parse_student_id};

const ID: usize = 0;
const HOURS: usize = 1;

#[derive(Debug, Clone, Copy)]
pub struct ServiceLearningReader {
    pub grade: GradeLevel,
}

impl ServiceLearningReader {
    const NAME: &'static str = "SERVICE_LEARNING";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "service_learning",
        version: 1,
        description: "Service-learning hours tracker, one file per grade level",
        fields: &[
            FieldSpec::at("student_id", 2, "ID"),
            FieldSpec::at("hours", 7, "Total Hours"),
        ],
    };

    pub fn new(grade: GradeLevel) -> Self {
        Self { grade }
    }

    pub fn columns() -> Vec<ColumnSpec> {
        // text, so the merge can put a note in place of missing hours
        vec![ColumnSpec::text("service_hours")]
    }
}

impl SourceReader for ServiceLearningReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::ServiceLearning, Self::columns());

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                continue;
            };
            let hours = parse_optional_f64(Self::NAME, data.value(record, HOURS), line_index, "Total Hours")?;

            let cells = vec![hours.map(Cell::Float).unwrap_or(Cell::Missing)];
            let row = StudentRow::new(cells, line_index).with_grade_hint(self.grade);
            table.insert(Self::NAME, id, row)?;
        }

        info!(reader = Self::NAME, grade = %self.grade, students = table.len(), "Parsed source");
        Ok(table)
    }
}
