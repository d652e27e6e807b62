use tracing::info;

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, GradeLevel, SourceKind, SourceTable, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_optional_f64, parse_required_i64, parse_student_id, round_to};

const ID: usize = 0;
const GRADE: usize = 1;
const LAST_NAME: usize = 2;
const FIRST_NAME: usize = 3;
const AVG_GPA: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct GpaReader;

impl GpaReader {
    const NAME: &'static str = "GPA";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "gpa",
        version: 1,
        description: "Student GPAs (updated weekly)",
        fields: &[
            FieldSpec::named("student_id", "STUDENT ID"),
            FieldSpec::named("grade", "GRADE LEVEL"),
            FieldSpec::named("last_name", "LAST NAME"),
            FieldSpec::named("first_name", "FIRST NAME"),
            FieldSpec::named("avg_gpa", "AVG GPA"),
        ],
    };

    pub fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::integer("grade"),
            ColumnSpec::text("last_name").identifying(),
            ColumnSpec::text("first_name").identifying(),
            ColumnSpec::float("avg_gpa"),
        ]
    }
}

impl SourceReader for GpaReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::Gpa, Self::columns());

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                return Err(ParserError::DataRow {
                    reader: Self::NAME,
                    line_index,
                    message: "missing student id".to_string(),
                });
            };

            let raw_grade = data.value(record, GRADE);
            let grade_value = parse_required_i64(Self::NAME, raw_grade, line_index, "GRADE LEVEL")?;
            let grade = GradeLevel::try_from(grade_value).map_err(|message| {
                ParserError::Unmappable {
                    reader: Self::NAME,
                    line_index,
                    value: raw_grade.trim().to_string(),
                    message,
                }
            })?;

            let gpa = parse_optional_f64(Self::NAME, data.value(record, AVG_GPA), line_index, "AVG GPA")?
                .map(|value| Cell::Float(round_to(value, 2)))
                .unwrap_or(Cell::Missing);

            let cells = vec![
                Cell::Integer(grade.as_i64()),
                Cell::text(data.value(record, LAST_NAME).trim()),
                Cell::text(data.value(record, FIRST_NAME).trim()),
                gpa,
            ];
            table.insert(Self::NAME, id, StudentRow::new(cells, line_index))?;
        }

        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}
