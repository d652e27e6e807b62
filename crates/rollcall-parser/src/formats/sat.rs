use tracing::{debug, info};

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, GradeLevel, SourceKind, SourceTable, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_optional_f64, parse_student_id};

const ID: usize = 0;
const SCORE_FIELDS: [(usize, &str); 3] = [
    (1, "Total Score"),
    (2, "ERW Section Score"),
    (3, "Math Section Score"),
];

// Unreleased scores are held as Pending so the placeholder shows but the value is kept.
#[derive(Debug, Clone)]
pub struct SatReader {
    pub grade: GradeLevel,
    pub released: bool,
    pub placeholder: String,
}

impl SatReader {
    const NAME: &'static str = "SAT";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "sat",
        version: 2,
        description: "SAT score extract, one file per grade level",
        fields: &[
            FieldSpec::named("student_id", "Student ID"),
            FieldSpec::named("total", "Total Score"),
            FieldSpec::named("erw", "ERW Section Score"),
            FieldSpec::named("math", "Math Section Score"),
        ],
    };

    pub fn new(grade: GradeLevel, released: bool, placeholder: impl Into<String>) -> Self {
        Self {
            grade,
            released,
            placeholder: placeholder.into(),
        }
    }

    pub fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::text("sat_total"),
            ColumnSpec::text("sat_erw"),
            ColumnSpec::text("sat_math"),
        ]
    }

    fn score_cell(&self, parsed: Option<i64>) -> Cell {
        match parsed {
            None => Cell::Missing,
            Some(score) if self.released => Cell::Integer(score),
            Some(score) => Cell::Pending {
                parsed: Some(score),
                placeholder: self.placeholder.clone(),
            },
        }
    }
}

impl SourceReader for SatReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::Sat, Self::columns());
        let mut without_id = 0usize;

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                without_id += 1;
                continue;
            };

            let mut cells = Vec::with_capacity(SCORE_FIELDS.len());
            for (field, column) in SCORE_FIELDS {
                let parsed = parse_optional_f64(Self::NAME, data.value(record, field), line_index, column)?
                    .map(|score| score.round() as i64);
                cells.push(self.score_cell(parsed));
            }

            let row = StudentRow::new(cells, line_index).with_grade_hint(self.grade);
            table.insert(Self::NAME, id, row)?;
        }

        debug!(reader = Self::NAME, grade = %self.grade, skipped = without_id, "Dropped rows without an ID");
        info!(
            reader = Self::NAME,
            grade = %self.grade,
            released = self.released,
            students = table.len(),
            "Parsed source"
        );
        Ok(table)
    }
}
