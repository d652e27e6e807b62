use tracing::info;

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, SourceKind, SourceTable, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_optional_f64, parse_student_id, round_to};

const ID: usize = 0;
const UNWEIGHTED_GPA: usize = 1;
const CLASS_RANK: usize = 2;
const CLASS_SIZE: usize = 3;
const CREDITS: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct ClassRankReader;

impl ClassRankReader {
    const NAME: &'static str = "CLASS_RANK";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "class_rank",
        version: 2,
        description: "Class rank (GPA) report status export",
        fields: &[
            FieldSpec::at("student_id", 13, "Student ID"),
            FieldSpec::at("unweighted_gpa", 19, "Unweighted GPA"),
            FieldSpec::at("class_rank", 20, "Class Rank"),
            FieldSpec::at("class_size", 21, "Class Size"),
            FieldSpec::at("credits_earned", 22, "Credits Earned"),
        ],
    };

    pub fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::float("unweighted_gpa"),
            ColumnSpec::integer("class_rank"),
            ColumnSpec::integer("class_size"),
            ColumnSpec::float("credits_earned"),
        ]
    }
}

impl SourceReader for ClassRankReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::ClassRank, Self::columns());

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                return Err(ParserError::DataRow {
                    reader: Self::NAME,
                    line_index,
                    message: "missing student id".to_string(),
                });
            };

            let gpa = parse_optional_f64(
                Self::NAME,
                data.value(record, UNWEIGHTED_GPA),
                line_index,
                "Unweighted GPA",
            )?
            .map(|value| Cell::Float(round_to(value, 2)));
            let rank = optional_count(data.value(record, CLASS_RANK), line_index, "Class Rank")?;
            let size = optional_count(data.value(record, CLASS_SIZE), line_index, "Class Size")?;
            let credits = parse_optional_f64(
                Self::NAME,
                data.value(record, CREDITS),
                line_index,
                "Credits Earned",
            )?
            .map(Cell::Float);

            let cells = vec![
                gpa.unwrap_or(Cell::Missing),
                rank,
                size,
                credits.unwrap_or(Cell::Missing),
            ];
            table.insert(Self::NAME, id, StudentRow::new(cells, line_index))?;
        }

        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}

fn optional_count(value: &str, line_index: usize, column: &str) -> Result<Cell, ParserError> {
    match parse_optional_f64(ClassRankReader::NAME, value, line_index, column)? {
        None => Ok(Cell::Missing),
        Some(number) if number.fract() == 0.0 => Ok(Cell::Integer(number as i64)),
        Some(number) => Err(ParserError::DataRow {
            reader: ClassRankReader::NAME,
            line_index,
            message: format!("column '{column}' must be a whole number, found {number}"),
        }),
    }
}
