use tracing::info;

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, SourceKind, SourceTable, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_student_id};

const ID: usize = 0;
const EMAIL: usize = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct EmailReader;

impl EmailReader {
    const NAME: &'static str = "EMAIL";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "email_roster",
        version: 1,
        description: "Email list - usernames and passwords, sheet 'All'",
        fields: &[
            FieldSpec::at("student_id", 5, "ID#"),
            FieldSpec::at("email", 6, "CPS Email Address"),
        ],
    };

    pub fn columns() -> Vec<ColumnSpec> {
        vec![ColumnSpec::text("email").identifying()]
    }
}

impl SourceReader for EmailReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::Email, Self::columns());

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                continue;
            };
            let cells = vec![Cell::text(data.value(record, EMAIL).trim())];
            table.insert(Self::NAME, id, StudentRow::new(cells, line_index))?;
        }

        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}
