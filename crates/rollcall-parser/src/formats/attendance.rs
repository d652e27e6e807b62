use tracing::{debug, info};

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, ReportingPeriod, SourceKind, SourceTable, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_optional_percent, parse_student_id};

const ID: usize = 0;

#[derive(Debug, Clone, Copy)]
pub struct WeeklyAttendanceReader {
    pub period: ReportingPeriod,
}

impl WeeklyAttendanceReader {
    const NAME: &'static str = "WEEKLY_ATTENDANCE";
    const WEEK: usize = 1;
    const PCT: usize = 2;

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "weekly_attendance",
        version: 1,
        description: "Weekly attendance % details",
        fields: &[
            FieldSpec::named("student_id", "Student ID"),
            FieldSpec::named("week", "Week"),
            FieldSpec::named("attendance_pct", "Attendance Pct"),
        ],
    };

    pub fn new(period: ReportingPeriod) -> Self {
        Self { period }
    }

    pub fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::text("week"),
            ColumnSpec::float("weekly_attn"),
            ColumnSpec::text("start_date"),
            ColumnSpec::text("end_date"),
        ]
    }
}

impl SourceReader for WeeklyAttendanceReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::WeeklyAttendance, Self::columns());
        let start = self.period.start_label();
        let end = self.period.end_label();

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                return Err(ParserError::DataRow {
                    reader: Self::NAME,
                    line_index,
                    message: "missing student id".to_string(),
                });
            };
            let pct = parse_optional_percent(
                Self::NAME,
                data.value(record, Self::PCT),
                line_index,
                "Attendance Pct",
            )?;

            let cells = vec![
                Cell::text(data.value(record, Self::WEEK).trim()),
                pct.map(Cell::Float).unwrap_or(Cell::Missing),
                Cell::text(start.as_str()),
                Cell::text(end.as_str()),
            ];
            table.insert(Self::NAME, id, StudentRow::new(cells, line_index))?;
        }

        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}

#[derive(Debug, Clone)]
pub struct YearToDateAttendanceReader {
    pub home_school: String,
}

impl YearToDateAttendanceReader {
    const NAME: &'static str = "YTD_ATTENDANCE";
    const SCHOOL: usize = 1;
    const PCT: usize = 2;

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "ytd_attendance",
        version: 1,
        description: "Year-to-date attendance details",
        fields: &[
            FieldSpec::named("student_id", "Student ID"),
            FieldSpec::named("current_school", "Current School"),
            FieldSpec::named("attendance_pct", "Attendance Pct"),
        ],
    };

    pub fn new(home_school: impl Into<String>) -> Self {
        Self {
            home_school: home_school.into(),
        }
    }

    pub fn columns() -> Vec<ColumnSpec> {
        vec![ColumnSpec::float("ytd_attn")]
    }
}

impl SourceReader for YearToDateAttendanceReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut table = SourceTable::new(SourceKind::YearToDateAttendance, Self::columns());
        let mut other_school = 0usize;

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let school = data.value(record, Self::SCHOOL).trim();
            if !school.eq_ignore_ascii_case(self.home_school.trim()) {
                other_school += 1;
                continue;
            }

            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                return Err(ParserError::DataRow {
                    reader: Self::NAME,
                    line_index,
                    message: "missing student id".to_string(),
                });
            };
            let pct = parse_optional_percent(
                Self::NAME,
                data.value(record, Self::PCT),
                line_index,
                "Attendance Pct",
            )?;

            let cells = vec![pct.map(Cell::Float).unwrap_or(Cell::Missing)];
            table.insert(Self::NAME, id, StudentRow::new(cells, line_index))?;
        }

        debug!(reader = Self::NAME, skipped = other_school, "Dropped rows for other schools");
        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}
