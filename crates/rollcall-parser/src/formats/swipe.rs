use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, SourceKind, SourceTable, StudentId, StudentRow};
use crate::registry::SourceReader;

use super::load_rows;
use super::schema::{FieldSpec, SchemaDescriptor};

const ID: usize = 0;
const DATE: usize = 1;
const TIME: usize = 2;

// HHMM, both bounds inclusive, seconds ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateWindow {
    pub start: u32,
    pub end: u32,
}

impl Default for LateWindow {
    fn default() -> Self {
        Self {
            start: 900,
            end: 1030,
        }
    }
}

impl LateWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        let hhmm = time.hour() * 100 + time.minute();
        self.start <= hhmm && hhmm <= self.end
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwipeReader {
    pub window: LateWindow,
}

impl SwipeReader {
    const NAME: &'static str = "SWIPE";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "swipe",
        version: 1,
        description: "Student swipe print report",
        fields: &[
            FieldSpec::named("student", "Textbox20"),
            FieldSpec::named("date", "Textbox12"),
            FieldSpec::named("swipe_time", "Textbox14"),
        ],
    };

    pub fn new(window: LateWindow) -> Self {
        Self { window }
    }

    pub fn columns() -> Vec<ColumnSpec> {
        vec![ColumnSpec::text("late_date"), ColumnSpec::text("late_time")]
    }
}

#[derive(Default)]
struct LateArrivals {
    first_line: usize,
    dates: Vec<String>,
    times: Vec<String>,
}

impl SourceReader for SwipeReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut arrivals: BTreeMap<StudentId, LateArrivals> = BTreeMap::new();
        let mut outside_window = 0usize;

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let id = parse_swipe_student(data.value(record, ID), line_index)?;
            let time = parse_swipe_time(data.value(record, TIME), line_index)?;
            let date = parse_swipe_date(data.value(record, DATE), line_index)?;

            if !self.window.contains(time) {
                outside_window += 1;
                continue;
            }

            let entry = arrivals.entry(id).or_insert_with(|| LateArrivals {
                first_line: line_index,
                ..LateArrivals::default()
            });
            entry.dates.push(date.format("%B %-d").to_string());
            entry.times.push(time.format("%I:%M %p").to_string());
        }

        debug!(
            reader = Self::NAME,
            skipped = outside_window,
            "Dropped swipes outside the late window"
        );

        let mut table = SourceTable::new(SourceKind::Swipe, Self::columns());
        for (id, late) in arrivals {
            let cells = vec![
                Cell::Text(late.dates.join(", ")),
                Cell::Text(late.times.join(", ")),
            ];
            table.insert(Self::NAME, id, StudentRow::new(cells, late.first_line))?;
        }

        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}

// The student cell reads like "123456 LASTNAME, FIRST"; the leading token is the ID.
fn parse_swipe_student(value: &str, line_index: usize) -> Result<StudentId, ParserError> {
    let token = value.split_whitespace().next().unwrap_or_default();
    StudentId::try_from(token).map_err(|message| ParserError::DataRow {
        reader: SwipeReader::NAME,
        line_index,
        message,
    })
}

fn parse_swipe_time(value: &str, line_index: usize) -> Result<NaiveTime, ParserError> {
    static FORMATS: &[&str] = &["%H:%M:%S", "%I:%M:%S %p", "%H:%M", "%I:%M %p"];
    let trimmed = value.trim();
    for fmt in FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, fmt) {
            return Ok(time);
        }
    }
    Err(ParserError::DataRow {
        reader: SwipeReader::NAME,
        line_index,
        message: format!("invalid swipe time '{trimmed}'"),
    })
}

fn parse_swipe_date(value: &str, line_index: usize) -> Result<NaiveDate, ParserError> {
    static FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];
    let trimmed = value.trim();
    // some exports carry a midnight time after the date
    let date_part = trimmed.split_whitespace().next().unwrap_or_default();
    for fmt in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Ok(date);
        }
    }
    Err(ParserError::DataRow {
        reader: SwipeReader::NAME,
        line_index,
        message: format!("invalid swipe date '{trimmed}'"),
    })
}
