use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ParserError;
use crate::model::{Cell, ColumnSpec, SourceKind, SourceTable, StudentId, StudentRow};
use crate::registry::SourceReader;

use super::schema::{FieldSpec, SchemaDescriptor};
use super::{load_rows, parse_student_id};

const ID: usize = 0;
const PERIOD: usize = 1;
const AVERAGE: usize = 2;

// gradebook value for a class with no average yet
const NO_GRADE_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoublePeriod {
    pub combined: String,
    pub split: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLayout {
    pub periods: Vec<String>,
    #[serde(default)]
    pub double_periods: Vec<DoublePeriod>,
}

impl Default for PeriodLayout {
    fn default() -> Self {
        Self {
            periods: (1..=8).map(|period| period.to_string()).collect(),
            double_periods: vec![DoublePeriod {
                combined: "2-3".to_string(),
                split: vec!["2".to_string(), "3".to_string()],
            }],
        }
    }
}

impl PeriodLayout {
    fn is_known(&self, period: &str) -> bool {
        self.periods.iter().any(|known| known == period)
            || self
                .double_periods
                .iter()
                .any(|double| double.combined == period)
    }
}

pub fn decile(percent: f64) -> i64 {
    (percent / 10.0).floor() as i64
}

pub fn letter_for_decile(decile: i64) -> Option<&'static str> {
    match decile {
        9..=12 => Some("A"),
        8 => Some("B"),
        7 => Some("C"),
        6 => Some("D"),
        0..=5 => Some("F"),
        -1 => Some("-"),
        _ => None,
    }
}

fn format_percent(percent: f64) -> String {
    format!("{}%", percent.round() as i64)
}

#[derive(Debug, Clone, Default)]
pub struct CurrentGradesReader {
    pub layout: PeriodLayout,
}

struct PeriodEntry {
    cell: Cell,
    line_index: usize,
}

#[derive(Default)]
struct StudentGrades {
    first_line: usize,
    periods: BTreeMap<String, PeriodEntry>,
}

impl CurrentGradesReader {
    const NAME: &'static str = "CURRENT_GRADES";

    pub const SCHEMA: &'static SchemaDescriptor = &SchemaDescriptor {
        id: "current_grades",
        version: 3,
        description: "Current grades by class period",
        fields: &[
            FieldSpec::named("student_id", "Student ID"),
            FieldSpec::named("period", "Period"),
            FieldSpec::named("average", "Average"),
        ],
    };

    pub fn new(layout: PeriodLayout) -> Self {
        Self { layout }
    }

    pub fn columns(&self) -> Vec<ColumnSpec> {
        self.layout
            .periods
            .iter()
            .flat_map(|period| {
                [
                    ColumnSpec::text(format!("period_{period}")),
                    ColumnSpec::text(format!("period_{period}_letter")),
                ]
            })
            .collect()
    }

    fn parse_average(value: &str, line_index: usize) -> Result<Cell, ParserError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return Ok(Cell::Missing);
        }
        let number = match trimmed.trim_end_matches('%').parse::<f64>() {
            Ok(number) => number,
            Err(_) => return Ok(Cell::NonAcademic(trimmed.to_string())),
        };
        if (number - NO_GRADE_SENTINEL).abs() < f64::EPSILON {
            return Ok(Cell::Missing);
        }
        if !number.is_finite() || number < 0.0 {
            return Err(ParserError::Unmappable {
                reader: Self::NAME,
                line_index,
                value: trimmed.to_string(),
                message: "average is not a percentage".to_string(),
            });
        }
        Ok(Cell::Float(number))
    }

    fn backfill_double_periods(&self, grades: &mut StudentGrades) {
        for double in &self.layout.double_periods {
            let Some(combined) = grades.periods.get(&double.combined) else {
                continue;
            };
            if !combined.cell.is_populated() {
                continue;
            }
            let (cell, line_index) = (combined.cell.clone(), combined.line_index);
            for split in &double.split {
                let needs_fill = grades
                    .periods
                    .get(split)
                    .map_or(true, |entry| !entry.cell.is_populated());
                if needs_fill {
                    grades.periods.insert(
                        split.clone(),
                        PeriodEntry {
                            cell: cell.clone(),
                            line_index,
                        },
                    );
                }
            }
        }
    }

    fn period_cells(&self, grades: &StudentGrades) -> Result<Vec<Cell>, ParserError> {
        let mut cells = Vec::with_capacity(self.layout.periods.len() * 2);
        for period in &self.layout.periods {
            let Some(entry) = grades.periods.get(period) else {
                cells.push(Cell::Missing);
                cells.push(Cell::Text("-".to_string()));
                continue;
            };

            match &entry.cell {
                Cell::Float(percent) => {
                    let bucket = decile(*percent);
                    let letter =
                        letter_for_decile(bucket).ok_or_else(|| ParserError::Unmappable {
                            reader: Self::NAME,
                            line_index: entry.line_index,
                            value: percent.to_string(),
                            message: format!("decile {bucket} has no letter grade"),
                        })?;
                    cells.push(Cell::Text(format_percent(*percent)));
                    cells.push(Cell::Text(letter.to_string()));
                }
                Cell::NonAcademic(reason) => {
                    cells.push(Cell::NonAcademic(reason.clone()));
                    cells.push(Cell::NonAcademic(reason.clone()));
                }
                _ => {
                    cells.push(Cell::Missing);
                    cells.push(Cell::Text("-".to_string()));
                }
            }
        }
        Ok(cells)
    }
}

// "02" and "2" name the same period; so do "2-3" and "02-03".
fn normalize_period(value: &str) -> String {
    value
        .trim()
        .split('-')
        .map(|part| {
            let part = part.trim();
            part.parse::<u32>()
                .map(|number| number.to_string())
                .unwrap_or_else(|_| part.to_string())
        })
        .collect::<Vec<_>>()
        .join("-")
}

impl SourceReader for CurrentGradesReader {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        Self::SCHEMA
    }

    fn parse(&self, content: &str) -> Result<SourceTable, ParserError> {
        let data = load_rows(Self::NAME, Self::SCHEMA, content)?;
        let mut students: BTreeMap<StudentId, StudentGrades> = BTreeMap::new();

        for (line_index, record) in &data.rows {
            let line_index = *line_index;
            let Some(id) = parse_student_id(Self::NAME, data.value(record, ID), line_index)? else {
                return Err(ParserError::DataRow {
                    reader: Self::NAME,
                    line_index,
                    message: "missing student id".to_string(),
                });
            };

            let raw_period = data.value(record, PERIOD);
            let period = normalize_period(raw_period);
            if !self.layout.is_known(&period) {
                return Err(ParserError::Unmappable {
                    reader: Self::NAME,
                    line_index,
                    value: raw_period.trim().to_string(),
                    message: "period is not part of the configured schedule".to_string(),
                });
            }

            let grades = students.entry(id).or_insert_with(|| StudentGrades {
                first_line: line_index,
                ..StudentGrades::default()
            });
            if grades.periods.contains_key(&period) {
                return Err(ParserError::DataRow {
                    reader: Self::NAME,
                    line_index,
                    message: format!("period {period} listed twice for student {id}"),
                });
            }
            grades.periods.insert(
                period,
                PeriodEntry {
                    cell: Self::parse_average(data.value(record, AVERAGE), line_index)?,
                    line_index,
                },
            );
        }

        let mut table = SourceTable::new(SourceKind::CurrentGrades, self.columns());
        for (id, mut grades) in students {
            self.backfill_double_periods(&mut grades);
            let cells = self.period_cells(&grades)?;
            table.insert(Self::NAME, id, StudentRow::new(cells, grades.first_line))?;
        }

        info!(reader = Self::NAME, students = table.len(), "Parsed source");
        Ok(table)
    }
}
