use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::ParserError;

/// Name of the grade-level column every merged table carries.
pub const GRADE_COLUMN: &str = "grade";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub i64);

impl StudentId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for StudentId {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        // spreadsheet exports sometimes render integer IDs as floats
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        digits
            .parse::<i64>()
            .map(StudentId)
            .map_err(|_| format!("invalid student id '{trimmed}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum GradeLevel {
    Nine,
    Ten,
    Eleven,
    Twelve,
}

impl GradeLevel {
    pub const ALL: [GradeLevel; 4] = [
        GradeLevel::Nine,
        GradeLevel::Ten,
        GradeLevel::Eleven,
        GradeLevel::Twelve,
    ];

    pub fn as_i64(&self) -> i64 {
        match self {
            GradeLevel::Nine => 9,
            GradeLevel::Ten => 10,
            GradeLevel::Eleven => 11,
            GradeLevel::Twelve => 12,
        }
    }

    pub fn sheet_name(&self) -> &'static str {
        match self {
            GradeLevel::Nine => "GRADE_9",
            GradeLevel::Ten => "GRADE_10",
            GradeLevel::Eleven => "GRADE_11",
            GradeLevel::Twelve => "GRADE_12",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

impl TryFrom<i64> for GradeLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            9 => Ok(GradeLevel::Nine),
            10 => Ok(GradeLevel::Ten),
            11 => Ok(GradeLevel::Eleven),
            12 => Ok(GradeLevel::Twelve),
            other => Err(format!("grade level {other} is outside 9-12")),
        }
    }
}

impl From<GradeLevel> for i64 {
    fn from(value: GradeLevel) -> Self {
        value.as_i64()
    }
}

/// The week (or other span) a run reports on; stamped onto the weekly attendance columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportingPeriod {
    pub fn start_label(&self) -> String {
        self.start.format("%B %-d, %Y").to_string()
    }

    pub fn end_label(&self) -> String {
        self.end.format("%B %-d, %Y").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Gpa,
    ClassRank,
    WeeklyAttendance,
    YearToDateAttendance,
    Swipe,
    Sat,
    ServiceLearning,
    CurrentGrades,
    Email,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Gpa => "gpa",
            SourceKind::ClassRank => "class_rank",
            SourceKind::WeeklyAttendance => "weekly_attendance",
            SourceKind::YearToDateAttendance => "ytd_attendance",
            SourceKind::Swipe => "swipe",
            SourceKind::Sat => "sat",
            SourceKind::ServiceLearning => "service_learning",
            SourceKind::CurrentGrades => "current_grades",
            SourceKind::Email => "email",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value in a student row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
    /// A non-grade entry in a class period column, e.g. "Lunch".
    NonAcademic(String),
    /// A score that was parsed but is withheld until release.
    Pending {
        parsed: Option<i64>,
        placeholder: String,
    },
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Cell::Missing
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_populated(&self) -> bool {
        !matches!(self, Cell::Missing)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(value) => Some(*value),
            Cell::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) | Cell::NonAcademic(value) => Some(value),
            Cell::Pending { placeholder, .. } => Some(placeholder),
            _ => None,
        }
    }

    /// Text shown in an output sheet; `None` for a missing value.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Integer(value) => Some(value.to_string()),
            Cell::Float(value) => Some(value.to_string()),
            Cell::Text(value) | Cell::NonAcademic(value) => Some(value.clone()),
            Cell::Missing => None,
            Cell::Pending { placeholder, .. } => Some(placeholder.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    /// Names and email addresses are withheld from grade-level sheets.
    pub identifying: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            identifying: false,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Float)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub fn identifying(mut self) -> Self {
        self.identifying = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub cells: Vec<Cell>,
    /// Grade level implied by a per-grade export, used when the GPA report lacks the student.
    pub grade_hint: Option<GradeLevel>,
    pub line_index: usize,
}

impl StudentRow {
    pub fn new(cells: Vec<Cell>, line_index: usize) -> Self {
        Self {
            cells,
            grade_hint: None,
            line_index,
        }
    }

    pub fn with_grade_hint(mut self, grade: GradeLevel) -> Self {
        self.grade_hint = Some(grade);
        self
    }
}

/// A single source normalized to one row per student.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub source: SourceKind,
    columns: Vec<ColumnSpec>,
    rows: BTreeMap<StudentId, StudentRow>,
}

impl SourceTable {
    pub fn new(source: SourceKind, columns: Vec<ColumnSpec>) -> Self {
        Self {
            source,
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn rows(&self) -> &BTreeMap<StudentId, StudentRow> {
        &self.rows
    }

    pub fn row(&self, id: StudentId) -> Option<&StudentRow> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn cell(&self, id: StudentId, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(&id).and_then(|row| row.cells.get(index))
    }

    pub fn insert(
        &mut self,
        reader: &'static str,
        id: StudentId,
        row: StudentRow,
    ) -> Result<(), ParserError> {
        if row.cells.len() != self.columns.len() {
            return Err(ParserError::Validation {
                reader,
                message: format!(
                    "row for student {id} had {} cells, expected {}",
                    row.cells.len(),
                    self.columns.len()
                ),
            });
        }

        if let Some(existing) = self.rows.get(&id) {
            return Err(ParserError::DuplicateStudent {
                reader,
                student_id: id.as_i64(),
                first_line: existing.line_index,
                line_index: row.line_index,
            });
        }

        self.rows.insert(id, row);
        Ok(())
    }

    /// Appends the rows of another extract of the same source, e.g. one file per grade level.
    pub fn union(mut self, reader: &'static str, other: SourceTable) -> Result<Self, ParserError> {
        if other.source != self.source || other.columns != self.columns {
            return Err(ParserError::Validation {
                reader,
                message: format!(
                    "cannot union {} table into {} table with different columns",
                    other.source, self.source
                ),
            });
        }

        for (id, row) in other.rows {
            self.insert(reader, id, row)?;
        }
        Ok(self)
    }
}
