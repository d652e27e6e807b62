use std::collections::{BTreeMap, BTreeSet, HashMap};

use rollcall_parser::{Cell, ColumnSpec, GradeLevel, SourceKind, SourceTable, StudentId, GRADE_COLUMN};
use tracing::{debug, info};

use crate::config::DefaultValues;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct MergedColumn {
    pub spec: ColumnSpec,
    pub source: SourceKind,
}

/// One student's row across every source.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub grade: Option<GradeLevel>,
    pub cells: Vec<Cell>,
    /// Non-empty fields, default text included.
    pub populated: usize,
}

#[derive(Debug, Clone)]
pub struct MergedTable {
    columns: Vec<MergedColumn>,
    records: BTreeMap<StudentId, MergedRecord>,
}

impl MergedTable {
    pub fn columns(&self) -> &[MergedColumn] {
        &self.columns
    }

    pub fn records(&self) -> &BTreeMap<StudentId, MergedRecord> {
        &self.records
    }

    pub fn record(&self, id: StudentId) -> Option<&MergedRecord> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.spec.name == name)
    }

    pub fn cell(&self, id: StudentId, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.records.get(&id).and_then(|record| record.cells.get(index))
    }

    /// Names of the columns withheld from grade-level sheets.
    pub fn identifying_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| column.spec.identifying)
            .map(|column| column.spec.name.clone())
            .collect()
    }

    /// Removes and returns every record the predicate rejects.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<(StudentId, MergedRecord)>
    where
        F: FnMut(&StudentId, &MergedRecord) -> bool,
    {
        let records = std::mem::take(&mut self.records);
        let mut removed = Vec::new();
        for (id, record) in records {
            if keep(&id, &record) {
                self.records.insert(id, record);
            } else {
                removed.push((id, record));
            }
        }
        removed
    }
}

/// Outer union of all source tables on student ID, in ID order.
///
/// A student missing from a source gets [`Cell::Missing`] for each of its columns; the
/// SAT, swipe and service-learning columns are then filled with their default text.
pub fn merge_sources(tables: &[SourceTable], defaults: &DefaultValues) -> Result<MergedTable> {
    let mut columns: Vec<MergedColumn> = Vec::new();
    let mut owners: HashMap<String, SourceKind> = HashMap::new();
    for table in tables {
        for spec in table.columns() {
            if let Some(owner) = owners.get(&spec.name) {
                return Err(PipelineError::Validation(format!(
                    "column '{}' is produced by both {} and {}",
                    spec.name, owner, table.source
                )));
            }
            owners.insert(spec.name.clone(), table.source);
            columns.push(MergedColumn {
                spec: spec.clone(),
                source: table.source,
            });
        }
    }

    let grade_index = columns
        .iter()
        .position(|column| column.spec.name == GRADE_COLUMN)
        .ok_or_else(|| {
            PipelineError::Validation(format!("no source provides the '{GRADE_COLUMN}' column"))
        })?;

    let ids: BTreeSet<StudentId> = tables
        .iter()
        .flat_map(|table| table.rows().keys().copied())
        .collect();

    let mut records = BTreeMap::new();
    let mut from_hint = 0usize;
    for id in ids {
        let mut cells = Vec::with_capacity(columns.len());
        let mut hint = None;
        for table in tables {
            match table.row(id) {
                Some(row) => {
                    cells.extend(row.cells.iter().cloned());
                    hint = hint.or(row.grade_hint);
                }
                None => cells.extend(std::iter::repeat(Cell::Missing).take(table.columns().len())),
            }
        }

        let reported = cells[grade_index]
            .as_i64()
            .and_then(|value| GradeLevel::try_from(value).ok());
        let grade = match (reported, hint) {
            (Some(grade), _) => Some(grade),
            (None, Some(grade)) => {
                from_hint += 1;
                cells[grade_index] = Cell::Integer(grade.as_i64());
                Some(grade)
            }
            (None, None) => None,
        };

        fill_defaults(&columns, &mut cells, grade, defaults);
        let populated = cells.iter().filter(|cell| cell.is_populated()).count();
        records.insert(
            id,
            MergedRecord {
                grade,
                cells,
                populated,
            },
        );
    }

    debug!(students = from_hint, "Took grade level from per-grade exports");
    info!(
        sources = tables.len(),
        columns = columns.len(),
        students = records.len(),
        "Merged sources"
    );

    Ok(MergedTable { columns, records })
}

fn fill_defaults(
    columns: &[MergedColumn],
    cells: &mut [Cell],
    grade: Option<GradeLevel>,
    defaults: &DefaultValues,
) {
    for (column, cell) in columns.iter().zip(cells.iter_mut()) {
        if cell.is_populated() {
            continue;
        }
        match column.source {
            SourceKind::Sat => {
                *cell = Cell::Pending {
                    parsed: None,
                    placeholder: defaults.sat_pending.clone(),
                };
            }
            SourceKind::Swipe => *cell = Cell::Text(defaults.no_late_arrivals.clone()),
            SourceKind::ServiceLearning => {
                if let Some(grade) = grade {
                    *cell = Cell::Text(defaults.service_notes.for_grade(grade).to_string());
                }
            }
            _ => {}
        }
    }
}
