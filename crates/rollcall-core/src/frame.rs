use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use rollcall_parser::{Cell, ColumnKind, StudentId};

use crate::error::{PipelineError, Result};
use crate::merge::MergedTable;

pub const ID_COLUMN: &str = "ID";

/// Builds the unified sheet: `ID` first, then every merged column in source order.
///
/// Integer and float columns become numeric polars columns; text columns carry the
/// rendered cell, so pending SAT scores show their placeholder and non-academic periods
/// keep their label.
pub fn build_student_frame(table: &MergedTable) -> Result<DataFrame> {
    let ids: Vec<i64> = table.records().keys().map(|id| id.as_i64()).collect();
    let mut columns: Vec<Column> = Vec::with_capacity(table.columns().len() + 1);
    columns.push(Series::new(ID_COLUMN.into(), ids).into());

    for (index, column) in table.columns().iter().enumerate() {
        let name = column.spec.name.as_str();
        let cells = table.records().iter().map(|(id, record)| (id, &record.cells[index]));

        let series = match column.spec.kind {
            ColumnKind::Integer => {
                let values = cells
                    .map(|(id, cell)| match cell {
                        Cell::Missing => Ok(None),
                        Cell::Integer(value) => Ok(Some(*value)),
                        other => Err(mismatch(name, "integer", *id, other)),
                    })
                    .collect::<Result<Vec<Option<i64>>>>()?;
                Series::new(name.into(), values)
            }
            ColumnKind::Float => {
                let values = cells
                    .map(|(id, cell)| match cell {
                        Cell::Missing => Ok(None),
                        Cell::Float(_) | Cell::Integer(_) => Ok(cell.as_f64()),
                        other => Err(mismatch(name, "float", *id, other)),
                    })
                    .collect::<Result<Vec<Option<f64>>>>()?;
                Series::new(name.into(), values)
            }
            ColumnKind::Text => {
                let values: Vec<Option<String>> = cells.map(|(_, cell)| cell.render()).collect();
                Series::new(name.into(), values)
            }
        };
        columns.push(series.into());
    }

    Ok(DataFrame::new(columns)?)
}

fn mismatch(column: &str, expected: &str, id: StudentId, cell: &Cell) -> PipelineError {
    PipelineError::Validation(format!(
        "column '{column}' expects {expected} values but student {id} has {cell:?}"
    ))
}
