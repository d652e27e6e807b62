use polars::prelude::{BooleanChunked, Column, DataFrame};
use rollcall_parser::{GradeLevel, GRADE_COLUMN};
use tracing::info;

use crate::error::{PipelineError, Result};

pub const ALL_STUDENTS_SHEET: &str = "ALL STUDENTS";
pub const EMAIL_COLUMN: &str = "email";

/// A named worksheet ready to be written.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub frame: DataFrame,
}

impl Sheet {
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

/// Splits the unified frame into one frame per grade level, 9 through 12.
///
/// Every row must land in exactly one partition; a row with a missing or out-of-range
/// grade is an error.
pub fn partition_by_grade(df: &DataFrame) -> Result<Vec<(GradeLevel, DataFrame)>> {
    let grades = df.column(GRADE_COLUMN)?.i64()?;

    let mut partitions = Vec::with_capacity(GradeLevel::ALL.len());
    for level in GradeLevel::ALL {
        let target = level.as_i64();
        let mask: BooleanChunked = grades.into_iter().map(|grade| grade == Some(target)).collect();
        partitions.push((level, df.filter(&mask)?));
    }

    let assigned: usize = partitions.iter().map(|(_, frame)| frame.height()).sum();
    if assigned != df.height() {
        return Err(PipelineError::Validation(format!(
            "{} of {} students have no grade level between 9 and 12",
            df.height() - assigned,
            df.height()
        )));
    }
    Ok(partitions)
}

pub fn drop_columns(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let kept: Vec<Column> = df
        .get_columns()
        .iter()
        .filter(|column| !names.iter().any(|name| name == column.name().as_str()))
        .cloned()
        .collect();
    Ok(DataFrame::new(kept)?)
}

/// "ALL STUDENTS" with every column, then one sheet per grade without names or email.
pub fn report_sheets(all: &DataFrame, identifying: &[String]) -> Result<Vec<Sheet>> {
    let mut sheets = vec![Sheet::new(ALL_STUDENTS_SHEET, all.clone())];
    for (level, frame) in partition_by_grade(all)? {
        sheets.push(Sheet::new(level.sheet_name(), drop_columns(&frame, identifying)?));
    }
    log_sheets("report", &sheets);
    Ok(sheets)
}

/// Same layout as the report, restricted to students with an email address and keeping
/// the identifying columns a mail merge needs.
pub fn mail_merge_sheets(all: &DataFrame) -> Result<Vec<Sheet>> {
    let emails = email_column(all)?;
    let mask = emails.as_materialized_series().is_not_null();
    let reachable = all.filter(&mask)?;

    let mut sheets = vec![Sheet::new(ALL_STUDENTS_SHEET, reachable.clone())];
    for (level, frame) in partition_by_grade(&reachable)? {
        sheets.push(Sheet::new(level.sheet_name(), frame));
    }
    log_sheets("mail_merge", &sheets);
    Ok(sheets)
}

fn email_column(df: &DataFrame) -> Result<&Column> {
    df.column(EMAIL_COLUMN).map_err(|_| {
        PipelineError::Validation(format!(
            "mail merge needs an '{EMAIL_COLUMN}' column in the merged table"
        ))
    })
}

fn log_sheets(workbook: &str, sheets: &[Sheet]) {
    for sheet in sheets {
        info!(
            workbook,
            sheet = %sheet.name,
            rows = sheet.frame.height(),
            columns = sheet.frame.width(),
            "Prepared sheet"
        );
    }
}
