use chrono::Utc;
use polars::prelude::DataFrame;
use rollcall_parser::formats::{
    ClassRankReader, CurrentGradesReader, EmailReader, GpaReader, SatReader,
    ServiceLearningReader, SwipeReader, WeeklyAttendanceReader, YearToDateAttendanceReader,
};
use rollcall_parser::{GradeLevel, SourceKind, SourceReader, SourceTable};
use tracing::info;
use uuid::Uuid;

use crate::completeness::{apply_completeness, DiscardedStudent};
use crate::config::{GradeFile, RunConfig};
use crate::error::Result;
use crate::frame::build_student_frame;
use crate::grouping::{mail_merge_sheets, report_sheets, Sheet};
use crate::ingest::{IngestLedger, InputReport};
use crate::merge::{merge_sources, MergedTable};
use crate::summary::{RunSummary, SheetSummary, WorkbookSummary};
use crate::workbook::write_workbook;

/// Everything a run produces before anything is written to disk.
#[derive(Debug)]
pub struct CompiledRun {
    pub inputs: Vec<InputReport>,
    pub merged_students: usize,
    pub table: MergedTable,
    pub discarded: Vec<DiscardedStudent>,
    pub frame: DataFrame,
    pub report: Vec<Sheet>,
    pub mail_merge: Option<Vec<Sheet>>,
}

/// Reads every configured export, in the column order of the unified sheet.
pub fn load_sources(config: &RunConfig, ledger: &mut IngestLedger) -> Result<Vec<SourceTable>> {
    let readers = &config.readers;

    let gpa = ledger.ingest(&GpaReader, &config.gpa_file)?;
    let rank = ledger.ingest(&ClassRankReader, &config.rank_file)?;
    let weekly = ledger.ingest(
        &WeeklyAttendanceReader::new(config.reporting_period),
        &config.attendance_files.weekly,
    )?;
    let year_to_date = ledger.ingest(
        &YearToDateAttendanceReader::new(readers.home_school.clone()),
        &config.attendance_files.year_to_date,
    )?;
    let swipe = ledger.ingest(&SwipeReader::new(readers.late_window), &config.swipe_file)?;
    let sat = ingest_per_grade(
        ledger,
        &config.sat_files,
        SourceTable::new(SourceKind::Sat, SatReader::columns()),
        |grade| {
            SatReader::new(
                grade,
                readers.sat_scores_released,
                config.defaults.sat_pending.clone(),
            )
        },
    )?;
    let service = ingest_per_grade(
        ledger,
        &config.service_files,
        SourceTable::new(SourceKind::ServiceLearning, ServiceLearningReader::columns()),
        ServiceLearningReader::new,
    )?;
    let grades = ledger.ingest(
        &CurrentGradesReader::new(readers.periods.clone()),
        &config.grades_file,
    )?;
    let email = ledger.ingest_sheet(
        &EmailReader,
        &config.email_file,
        Some(readers.email_sheet.as_str()),
    )?;

    Ok(vec![
        gpa,
        rank,
        weekly,
        year_to_date,
        swipe,
        sat,
        service,
        grades,
        email,
    ])
}

fn ingest_per_grade<R, F>(
    ledger: &mut IngestLedger,
    files: &[GradeFile],
    empty: SourceTable,
    make_reader: F,
) -> Result<SourceTable>
where
    R: SourceReader,
    F: Fn(GradeLevel) -> R,
{
    let mut combined = empty;
    for file in files {
        let reader = make_reader(file.grade);
        let table = ledger.ingest(&reader, &file.path)?;
        combined = combined.union(reader.name(), table)?;
    }
    Ok(combined)
}

pub fn compile(config: &RunConfig) -> Result<CompiledRun> {
    config.validate()?;

    let mut ledger = IngestLedger::new();
    let tables = load_sources(config, &mut ledger)?;

    let mut table = merge_sources(&tables, &config.defaults)?;
    let merged_students = table.len();
    let discarded = apply_completeness(&mut table, config.completeness_threshold);

    let frame = build_student_frame(&table)?;
    let report = report_sheets(&frame, &table.identifying_columns())?;
    let mail_merge = if config.output.mail_merge {
        Some(mail_merge_sheets(&frame)?)
    } else {
        None
    };

    Ok(CompiledRun {
        inputs: ledger.into_reports(),
        merged_students,
        table,
        discarded,
        frame,
        report,
        mail_merge,
    })
}

/// Compiles the configured exports and writes the workbook(s) and the run summary.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    info!(%run_id, "Starting compile run");

    let compiled = compile(config)?;

    let mut workbooks = Vec::new();
    write_workbook(&config.output.workbook, &compiled.report)?;
    workbooks.push(WorkbookSummary {
        path: config.output.workbook.clone(),
        sheets: SheetSummary::from_sheets(&compiled.report),
    });

    if let (Some(path), Some(sheets)) = (config.output.mail_merge_path(), &compiled.mail_merge) {
        write_workbook(&path, sheets)?;
        workbooks.push(WorkbookSummary {
            path,
            sheets: SheetSummary::from_sheets(sheets),
        });
    }

    let summary = RunSummary {
        run_id,
        generated_at: Utc::now(),
        completeness_threshold: config.completeness_threshold,
        inputs: compiled.inputs,
        merged_students: compiled.merged_students,
        retained_students: compiled.table.len(),
        discarded: compiled.discarded,
        workbooks,
    };
    summary.write(&config.output.summary_path())?;

    info!(
        %run_id,
        retained = summary.retained_students,
        discarded = summary.discarded.len(),
        "Compile run finished"
    );
    Ok(summary)
}
