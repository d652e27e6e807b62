use std::fs;
use std::path::{Path, PathBuf};

use rollcall_parser::formats::{LateWindow, PeriodLayout};
use rollcall_parser::{GradeLevel, ReportingPeriod};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Everything one compile run needs: the input exports, the output locations and the
/// knobs the readers and the merge take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub gpa_file: PathBuf,
    pub rank_file: PathBuf,
    pub attendance_files: AttendanceFiles,
    pub swipe_file: PathBuf,
    #[serde(default)]
    pub sat_files: Vec<GradeFile>,
    #[serde(default)]
    pub service_files: Vec<GradeFile>,
    pub grades_file: PathBuf,
    pub email_file: PathBuf,
    pub completeness_threshold: usize,
    pub reporting_period: ReportingPeriod,
    pub output: OutputConfig,
    #[serde(default)]
    pub readers: ReaderOptions,
    #[serde(default)]
    pub defaults: DefaultValues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendanceFiles {
    pub weekly: PathBuf,
    pub year_to_date: PathBuf,
}

/// An export that is produced once per grade level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeFile {
    pub grade: GradeLevel,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub workbook: PathBuf,
    #[serde(default = "default_true")]
    pub mail_merge: bool,
    /// Defaults to `<workbook stem>_mail_merge.xlsx` beside the main workbook.
    #[serde(default)]
    pub mail_merge_workbook: Option<PathBuf>,
    /// Defaults to `<workbook stem>_summary.json` beside the main workbook.
    #[serde(default)]
    pub summary: Option<PathBuf>,
}

impl OutputConfig {
    pub fn mail_merge_path(&self) -> Option<PathBuf> {
        if !self.mail_merge {
            return None;
        }
        Some(
            self.mail_merge_workbook
                .clone()
                .unwrap_or_else(|| sibling(&self.workbook, "_mail_merge", "xlsx")),
        )
    }

    pub fn summary_path(&self) -> PathBuf {
        self.summary
            .clone()
            .unwrap_or_else(|| sibling(&self.workbook, "_summary", "json"))
    }
}

fn sibling(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rollcall".to_string());
    path.with_file_name(format!("{stem}{suffix}.{extension}"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderOptions {
    /// Year-to-date attendance rows for any other school are dropped.
    pub home_school: String,
    pub late_window: LateWindow,
    pub sat_scores_released: bool,
    pub periods: PeriodLayout,
    /// Sheet holding the roster when the email list is a workbook.
    pub email_sheet: String,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            home_school: "HYDE PARK HS".to_string(),
            late_window: LateWindow::default(),
            sat_scores_released: false,
            periods: PeriodLayout::default(),
            email_sheet: "All".to_string(),
        }
    }
}

/// Text written into cells a student has no data for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultValues {
    pub sat_pending: String,
    pub no_late_arrivals: String,
    pub service_notes: ServiceNotes,
}

impl Default for DefaultValues {
    fn default() -> Self {
        Self {
            sat_pending: "Scores coming in mid-May".to_string(),
            no_late_arrivals: "None!".to_string(),
            service_notes: ServiceNotes::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceNotes {
    pub grade_9: String,
    pub grade_10: String,
    pub grade_11: String,
    pub grade_12: String,
}

impl Default for ServiceNotes {
    fn default() -> Self {
        Self {
            grade_9: "No hours logged yet, aim for 10 by the end of 9th grade".to_string(),
            grade_10: "No hours logged yet, aim for 20 by the end of 10th grade".to_string(),
            grade_11: "No hours logged yet, aim for 30 by the end of 11th grade".to_string(),
            grade_12: "No hours logged yet, 40 are required to graduate".to_string(),
        }
    }
}

impl ServiceNotes {
    pub fn for_grade(&self, grade: GradeLevel) -> &str {
        match grade {
            GradeLevel::Nine => &self.grade_9,
            GradeLevel::Ten => &self.grade_10,
            GradeLevel::Eleven => &self.grade_11,
            GradeLevel::Twelve => &self.grade_12,
        }
    }
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Reads a TOML config; relative paths inside it are taken relative to the file itself.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| PipelineError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        join(&mut self.gpa_file);
        join(&mut self.rank_file);
        join(&mut self.attendance_files.weekly);
        join(&mut self.attendance_files.year_to_date);
        join(&mut self.swipe_file);
        join(&mut self.grades_file);
        join(&mut self.email_file);
        for file in self.sat_files.iter_mut().chain(self.service_files.iter_mut()) {
            join(&mut file.path);
        }
        join(&mut self.output.workbook);
        if let Some(path) = self.output.mail_merge_workbook.as_mut() {
            join(path);
        }
        if let Some(path) = self.output.summary.as_mut() {
            join(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.completeness_threshold == 0 {
            return Err(PipelineError::Config(
                "completeness_threshold must be at least 1".to_string(),
            ));
        }
        if self.reporting_period.end < self.reporting_period.start {
            return Err(PipelineError::Config(format!(
                "reporting_period ends ({}) before it starts ({})",
                self.reporting_period.end, self.reporting_period.start
            )));
        }
        if self.readers.late_window.start > self.readers.late_window.end {
            return Err(PipelineError::Config(format!(
                "late_window start {} is after end {}",
                self.readers.late_window.start, self.readers.late_window.end
            )));
        }
        if self.readers.periods.periods.is_empty() {
            return Err(PipelineError::Config(
                "at least one class period must be configured".to_string(),
            ));
        }
        for double in &self.readers.periods.double_periods {
            if let Some(split) = double
                .split
                .iter()
                .find(|split| !self.readers.periods.periods.contains(split))
            {
                return Err(PipelineError::Config(format!(
                    "double period {} splits into unknown period {split}",
                    double.combined
                )));
            }
        }
        check_grades_unique("sat_files", &self.sat_files)?;
        check_grades_unique("service_files", &self.service_files)?;
        Ok(())
    }
}

fn check_grades_unique(key: &str, files: &[GradeFile]) -> Result<()> {
    for (idx, file) in files.iter().enumerate() {
        if files[..idx].iter().any(|earlier| earlier.grade == file.grade) {
            return Err(PipelineError::Config(format!(
                "{key} lists grade {} more than once",
                file.grade
            )));
        }
    }
    Ok(())
}
