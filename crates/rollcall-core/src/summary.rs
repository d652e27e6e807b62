use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::completeness::DiscardedStudent;
use crate::error::Result;
use crate::grouping::Sheet;
use crate::ingest::InputReport;

#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
}

impl SheetSummary {
    pub fn from_sheets(sheets: &[Sheet]) -> Vec<Self> {
        sheets
            .iter()
            .map(|sheet| SheetSummary {
                name: sheet.name.clone(),
                rows: sheet.frame.height(),
                columns: sheet.frame.width(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkbookSummary {
    pub path: PathBuf,
    pub sheets: Vec<SheetSummary>,
}

/// Record of one compile run, written as JSON next to the workbook.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub completeness_threshold: usize,
    pub inputs: Vec<InputReport>,
    pub merged_students: usize,
    pub retained_students: usize,
    pub discarded: Vec<DiscardedStudent>,
    pub workbooks: Vec<WorkbookSummary>,
}

impl RunSummary {
    pub fn write(&self, path: &Path) -> Result<()> {
        let document = json!({
            "generator": concat!("rollcall ", env!("CARGO_PKG_VERSION")),
            "run": self,
        });
        let bytes = serde_json::to_vec_pretty(&document)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        info!(run_id = %self.run_id, path = %path.display(), "Wrote run summary");
        Ok(())
    }
}
