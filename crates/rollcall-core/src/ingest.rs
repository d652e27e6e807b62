use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use rollcall_parser::{SourceKind, SourceReader, SourceTable};
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::spreadsheet;

#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    pub path: PathBuf,
    pub reader: &'static str,
    pub source: SourceKind,
    pub schema: &'static str,
    pub schema_version: u32,
    pub hash: String,
    pub students: usize,
}

/// Reads every export of a run, refusing the same bytes under two different inputs.
#[derive(Debug, Default)]
pub struct IngestLedger {
    seen: HashMap<String, PathBuf>,
    reports: Vec<InputReport>,
}

impl IngestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, reader: &dyn SourceReader, path: &Path) -> Result<SourceTable> {
        self.ingest_sheet(reader, path, None)
    }

    /// Like [`IngestLedger::ingest`], but a workbook input is read from the named sheet
    /// instead of its first one. CSV inputs ignore `sheet`.
    pub fn ingest_sheet(
        &mut self,
        reader: &dyn SourceReader,
        path: &Path,
        sheet: Option<&str>,
    ) -> Result<SourceTable> {
        let contents = fs::read(path).map_err(|source| PipelineError::Input {
            path: path.to_path_buf(),
            source,
        })?;
        if spreadsheet::is_workbook(path) {
            let hash = self.claim(path, &contents)?;
            let text = spreadsheet::worksheet_csv(path, &contents, sheet)?;
            return self.parse_and_record(reader, path, hash, &text);
        }
        self.ingest_bytes(reader, path, &contents)
    }

    pub fn ingest_bytes(
        &mut self,
        reader: &dyn SourceReader,
        path: &Path,
        contents: &[u8],
    ) -> Result<SourceTable> {
        let hash = self.claim(path, contents)?;
        let Ok(content_str) = std::str::from_utf8(contents) else {
            return Err(PipelineError::Encoding {
                path: path.to_path_buf(),
            });
        };
        self.parse_and_record(reader, path, hash, content_str)
    }

    fn claim(&mut self, path: &Path, contents: &[u8]) -> Result<String> {
        let hash = compute_hash(contents);
        if let Some(first) = self.seen.get(&hash) {
            return Err(PipelineError::Validation(format!(
                "{} has the same contents as {}",
                path.display(),
                first.display()
            )));
        }
        self.seen.insert(hash.clone(), path.to_path_buf());
        Ok(hash)
    }

    fn parse_and_record(
        &mut self,
        reader: &dyn SourceReader,
        path: &Path,
        hash: String,
        content_str: &str,
    ) -> Result<SourceTable> {
        let table = reader.parse(content_str)?;
        let schema = reader.schema();
        info!(
            reader = reader.name(),
            path = %path.display(),
            hash = %hash,
            students = table.len(),
            "Ingested input"
        );

        self.reports.push(InputReport {
            path: path.to_path_buf(),
            reader: reader.name(),
            source: table.source,
            schema: schema.id,
            schema_version: schema.version,
            hash,
            students: table.len(),
        });
        Ok(table)
    }

    pub fn reports(&self) -> &[InputReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<InputReport> {
        self.reports
    }
}

pub fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
