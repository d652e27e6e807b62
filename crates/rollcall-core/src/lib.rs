pub mod completeness;
pub mod config;
pub mod error;
pub mod frame;
pub mod grouping;
pub mod ingest;
pub mod merge;
pub mod pipeline;
pub mod spreadsheet;
pub mod summary;
pub mod workbook;

pub use config::RunConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{compile, run, CompiledRun};
