use crate::error::{EtlError, Result};
use crate::pipeline::EtlStage;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// A destination for the clean table.
pub trait Sink {
    /// Short name used in logs, errors and the run summary.
    fn name(&self) -> &str;

    /// Stage reported while this sink is writing.
    fn stage(&self) -> EtlStage;

    /// Persist the whole frame.
    fn write(&mut self, df: &mut DataFrame) -> Result<()>;
}

/// Writes the clean table as a UTF-8 CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn stage(&self) -> EtlStage {
        EtlStage::LoadCsv
    }

    fn write(&mut self, df: &mut DataFrame) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EtlError::sink(self.name(), e))?;
        }

        let mut file = File::create(&self.path).map_err(|e| EtlError::sink(self.name(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .map_err(|e| EtlError::sink(self.name(), e))?;

        info!(
            "Wrote {} rows to {}",
            df.height(),
            self.path.display()
        );
        Ok(())
    }
}
