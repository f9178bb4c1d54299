use crate::error::{EtlError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::Path;
use tracing::info;

/// Read the raw player export.
///
/// Schema inference is disabled so every column arrives as text and the
/// transformer sees the exact cell contents.
pub fn read_raw_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(EtlError::SourceNotFound(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context("Failed to open source CSV")?
        .finish()
        .context("Failed to parse source CSV")?;

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}
