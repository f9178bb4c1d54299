//! Data sanitization functions for cleaning text values.

use crate::error::Result;
use crate::utils::{column_names, string_values};
use polars::prelude::*;
use tracing::debug;

/// Trim surrounding whitespace from every text column; blank cells become null.
pub(crate) fn trim_text_columns(df: DataFrame) -> Result<DataFrame> {
    let mut df = df;
    let names = column_names(&df);

    for col_name in &names {
        let is_text = df
            .column(col_name)
            .map(|col| col.dtype() == &DataType::String)
            .unwrap_or(false);
        if !is_text {
            continue;
        }

        let cleaned: Vec<Option<String>> = string_values(&df, col_name)?
            .into_iter()
            .map(|value| {
                value
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
            .collect();
        df.replace(col_name, Series::new(col_name.as_str().into(), cleaned))?;
    }

    debug!("Trimmed {} columns", names.len());
    Ok(df)
}

/// Remove embedded line breaks from a text column (club names are exported
/// with leading newlines).
pub(crate) fn strip_line_breaks(df: &mut DataFrame, column: &str) -> Result<()> {
    let cleaned: Vec<Option<String>> = string_values(df, column)?
        .into_iter()
        .map(|value| value.map(|v| v.replace(['\n', '\r'], "").trim().to_string()))
        .collect();
    df.replace(column, Series::new(column.into(), cleaned))?;
    Ok(())
}
