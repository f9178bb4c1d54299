//! Shared utilities for the ETL pipeline.
//!
//! Small helpers used across the cleaner, imputers and sinks.

use crate::error::{EtlError, Result};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Check whether a frame has a column.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Names of all columns, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Read a column as owned text values, casting non-text columns first.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| EtlError::ColumnNotFound(name.to_string()))?;
    let text = column.cast(&DataType::String)?;
    let values = text
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

// =============================================================================
// Tests
// =============================================================================
