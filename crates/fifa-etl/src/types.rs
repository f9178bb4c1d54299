use crate::error::Result;
use crate::imputers::MeanFill;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One raw player row: column name to cell text, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: Vec<(String, Option<String>)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, column: impl Into<String>, value: Option<&str>) -> Self {
        self.set(column, value.map(str::to_string));
        self
    }

    /// Set a field, replacing any previous value for the same column.
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Build a text-only frame from raw records.
///
/// Columns appear in first-seen order; a record lacking a column contributes null.
pub fn records_to_frame(records: &[RawRecord]) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    for record in records {
        for column in record.columns() {
            if !names.iter().any(|n| n == column) {
                names.push(column.to_string());
            }
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            let values: Vec<Option<&str>> = records.iter().map(|r| r.get(name)).collect();
            Series::new(name.as_str().into(), values).into_column()
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// How many rows fell into each contract category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCounts {
    pub contract: usize,
    pub loan: usize,
    pub free: usize,
    pub unknown: usize,
}

/// What the transform stage did to a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformSummary {
    pub rows: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub contracts: ContractCounts,
    /// Result of the `Hits in K` batch fill, if the column was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_fill: Option<MeanFill>,
    pub processing_steps: Vec<String>,
}

/// End-of-run report for the whole pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct EtlSummary {
    pub input_file: String,
    pub rows_read: usize,
    pub columns_read: usize,
    pub transform: TransformSummary,
    pub sinks_written: Vec<String>,
    pub duration_ms: u64,
}
