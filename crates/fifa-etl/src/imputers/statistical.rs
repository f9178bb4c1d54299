//! Statistical imputation methods.
//!
//! Provides batch-level mean imputation for numeric columns.

use crate::error::{EtlError, Result};
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a mean fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanFill {
    /// Number of cells that were null and received the mean.
    pub filled: usize,
    /// The value written into those cells.
    pub mean: f64,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls in a numeric column with the mean of its non-null values.
    ///
    /// The mean is computed once over the whole column before any cell is
    /// written. A column with no data at all is filled with `0.0`.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<MeanFill> {
        let column = df
            .column(col_name)
            .map_err(|_| EtlError::ColumnNotFound(col_name.to_string()))?;
        let series = column
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        let missing = series.null_count();
        let mean = match series.mean() {
            Some(mean) => mean,
            None if series.is_empty() => 0.0,
            None => {
                warn!("Column '{}' has no values; filling with 0.0", col_name);
                0.0
            }
        };

        if missing == 0 {
            df.replace(col_name, series)?;
            return Ok(MeanFill { filled: 0, mean });
        }

        let fill = Float64Chunked::full(series.name().clone(), mean, series.len()).into_series();
        let filled = fill.zip_with(&series.is_null(), &series)?;
        df.replace(col_name, filled)?;

        info!("Filled {} missing '{}' with mean {:.3}", missing, col_name, mean);
        processing_steps.push(format!(
            "Filled '{}' with mean: {:.2}",
            col_name, mean
        ));

        Ok(MeanFill {
            filled: missing,
            mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_numeric_mean_basic() {
        let mut df = df![
            "Hits in K" => [Some(12.0), None, Some(4.0)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let fill =
            StatisticalImputer::apply_numeric_mean(&mut df, "Hits in K", &mut steps).unwrap();

        assert_eq!(fill, MeanFill { filled: 1, mean: 8.0 });
        let values = df.column("Hits in K").unwrap();
        assert_eq!(values.null_count(), 0);
        assert_eq!(values.get(1).unwrap().try_extract::<f64>().unwrap(), 8.0);
        assert!(steps[0].contains("mean"));
    }

    #[test]
    fn test_apply_numeric_mean_no_missing() {
        let mut df = df!["x" => [1.0, 2.0]].unwrap();
        let mut steps = Vec::new();

        let fill = StatisticalImputer::apply_numeric_mean(&mut df, "x", &mut steps).unwrap();

        assert_eq!(fill.filled, 0);
        assert_eq!(fill.mean, 1.5);
        assert!(steps.is_empty());
    }

    #[test]
    fn test_apply_numeric_mean_all_missing() {
        let mut df = df!["x" => [None::<f64>, None]].unwrap();
        let mut steps = Vec::new();

        let fill = StatisticalImputer::apply_numeric_mean(&mut df, "x", &mut steps).unwrap();

        assert_eq!(fill, MeanFill { filled: 2, mean: 0.0 });
        assert_eq!(df.column("x").unwrap().null_count(), 0);
    }

    #[test]
    fn test_apply_numeric_mean_keeps_present_values() {
        let mut df = df![
            "Hits in K" => [None, Some(1.5), None, Some(12.25), Some(2.0)],
        ]
        .unwrap();
        let mut steps = Vec::new();

        let fill =
            StatisticalImputer::apply_numeric_mean(&mut df, "Hits in K", &mut steps).unwrap();

        assert_eq!(fill.filled, 2);
        let values: Vec<Option<f64>> = df
            .column("Hits in K")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            values,
            vec![Some(5.25), Some(1.5), Some(5.25), Some(12.25), Some(2.0)]
        );
        assert_eq!(df.column("Hits in K").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_apply_numeric_mean_casts_integers() {
        let mut df = df!["x" => [Some(1i64), None, Some(4)]].unwrap();
        let mut steps = Vec::new();

        let fill = StatisticalImputer::apply_numeric_mean(&mut df, "x", &mut steps).unwrap();

        assert_eq!(fill, MeanFill { filled: 1, mean: 2.5 });
        let column = df.column("x").unwrap();
        assert_eq!(column.dtype(), &DataType::Float64);
        assert_eq!(column.get(1).unwrap().try_extract::<f64>().unwrap(), 2.5);
    }

    #[test]
    fn test_apply_numeric_mean_missing_column() {
        let mut df = df!["x" => [1.0]].unwrap();
        let mut steps = Vec::new();

        let result = StatisticalImputer::apply_numeric_mean(&mut df, "y", &mut steps);
        assert!(matches!(result, Err(EtlError::ColumnNotFound(_))));
    }
}
