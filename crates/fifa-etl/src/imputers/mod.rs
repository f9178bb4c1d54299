//! Imputation module for handling missing values.
//!
//! Currently a single strategy: batch mean fill.

mod statistical;

pub use statistical::{MeanFill, StatisticalImputer};
