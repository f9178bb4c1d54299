//! Pipeline module.
//!
//! This module provides the ETL pipeline and its progress reporting.

mod builder;
pub mod progress;

pub use builder::{EtlPipeline, EtlPipelineBuilder};
pub use progress::{ClosureProgressReporter, EtlStage, ProgressReporter, ProgressUpdate};
