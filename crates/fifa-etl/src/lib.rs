//! FIFA21 Player Data ETL Library
//!
//! Extracts the raw FIFA21 player export, cleans it into a typed table and
//! loads the result into a CSV file and a PostgreSQL table. Built with Rust
//! and Polars.
//!
//! # Overview
//!
//! - **Extract**: read the raw CSV with every column as text
//! - **Transform**: normalize heights, weights, money, star ratings, grouped
//!   skills, contract terms and popularity counts; fill missing `Hits in K`
//!   with the batch mean; prune and reorder columns into the canonical layout
//! - **Load**: write to any number of [`Sink`]s (CSV file, PostgreSQL table)
//! - **Progress Reporting**: per-stage updates through a callback
//!
//! Any cell that fails a strict field rule (money, height, weight, star
//! ratings, grouped skills) rejects the whole batch; every offending cell is
//! reported in [`EtlError::ParseFailures`] and nothing is written.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fifa_etl::{EtlConfig, EtlPipeline};
//!
//! let config = EtlConfig::builder()
//!     .input_path("data/fifa21_raw_data_v2.csv")
//!     .output_path("data/fifa21_clean.csv")
//!     .write_database(false)
//!     .build()?;
//!
//! let summary = EtlPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("Cleaned {} rows", summary.rows_read);
//! ```
//!
//! # Transforming in memory
//!
//! [`RecordTransformer`] works on frames directly, without any files:
//!
//! ```rust,ignore
//! use fifa_etl::{RawRecord, RecordTransformer};
//!
//! let record = RawRecord::new()
//!     .with("Name", Some("L. Messi"))
//!     .with("Height", Some("5'7\""))
//!     .with("Value", Some("€67.5M"));
//!
//! let clean = RecordTransformer::new().transform_record(&record)?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod io;
pub mod layout;
pub mod pipeline;
pub mod transformer;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{ContractBound, ContractType, FieldError};
pub use config::{ConfigValidationError, DatabaseConfig, EtlConfig, EtlConfigBuilder};
pub use error::{EtlError, FieldParseError, Result as EtlResult, ResultExt};
pub use imputers::{MeanFill, StatisticalImputer};
pub use io::{CsvSink, DatabaseSink, Sink, SqlColumnType, read_raw_csv};
pub use layout::{CanonicalLayout, Placement};
pub use pipeline::{
    ClosureProgressReporter, EtlPipeline, EtlPipelineBuilder, EtlStage, ProgressReporter,
    ProgressUpdate,
};
pub use transformer::RecordTransformer;
pub use types::{ContractCounts, EtlSummary, RawRecord, TransformSummary, records_to_frame};
