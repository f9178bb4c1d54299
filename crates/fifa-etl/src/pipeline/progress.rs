//! Progress reporting for the ETL pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use fifa_etl::EtlPipeline;
//!
//! let summary = EtlPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of an ETL run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtlStage {
    /// Reading the raw CSV export
    Extract,
    /// Parsing fields, batch fill and layout
    Transform,
    /// Writing the clean CSV
    LoadCsv,
    /// Replacing the database table
    LoadDatabase,
    /// Run completed successfully
    Complete,
    /// Run failed with an error
    Failed,
}

impl EtlStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Extract => "Extracting",
            Self::Transform => "Transforming",
            Self::LoadCsv => "Writing CSV",
            Self::LoadDatabase => "Writing Database",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Extract => 0.20,
            Self::Transform => 0.40,
            Self::LoadCsv => 0.15,
            Self::LoadDatabase => 0.25,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Extract => 0.0,
            Self::Transform => 0.20,
            Self::LoadCsv => 0.60,
            Self::LoadDatabase => 0.75,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress update emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current stage
    pub stage: EtlStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: EtlStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: EtlStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: EtlStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread together with its reporter.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
