//! Main ETL pipeline module.
//!
//! This module provides the `EtlPipeline` struct and builder for running
//! extract, transform and load over the raw player export.

use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::io::{CsvSink, DatabaseSink, Sink, read_raw_csv};
use crate::pipeline::progress::{
    ClosureProgressReporter, EtlStage, ProgressReporter, ProgressUpdate,
};
use crate::transformer::RecordTransformer;
use crate::types::EtlSummary;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// The ETL pipeline.
///
/// Use [`EtlPipeline::builder()`] to create a new pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use fifa_etl::{EtlConfig, EtlPipeline};
///
/// let config = EtlConfig::builder().write_database(false).build()?;
/// let summary = EtlPipeline::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
/// ```
pub struct EtlPipeline {
    config: EtlConfig,
    transformer: RecordTransformer,
    sinks: Vec<Box<dyn Sink + Send>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure EtlPipeline is Send (can be moved to a worker thread)
static_assertions::assert_impl_all!(EtlPipeline: Send);

impl EtlPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> EtlPipelineBuilder {
        EtlPipelineBuilder::default()
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Names of the sinks this pipeline writes, in order.
    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Run extract, transform and every sink in order.
    ///
    /// Nothing is written when extraction or transformation fails. A failing
    /// sink stops the run; sinks after it are not attempted. The error is
    /// returned unlogged; callers decide how to report it.
    pub fn run(&mut self) -> Result<EtlSummary> {
        match self.run_internal() {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Processed {} rows in {} ms",
                    summary.rows_read, summary.duration_ms
                )));
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&mut self) -> Result<EtlSummary> {
        let start_time = Instant::now();
        let input = self.config.input_path.clone();

        info!("Starting ETL run for {}", input.display());

        // Step 1: Extract
        self.report_progress(ProgressUpdate::new(
            EtlStage::Extract,
            0.0,
            format!("Reading {}", input.display()),
        ));
        let raw = read_raw_csv(&input)?;
        let rows_read = raw.height();
        let columns_read = raw.width();
        self.report_progress(ProgressUpdate::new(
            EtlStage::Extract,
            1.0,
            format!("Read {} rows x {} columns", rows_read, columns_read),
        ));

        // Step 2: Transform
        self.report_progress(ProgressUpdate::new(
            EtlStage::Transform,
            0.0,
            "Cleaning records...",
        ));
        let (mut clean, transform) = self.transformer.transform(raw)?;
        self.report_progress(ProgressUpdate::new(
            EtlStage::Transform,
            1.0,
            format!("Cleaned {} rows into {} columns", clean.height(), clean.width()),
        ));

        // Step 3: Load
        if self.sinks.is_empty() {
            warn!("No sinks configured; clean data was not persisted");
        }
        let mut sinks_written = Vec::with_capacity(self.sinks.len());
        for index in 0..self.sinks.len() {
            let (name, stage) = {
                let sink = &self.sinks[index];
                (sink.name().to_string(), sink.stage())
            };
            self.report_progress(ProgressUpdate::new(
                stage,
                0.0,
                format!("Writing to {}", name),
            ));

            self.sinks[index].write(&mut clean)?;

            self.report_progress(ProgressUpdate::new(
                stage,
                1.0,
                format!("Wrote {} rows to {}", clean.height(), name),
            ));
            sinks_written.push(name);
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "ETL run complete: {} rows, {} sinks, {} ms",
            rows_read,
            sinks_written.len(),
            duration_ms
        );

        Ok(EtlSummary {
            input_file: input.display().to_string(),
            rows_read,
            columns_read,
            transform,
            sinks_written,
            duration_ms,
        })
    }
}

/// Builder for [`EtlPipeline`].
#[derive(Default)]
pub struct EtlPipelineBuilder {
    config: Option<EtlConfig>,
    transformer: Option<RecordTransformer>,
    extra_sinks: Vec<Box<dyn Sink + Send>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Ensure EtlPipelineBuilder is Send (can be moved to another thread during construction)
static_assertions::assert_impl_all!(EtlPipelineBuilder: Send);

impl EtlPipelineBuilder {
    /// Set the run configuration.
    pub fn config(mut self, config: EtlConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom transformer (for example with a different layout).
    pub fn transformer(mut self, transformer: RecordTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Append a sink after the configured CSV and database sinks.
    pub fn sink(mut self, sink: Box<dyn Sink + Send>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    /// Set a progress reporter for receiving updates during the run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// The configuration is validated; sinks are created from it in the
    /// order CSV, database, then any extra sinks.
    pub fn build(self) -> Result<EtlPipeline> {
        let config = match self.config {
            Some(config) => config,
            None => EtlConfig::builder().build()?,
        };
        config.validate()?;

        let mut sinks: Vec<Box<dyn Sink + Send>> = Vec::new();
        if config.write_csv {
            sinks.push(Box::new(CsvSink::new(config.output_path.clone())));
        }
        if config.write_database {
            let database = config.database.clone().ok_or_else(|| {
                EtlError::InvalidConfig("database settings are required".to_string())
            })?;
            sinks.push(Box::new(DatabaseSink::new(
                database,
                config.table_name.clone(),
            )));
        }
        sinks.extend(self.extra_sinks);

        Ok(EtlPipeline {
            config,
            transformer: self.transformer.unwrap_or_default(),
            sinks,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use polars::prelude::DataFrame;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn db() -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "fifa".to_string(),
            user: "etl".to_string(),
            password: String::new(),
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn stage(&self) -> EtlStage {
            EtlStage::LoadDatabase
        }

        fn write(&mut self, _df: &mut DataFrame) -> Result<()> {
            Err(EtlError::sink("failing", "unavailable"))
        }
    }

    #[test]
    fn test_builder_default_requires_database() {
        let result = EtlPipeline::builder().build();
        assert!(matches!(result, Err(EtlError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_sink_order() {
        let config = EtlConfig::builder().database(db()).build().unwrap();
        let pipeline = EtlPipeline::builder()
            .config(config)
            .sink(Box::new(FailingSink))
            .build()
            .unwrap();

        assert_eq!(pipeline.sink_names(), vec!["csv", "database", "failing"]);
    }

    #[test]
    fn test_builder_csv_only() {
        let config = EtlConfig::builder().write_database(false).build().unwrap();
        let pipeline = EtlPipeline::builder().config(config).build().unwrap();
        assert_eq!(pipeline.sink_names(), vec!["csv"]);
    }

    #[test]
    fn test_missing_source_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = EtlConfig::builder()
            .input_path(dir.path().join("missing.csv"))
            .output_path(dir.path().join("out.csv"))
            .write_database(false)
            .build()
            .unwrap();

        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut pipeline = EtlPipeline::builder()
            .config(config)
            .on_progress(move |update| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();

        let err = pipeline.run().unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *stages.lock().unwrap(),
            vec![EtlStage::Extract, EtlStage::Failed]
        );
        assert!(!dir.path().join("out.csv").exists());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_run_leaves_error_logging_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let config = EtlConfig::builder()
            .input_path(dir.path().join("missing.csv"))
            .output_path(dir.path().join("out.csv"))
            .write_database(false)
            .build()
            .unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();

        let result = tracing::subscriber::with_default(subscriber, || {
            EtlPipeline::builder().config(config).build().unwrap().run()
        });

        assert!(result.is_err());
        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Starting ETL run"));
        assert!(!output.contains(" ERROR "), "unexpected error log: {output}");
    }
}
