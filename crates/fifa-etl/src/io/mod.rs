//! Reading the raw export and writing the clean table.
//!
//! The source side is a single CSV reader. The load side is a small [`Sink`]
//! trait with a CSV file implementation and a PostgreSQL implementation.

mod database;
mod sinks;
mod source;

pub use database::{DatabaseSink, SqlColumnType};
pub use sinks::{CsvSink, Sink};
pub use source::read_raw_csv;
