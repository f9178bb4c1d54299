//! PostgreSQL sink.
//!
//! The table is dropped and recreated on every run, then filled inside a
//! single transaction. Inserts are chunked so no statement exceeds the
//! protocol's bind-parameter limit.

use super::sinks::Sink;
use crate::config::DatabaseConfig;
use crate::error::{EtlError, Result};
use crate::pipeline::EtlStage;
use crate::utils::{is_float_dtype, is_integer_dtype, string_values};
use polars::prelude::*;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::ops::Range;
use tracing::{debug, info};

/// Maximum bind parameters in a single PostgreSQL statement.
const MAX_BIND_PARAMS: usize = 65_535;

/// SQL column type chosen from a frame column's dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlColumnType {
    BigInt,
    DoublePrecision,
    Text,
}

impl SqlColumnType {
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_integer_dtype(dtype) {
            Self::BigInt
        } else if is_float_dtype(dtype) {
            Self::DoublePrecision
        } else {
            Self::Text
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::BigInt => "BIGINT",
            Self::DoublePrecision => "DOUBLE PRECISION",
            Self::Text => "TEXT",
        }
    }
}

/// Column values materialized for binding.
enum BindColumn {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl BindColumn {
    fn from_frame(df: &DataFrame, name: &str) -> Result<Self> {
        let column = df
            .column(name)
            .map_err(|_| EtlError::ColumnNotFound(name.to_string()))?;

        let values = match SqlColumnType::from_dtype(column.dtype()) {
            SqlColumnType::BigInt => {
                let cast = column.cast(&DataType::Int64)?;
                Self::Int(cast.as_materialized_series().i64()?.into_iter().collect())
            }
            SqlColumnType::DoublePrecision => {
                let cast = column.cast(&DataType::Float64)?;
                Self::Float(cast.as_materialized_series().f64()?.into_iter().collect())
            }
            SqlColumnType::Text => Self::Text(string_values(df, name)?),
        };
        Ok(values)
    }
}

/// Double-quote an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub(crate) fn create_table_sql(table: &str, schema: &[(String, SqlColumnType)]) -> String {
    let columns: Vec<String> = schema
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.as_sql()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), columns.join(", "))
}

pub(crate) fn insert_prefix(table: &str, columns: &[String]) -> String {
    let columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "INSERT INTO {} ({}) ",
        quote_ident(table),
        columns.join(", ")
    )
}

/// Row ranges such that each chunk binds fewer than [`MAX_BIND_PARAMS`] values.
pub(crate) fn row_chunks(rows: usize, columns: usize) -> Vec<Range<usize>> {
    if rows == 0 || columns == 0 {
        return Vec::new();
    }
    let per_chunk = (MAX_BIND_PARAMS / columns).max(1);
    (0..rows)
        .step_by(per_chunk)
        .map(|start| start..(start + per_chunk).min(rows))
        .collect()
}

/// Frame schema as SQL column definitions.
pub(crate) fn frame_schema(df: &DataFrame) -> Vec<(String, SqlColumnType)> {
    df.get_columns()
        .iter()
        .map(|c| (c.name().to_string(), SqlColumnType::from_dtype(c.dtype())))
        .collect()
}

/// Replaces a PostgreSQL table with the clean frame.
#[derive(Debug, Clone)]
pub struct DatabaseSink {
    config: DatabaseConfig,
    table: String,
}

impl DatabaseSink {
    pub fn new(config: DatabaseConfig, table: impl Into<String>) -> Self {
        Self {
            config,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(&self.config.database)
            .username(&self.config.user)
            .password(&self.config.password)
    }

    async fn replace_table(&self, df: &DataFrame) -> Result<u64> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(self.connect_options())
            .await?;

        let schema = frame_schema(df);
        let names: Vec<String> = schema.iter().map(|(name, _)| name.clone()).collect();
        let columns = names
            .iter()
            .map(|name| BindColumn::from_frame(df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = pool.begin().await?;
        sqlx::query(&drop_table_sql(&self.table))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&create_table_sql(&self.table, &schema))
            .execute(&mut *tx)
            .await?;

        let prefix = insert_prefix(&self.table, &names);
        let mut inserted = 0u64;
        for chunk in row_chunks(df.height(), columns.len()) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut row, i| {
                for column in &columns {
                    match column {
                        BindColumn::Int(values) => {
                            row.push_bind(values[i]);
                        }
                        BindColumn::Float(values) => {
                            row.push_bind(values[i]);
                        }
                        BindColumn::Text(values) => {
                            row.push_bind(values[i].clone());
                        }
                    }
                }
            });
            let done = builder.build().execute(&mut *tx).await?;
            inserted += done.rows_affected();
            debug!("Inserted {} rows into '{}'", done.rows_affected(), self.table);
        }

        tx.commit().await?;
        pool.close().await;
        Ok(inserted)
    }
}

impl Sink for DatabaseSink {
    fn name(&self) -> &str {
        "database"
    }

    fn stage(&self) -> EtlStage {
        EtlStage::LoadDatabase
    }

    fn write(&mut self, df: &mut DataFrame) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let inserted = runtime
            .block_on(self.replace_table(df))
            .map_err(|e| EtlError::sink(self.name(), e))?;

        info!(
            "Replaced table '{}' on {}:{} with {} rows",
            self.table, self.config.host, self.config.port, inserted
        );
        Ok(())
    }
}
