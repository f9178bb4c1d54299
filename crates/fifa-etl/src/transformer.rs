//! The record transformer.
//!
//! Turns a raw, all-text player frame into the clean layout. Every field
//! rule is row-local; the only batch-wide step is the `Hits in K` mean fill,
//! which runs after all rows are parsed. Strict fields (money, height,
//! weight, star ratings, skill totals) collect one failure per bad cell and
//! reject the whole batch; contract, date and hits shapes that match no known
//! form resolve to null.

use crate::cleaner::parsers::{
    ContractType, FieldError, height_to_cm, money_in_millions, money_in_units, parse_number,
    parse_star_rating, skill_average, weight_to_kg,
};
use crate::cleaner::{
    convert_hits, convert_to_float, convert_to_int, derive_contract_columns, strip_line_breaks,
    trim_text_columns,
};
use crate::error::{EtlError, FieldParseError, Result};
use crate::imputers::{MeanFill, StatisticalImputer};
use crate::layout::CanonicalLayout;
use crate::layout::columns::*;
use crate::types::{ContractCounts, RawRecord, TransformSummary, records_to_frame};
use crate::utils::{has_column, string_values};
use polars::prelude::*;
use tracing::{debug, error, info};

type IntParser = fn(&str) -> std::result::Result<i64, FieldError>;
type FloatParser = fn(&str) -> std::result::Result<f64, FieldError>;

const INT_FIELDS: [(&str, &str, IntParser); 3] = [
    (HEIGHT, HEIGHT_CM, height_to_cm),
    (WEIGHT, WEIGHT_KG, weight_to_kg),
    (WAGE, WAGE_UNITS, money_in_units),
];

const FLOAT_FIELDS: [(&str, &str, FloatParser); 2] = [
    (VALUE, VALUE_MILLIONS, money_in_millions),
    (RELEASE_CLAUSE, RELEASE_CLAUSE_MILLIONS, money_in_millions),
];

/// Cleans raw player frames.
#[derive(Debug, Clone, Default)]
pub struct RecordTransformer {
    layout: CanonicalLayout,
}

impl RecordTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom output layout.
    pub fn with_layout(layout: CanonicalLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &CanonicalLayout {
        &self.layout
    }

    /// Run the full transform: field rules, batch fill, canonical layout.
    pub fn transform(&self, df: DataFrame) -> Result<(DataFrame, TransformSummary)> {
        let mut summary = TransformSummary {
            rows: df.height(),
            columns_before: df.width(),
            ..Default::default()
        };

        info!("Transforming {} rows x {} columns", df.height(), df.width());

        let df = self.parse_fields(df, &mut summary)?;
        let (df, hits_fill) = self.finish_batch(df, &mut summary.processing_steps)?;
        summary.hits_fill = hits_fill;

        let df = self.layout.apply(df)?;
        summary.columns_after = df.width();
        summary
            .processing_steps
            .push(format!("Applied canonical layout ({} columns)", df.width()));

        info!(
            "Transform complete: {} rows x {} columns",
            df.height(),
            df.width()
        );
        Ok((df, summary))
    }

    /// Clean a single record.
    ///
    /// Applies the field rules and the layout but not the batch fill, so a
    /// record without `Hits` keeps a null `Hits in K`.
    pub fn transform_record(&self, record: &RawRecord) -> Result<DataFrame> {
        let df = records_to_frame(std::slice::from_ref(record))?;
        let mut summary = TransformSummary::default();
        let df = self.parse_fields(df, &mut summary)?;
        self.layout.apply(df)
    }

    /// Apply every row-local field rule.
    ///
    /// Rules whose source column is absent are skipped.
    pub fn parse_fields(&self, df: DataFrame, summary: &mut TransformSummary) -> Result<DataFrame> {
        let mut df = trim_text_columns(df)?;
        let mut failures: Vec<FieldParseError> = Vec::new();
        let steps = &mut summary.processing_steps;

        if has_column(&df, CLUB) {
            strip_line_breaks(&mut df, CLUB)?;
            steps.push(format!("Removed line breaks from '{}'", CLUB));
        }

        for (source, target, parse) in INT_FIELDS {
            if skip_missing(&df, source) {
                continue;
            }
            convert_to_int(&mut df, source, target, parse, &mut failures)?;
            steps.push(format!("Converted '{}' to '{}'", source, target));
        }

        for (source, target, parse) in FLOAT_FIELDS {
            if skip_missing(&df, source) {
                continue;
            }
            convert_to_float(&mut df, source, target, parse, &mut failures)?;
            steps.push(format!("Converted '{}' to '{}'", source, target));
        }

        for column in STAR_RATINGS {
            if skip_missing(&df, column) {
                continue;
            }
            convert_to_int(&mut df, column, column, parse_star_rating, &mut failures)?;
            steps.push(format!("Parsed star rating '{}'", column));
        }

        for (group, sub_attributes) in SKILL_GROUPS {
            if skip_missing(&df, group) {
                continue;
            }
            let target = avg_column(group);
            convert_to_int(
                &mut df,
                group,
                &target,
                |raw| parse_number(raw).map(|total| skill_average(total, sub_attributes)),
                &mut failures,
            )?;
            steps.push(format!("Averaged '{}' over {} attributes", group, sub_attributes));
        }

        if !skip_missing(&df, CONTRACT) {
            summary.contracts = self.derive_contracts(&mut df)?;
            steps.push("Derived contract type and bounds".to_string());
        }

        if !skip_missing(&df, HITS) {
            let missing = convert_hits(&mut df, HITS, HITS_K)?;
            steps.push(format!("Converted '{}' to '{}' ({} missing)", HITS, HITS_K, missing));
        }

        if !failures.is_empty() {
            for failure in &failures {
                error!("Parse failure at {}", failure);
            }
            return Err(EtlError::ParseFailures(failures));
        }

        Ok(df)
    }

    /// Batch-wide finishing pass: fill missing `Hits in K` with the batch mean.
    pub fn finish_batch(
        &self,
        mut df: DataFrame,
        processing_steps: &mut Vec<String>,
    ) -> Result<(DataFrame, Option<MeanFill>)> {
        if !has_column(&df, HITS_K) {
            debug!("No '{}' column; skipping mean fill", HITS_K);
            return Ok((df, None));
        }
        let fill = StatisticalImputer::apply_numeric_mean(&mut df, HITS_K, processing_steps)?;
        Ok((df, Some(fill)))
    }

    fn derive_contracts(&self, df: &mut DataFrame) -> Result<ContractCounts> {
        let contracts = string_values(df, CONTRACT)?;
        let loan_ends = if has_column(df, LOAN_DATE_END) {
            string_values(df, LOAN_DATE_END)?
        } else {
            vec![None; contracts.len()]
        };

        let derived = derive_contract_columns(&contracts, &loan_ends);

        let mut counts = ContractCounts::default();
        for kind in &derived.contract_type {
            match kind {
                Some(ContractType::Contract) => counts.contract += 1,
                Some(ContractType::Loan) => counts.loan += 1,
                Some(ContractType::Free) => counts.free += 1,
                None => counts.unknown += 1,
            }
        }

        let kinds: Vec<Option<&str>> = derived
            .contract_type
            .iter()
            .map(|kind| kind.map(|k| k.as_str()))
            .collect();
        df.with_column(Series::new(CONTRACT_TYPE.into(), kinds))?;
        df.with_column(Series::new(START_YEAR.into(), derived.start))?;
        df.with_column(Series::new(END_YEAR.into(), derived.end))?;

        debug!("Contract categories: {:?}", counts);
        Ok(counts)
    }
}

fn skip_missing(df: &DataFrame, column: &str) -> bool {
    if has_column(df, column) {
        return false;
    }
    debug!("Column '{}' not present; skipping its rule", column);
    true
}
