//! Column-level conversions built on the field parsers.
//!
//! Each converter reads one raw text column, runs a field parser over every
//! cell and writes the typed result back. Strict converters record a
//! [`FieldParseError`] per rejected cell instead of stopping at the first one.

use crate::cleaner::parsers::{
    ContractType, FieldError, contract_end, contract_start, classify_contract, parse_hits,
};
use crate::error::{FieldParseError, Result};
use crate::utils::string_values;
use polars::prelude::*;
use tracing::debug;

/// Run a strict parser over a column of raw cells.
///
/// Null cells stay null; rejected cells become null and are recorded in `failures`.
pub(crate) fn parse_strict<T>(
    column: &str,
    values: &[Option<String>],
    parse: impl Fn(&str) -> std::result::Result<T, FieldError>,
    failures: &mut Vec<FieldParseError>,
) -> Vec<Option<T>> {
    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            let raw = value.as_deref()?;
            match parse(raw) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    failures.push(FieldParseError::new(row, column, raw, &err));
                    None
                }
            }
        })
        .collect()
}

fn replace_and_rename(df: &mut DataFrame, source: &str, target: &str, series: Series) -> Result<()> {
    df.replace(source, series)?;
    if source != target {
        df.rename(source, target.into())?;
    }
    Ok(())
}

/// Convert a text column to Int64 in place, renaming it to `target`.
pub(crate) fn convert_to_int(
    df: &mut DataFrame,
    source: &str,
    target: &str,
    parse: impl Fn(&str) -> std::result::Result<i64, FieldError>,
    failures: &mut Vec<FieldParseError>,
) -> Result<()> {
    let values = string_values(df, source)?;
    let parsed = parse_strict(source, &values, parse, failures);
    let series = Series::new(source.into(), parsed);
    replace_and_rename(df, source, target, series)?;
    debug!("Converted '{}' -> '{}' (Int64)", source, target);
    Ok(())
}

/// Convert a text column to Float64 in place, renaming it to `target`.
pub(crate) fn convert_to_float(
    df: &mut DataFrame,
    source: &str,
    target: &str,
    parse: impl Fn(&str) -> std::result::Result<f64, FieldError>,
    failures: &mut Vec<FieldParseError>,
) -> Result<()> {
    let values = string_values(df, source)?;
    let parsed = parse_strict(source, &values, parse, failures);
    let series = Series::new(source.into(), parsed);
    replace_and_rename(df, source, target, series)?;
    debug!("Converted '{}' -> '{}' (Float64)", source, target);
    Ok(())
}

/// Replace the `Hits` column with decimal `Hits in K`; unparseable cells become null.
pub(crate) fn convert_hits(df: &mut DataFrame, source: &str, target: &str) -> Result<usize> {
    let values = string_values(df, source)?;
    let parsed: Vec<Option<f64>> = values
        .iter()
        .map(|value| value.as_deref().and_then(parse_hits))
        .collect();
    let missing = parsed.iter().filter(|v| v.is_none()).count();

    let series = Series::new(source.into(), parsed);
    replace_and_rename(df, source, target, series)?;
    debug!("Converted '{}' -> '{}' ({} missing)", source, target, missing);
    Ok(missing)
}

/// Derived contract columns, one entry per row.
#[derive(Debug, Default)]
pub(crate) struct ContractColumns {
    pub contract_type: Vec<Option<ContractType>>,
    pub start: Vec<Option<String>>,
    pub end: Vec<Option<String>>,
}

/// Derive `Type of Contract`, `Start year` and `End year`.
///
/// Contract shapes that match no known form resolve to null.
pub(crate) fn derive_contract_columns(
    contracts: &[Option<String>],
    loan_ends: &[Option<String>],
) -> ContractColumns {
    let mut derived = ContractColumns::default();

    for (row, contract) in contracts.iter().enumerate() {
        let Some(contract) = contract.as_deref() else {
            derived.contract_type.push(None);
            derived.start.push(None);
            derived.end.push(None);
            continue;
        };
        let loan_end = loan_ends.get(row).and_then(|v| v.as_deref());

        derived
            .contract_type
            .push(classify_contract(contract));
        derived
            .start
            .push(contract_start(contract).map(|b| b.to_string()));
        derived
            .end
            .push(contract_end(contract, loan_end).map(|b| b.to_string()));
    }

    derived
}
