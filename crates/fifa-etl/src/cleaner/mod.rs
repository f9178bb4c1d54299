//! Field cleaning for raw player records.
//!
//! This module provides:
//! - Pure field parsers (height, weight, money, ratings, contracts, hits)
//! - Column converters that apply a parser to a whole column
//! - Text sanitization (trimming, line-break removal)

mod converters;
pub mod parsers;
mod sanitizers;

pub(crate) use converters::{
    convert_hits, convert_to_float, convert_to_int, derive_contract_columns,
};
pub use parsers::{ContractBound, ContractType, FieldError};
pub(crate) use sanitizers::{strip_line_breaks, trim_text_columns};
