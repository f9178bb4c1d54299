//! Field-level parsing rules.
//!
//! Every function here takes one raw cell and returns either a typed value,
//! a [`FieldError`] (for fields where an unrecognized shape must fail the
//! batch), or `None` (for fields where an unrecognized shape means "missing").

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Centimeters per foot.
pub const FEET_TO_CM: f64 = 30.48;

/// Pounds-to-kilograms factor as used by the historical exports.
///
/// The true factor is 0.4536; downstream consumers expect 0.4356.
pub const LBS_TO_KG: f64 = 0.4356;

/// Glyph used to render star ratings.
pub const STAR: char = '★';

/// Highest value a star rating can take.
pub const MAX_STARS: i64 = 5;

/// Date layout of loan dates, e.g. `Jun 30, 2021`.
pub const LOAN_DATE_FORMAT: &str = "%b %d, %Y";

const LOAN_SUFFIX: &str = " On Loan";

// Optional currency symbol, amount, optional unit suffix.
static MONEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([€$£])?\s*(\d+(?:\.\d+)?)\s*([A-Za-z]*)$").expect("Invalid regex: money")
});

/// Why a raw cell was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("unrecognized money format")]
    MalformedMoney,

    #[error("unknown unit suffix '{0}'")]
    UnknownUnit(String),

    #[error("rating {0} outside 0..=5")]
    RatingOutOfRange(i64),
}

/// Round to the nearest integer, ties to even.
#[inline]
pub fn round_half_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Parse a plain decimal number, ignoring surrounding whitespace.
pub fn parse_number(raw: &str) -> Result<f64, FieldError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| FieldError::NotANumber(trimmed.to_string()))
}

/// Parse a height (`5'7"` or `180cm`) into whole centimeters.
///
/// Feet/inches strings are read as the decimal `feet.inches`, so `5'7"`
/// becomes `5.7 * 30.48 = 173.736`, rounded to 174.
pub fn height_to_cm(raw: &str) -> Result<i64, FieldError> {
    let trimmed = raw.trim();
    let value = trimmed.strip_suffix("cm").unwrap_or(trimmed);

    if value.contains('\'') {
        let feet = parse_number(&value.replace('\'', ".").replace('"', ""))?;
        Ok(round_half_even(feet * FEET_TO_CM))
    } else {
        Ok(round_half_even(parse_number(value)?))
    }
}

/// Parse a weight (`170lbs` or `70kg`) into whole kilograms.
pub fn weight_to_kg(raw: &str) -> Result<i64, FieldError> {
    let trimmed = raw.trim();
    let value = trimmed.strip_suffix("kg").unwrap_or(trimmed);

    if value.contains("lbs") {
        let pounds = parse_number(&value.replace("lbs", ""))?;
        Ok(round_half_even(pounds * LBS_TO_KG))
    } else {
        Ok(round_half_even(parse_number(value)?))
    }
}

/// Parse a currency string (`€1.2M`, `€500K`, `€900`) into currency units.
pub fn parse_money(raw: &str) -> Result<f64, FieldError> {
    let caps = MONEY_PATTERN
        .captures(raw.trim())
        .ok_or(FieldError::MalformedMoney)?;

    let amount = parse_number(&caps[2])?;
    let multiplier = match caps.get(3).map_or("", |m| m.as_str()) {
        "" => 1.0,
        "K" => 1_000.0,
        "M" => 1_000_000.0,
        other => return Err(FieldError::UnknownUnit(other.to_string())),
    };

    Ok(amount * multiplier)
}

/// Currency string expressed in millions.
pub fn money_in_millions(raw: &str) -> Result<f64, FieldError> {
    Ok(parse_money(raw)? / 1_000_000.0)
}

/// Currency string expressed in whole units.
pub fn money_in_units(raw: &str) -> Result<i64, FieldError> {
    Ok(round_half_even(parse_money(raw)?))
}

/// Parse a star rating such as `3★`.
///
/// An empty value once the stars are removed counts as zero.
pub fn parse_star_rating(raw: &str) -> Result<i64, FieldError> {
    let digits: String = raw.chars().filter(|c| *c != STAR).collect();
    let digits = digits.trim();
    if digits.is_empty() {
        return Ok(0);
    }

    let rating = digits
        .parse::<i64>()
        .map_err(|_| FieldError::NotANumber(digits.to_string()))?;
    if !(0..=MAX_STARS).contains(&rating) {
        return Err(FieldError::RatingOutOfRange(rating));
    }
    Ok(rating)
}

/// Kind of contract a player is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractType {
    Free,
    Loan,
    Contract,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Loan => "Loan",
            Self::Contract => "Contract",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start or end of a contract: a bare year for fixed-term contracts, a
/// calendar date for loans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractBound {
    Year(i32),
    Date(NaiveDate),
}

impl ContractBound {
    /// Parse the text form written to the output (`2018` or `2021-06-30`).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Some(Self::Date(date));
        }
        parse_year(trimmed).map(Self::Year)
    }
}

impl fmt::Display for ContractBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Classify a raw `Contract` value.
pub fn classify_contract(raw: &str) -> Option<ContractType> {
    if raw.contains("Free") {
        Some(ContractType::Free)
    } else if raw.contains("Loan") {
        Some(ContractType::Loan)
    } else if raw.contains('~') {
        Some(ContractType::Contract)
    } else {
        None
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    if raw.len() != 4 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Parse a loan date such as `Jun 30, 2021`.
pub fn parse_loan_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), LOAN_DATE_FORMAT).ok()
}

/// Derive the contract start from the raw `Contract` value.
pub fn contract_start(contract: &str) -> Option<ContractBound> {
    let trimmed = contract.trim();
    match classify_contract(trimmed)? {
        ContractType::Contract => {
            let head: String = trimmed.chars().take(4).collect();
            parse_year(&head).map(ContractBound::Year)
        }
        ContractType::Loan => {
            let date = trimmed.strip_suffix(LOAN_SUFFIX).unwrap_or(trimmed);
            parse_loan_date(date).map(ContractBound::Date)
        }
        ContractType::Free => None,
    }
}

/// Derive the contract end from `Contract` and, for loans, `Loan Date End`.
pub fn contract_end(contract: &str, loan_date_end: Option<&str>) -> Option<ContractBound> {
    let trimmed = contract.trim();
    match classify_contract(trimmed)? {
        ContractType::Contract => {
            let chars: Vec<char> = trimmed.chars().collect();
            let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
            parse_year(&tail).map(ContractBound::Year)
        }
        ContractType::Loan => loan_date_end
            .and_then(parse_loan_date)
            .map(ContractBound::Date),
        ContractType::Free => None,
    }
}

/// Parse a popularity count (`12K`, `771`) into thousands-suffixed decimals.
///
/// Anything unparseable is treated as missing.
pub fn parse_hits(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.strip_suffix('K') {
        Some(prefix) => prefix.trim().parse().ok(),
        None => trimmed.parse().ok(),
    }
}

/// Average a grouped-skill total over its number of sub-attributes.
pub fn skill_average(total: f64, sub_attributes: u32) -> i64 {
    round_half_even(total / f64::from(sub_attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_feet_inches() {
        assert_eq!(height_to_cm("5'7\""), Ok(174));
        // 5.10 ft, not 5 ft 10 in
        assert_eq!(height_to_cm("5'10\""), Ok(155));
        assert_eq!(height_to_cm("6'2\""), Ok(189));
    }

    #[test]
    fn test_height_metric() {
        assert_eq!(height_to_cm("180cm"), Ok(180));
        assert_eq!(height_to_cm(" 170 "), Ok(170));
    }

    #[test]
    fn test_height_garbage() {
        assert!(matches!(height_to_cm("tall"), Err(FieldError::NotANumber(_))));
    }

    #[test]
    fn test_weight() {
        assert_eq!(weight_to_kg("170lbs"), Ok(74));
        assert_eq!(weight_to_kg("70kg"), Ok(70));
        assert_eq!(weight_to_kg("72"), Ok(72));
        assert!(weight_to_kg("heavy").is_err());
    }

    #[test]
    fn test_money_units() {
        assert_eq!(parse_money("€1.2M"), Ok(1_200_000.0));
        assert_eq!(parse_money("€500K"), Ok(500_000.0));
        assert_eq!(parse_money("€900"), Ok(900.0));
        assert_eq!(parse_money("0"), Ok(0.0));
    }

    #[test]
    fn test_money_scaled() {
        assert!((money_in_millions("€1.2M").unwrap() - 1.2).abs() < 1e-12);
        assert!((money_in_millions("€500K").unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(money_in_units("€500K"), Ok(500_000));
        assert_eq!(money_in_units("€1.5K"), Ok(1_500));
    }

    #[test]
    fn test_money_rejects_unknown_unit() {
        assert_eq!(
            parse_money("€3B"),
            Err(FieldError::UnknownUnit("B".to_string()))
        );
        assert_eq!(parse_money("three million"), Err(FieldError::MalformedMoney));
        assert_eq!(parse_money(""), Err(FieldError::MalformedMoney));
    }

    #[test]
    fn test_star_rating() {
        assert_eq!(parse_star_rating("3★"), Ok(3));
        assert_eq!(parse_star_rating("5 ★"), Ok(5));
        assert_eq!(parse_star_rating("2"), Ok(2));
        assert_eq!(parse_star_rating("★"), Ok(0));
        assert_eq!(parse_star_rating("9★"), Err(FieldError::RatingOutOfRange(9)));
        assert!(matches!(parse_star_rating("x★"), Err(FieldError::NotANumber(_))));
    }

    #[test]
    fn test_classify_contract() {
        assert_eq!(classify_contract("2018 ~ 2021"), Some(ContractType::Contract));
        assert_eq!(classify_contract("Free"), Some(ContractType::Free));
        assert_eq!(
            classify_contract("Jun 30, 2021 On Loan"),
            Some(ContractType::Loan)
        );
        assert_eq!(classify_contract("unknown"), None);
    }

    #[test]
    fn test_contract_years() {
        assert_eq!(contract_start("2018 ~ 2021"), Some(ContractBound::Year(2018)));
        assert_eq!(contract_end("2018 ~ 2021", None), Some(ContractBound::Year(2021)));
    }

    #[test]
    fn test_loan_dates() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
        assert_eq!(
            contract_start("Jun 30, 2021 On Loan"),
            Some(ContractBound::Date(date))
        );
        assert_eq!(
            contract_end("Jun 30, 2021 On Loan", Some("Jun 30, 2021")),
            Some(ContractBound::Date(date))
        );
        assert_eq!(contract_end("Jun 30, 2021 On Loan", None), None);
        assert_eq!(contract_end("Jun 30, 2021 On Loan", Some("someday")), None);
    }

    #[test]
    fn test_free_and_ambiguous_contracts_have_no_bounds() {
        assert_eq!(contract_start("Free"), None);
        assert_eq!(contract_end("Free", Some("Jun 30, 2021")), None);
        assert_eq!(contract_start("20 ~ 21"), None);
        assert_eq!(contract_start("n/a"), None);
    }

    #[test]
    fn test_contract_bound_text_form() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
        assert_eq!(ContractBound::Year(2018).to_string(), "2018");
        assert_eq!(ContractBound::Date(date).to_string(), "2021-06-30");
        assert_eq!(ContractBound::parse("2021-06-30"), Some(ContractBound::Date(date)));
        assert_eq!(ContractBound::parse("2018"), Some(ContractBound::Year(2018)));
        assert_eq!(ContractBound::parse("soon"), None);
    }

    #[test]
    fn test_hits() {
        assert_eq!(parse_hits("12K"), Some(12.0));
        assert_eq!(parse_hits("1.6K"), Some(1.6));
        assert_eq!(parse_hits("771"), Some(771.0));
        assert_eq!(parse_hits(""), None);
        assert_eq!(parse_hits("lots"), None);
    }

    #[test]
    fn test_skill_average_rounds_half_even() {
        assert_eq!(skill_average(300.0, 5), 60);
        assert_eq!(skill_average(302.0, 5), 60); // 60.4
        assert_eq!(skill_average(303.0, 5), 61); // 60.6
        assert_eq!(skill_average(15.0, 6), 2); // 2.5 ties to even
        assert_eq!(skill_average(21.0, 6), 4); // 3.5 ties to even
        assert_eq!(skill_average(7.0, 2), 4); // 3.5 ties to even
    }
}
