//! Column names and the canonical output layout.
//!
//! The output column order is computed declaratively from the input column
//! list: renames are applied, pruned columns removed, and a short list of
//! placements moves derived columns next to their anchors. Applying the
//! layout to a frame that already has it is a no-op.

use crate::error::{EtlError, Result};
use crate::utils::column_names;
use polars::prelude::*;
use tracing::debug;

/// Source and output column names.
pub mod columns {
    // Raw columns
    pub const LONG_NAME: &str = "LongName";
    pub const PLAYER_URL: &str = "playerUrl";
    pub const PHOTO_URL: &str = "photoUrl";
    pub const POTENTIAL: &str = "POT";
    pub const RAW_OVERALL: &str = "↓OVA";
    pub const CLUB: &str = "Club";
    pub const POSITIONS: &str = "Positions";
    pub const BEST_POSITION: &str = "Best Position";
    pub const HEIGHT: &str = "Height";
    pub const WEIGHT: &str = "Weight";
    pub const VALUE: &str = "Value";
    pub const WAGE: &str = "Wage";
    pub const RELEASE_CLAUSE: &str = "Release Clause";
    pub const CONTRACT: &str = "Contract";
    pub const LOAN_DATE_END: &str = "Loan Date End";
    pub const HITS: &str = "Hits";
    pub const WEAK_FOOT: &str = "W/F";
    pub const SKILL_MOVES: &str = "SM";
    pub const INTERNATIONAL_REPUTATION: &str = "IR";

    // Output columns
    pub const OVERALL: &str = "OVA";
    pub const HEIGHT_CM: &str = "Height in cm";
    pub const WEIGHT_KG: &str = "Weight in kg";
    pub const VALUE_MILLIONS: &str = "Value in Million Euro";
    pub const WAGE_UNITS: &str = "Wage in Euro";
    pub const RELEASE_CLAUSE_MILLIONS: &str = "Release Clause in Million Euro";
    pub const CONTRACT_TYPE: &str = "Type of Contract";
    pub const START_YEAR: &str = "Start year";
    pub const END_YEAR: &str = "End year";
    pub const HITS_K: &str = "Hits in K";

    /// Star-rated columns.
    pub const STAR_RATINGS: [&str; 3] = [WEAK_FOOT, SKILL_MOVES, INTERNATIONAL_REPUTATION];

    /// Grouped-skill columns and how many sub-attributes each one sums.
    pub const SKILL_GROUPS: [(&str, u32); 7] = [
        ("Attacking", 5),
        ("Skill", 5),
        ("Movement", 5),
        ("Power", 5),
        ("Mentality", 6),
        ("Defending", 3),
        ("Goalkeeping", 5),
    ];

    /// Output name of a grouped-skill average.
    pub fn avg_column(group: &str) -> String {
        format!("{group} AVG")
    }
}

/// Moves `column` to sit directly after `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub column: &'static str,
    pub after: &'static str,
}

/// Declarative description of the output column layout.
#[derive(Debug, Clone)]
pub struct CanonicalLayout {
    renames: Vec<(&'static str, &'static str)>,
    dropped: Vec<&'static str>,
    placements: Vec<Placement>,
}

impl Default for CanonicalLayout {
    fn default() -> Self {
        use columns::*;

        Self {
            renames: vec![(RAW_OVERALL, OVERALL)],
            dropped: vec![
                LONG_NAME,
                PLAYER_URL,
                PHOTO_URL,
                POTENTIAL,
                LOAN_DATE_END,
                HITS,
            ],
            placements: vec![
                Placement {
                    column: CONTRACT_TYPE,
                    after: CONTRACT,
                },
                Placement {
                    column: START_YEAR,
                    after: CONTRACT_TYPE,
                },
                Placement {
                    column: END_YEAR,
                    after: START_YEAR,
                },
                Placement {
                    column: BEST_POSITION,
                    after: POSITIONS,
                },
            ],
        }
    }
}

impl CanonicalLayout {
    pub fn new(
        renames: Vec<(&'static str, &'static str)>,
        dropped: Vec<&'static str>,
        placements: Vec<Placement>,
    ) -> Self {
        Self {
            renames,
            dropped,
            placements,
        }
    }

    /// Columns this layout removes.
    pub fn dropped(&self) -> &[&'static str] {
        &self.dropped
    }

    fn renamed<'a>(&self, name: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| *from == name)
            .map_or(name, |(_, to)| *to)
    }

    /// Compute the output column order for a given input column list.
    ///
    /// Placements whose column or anchor is absent are skipped.
    pub fn target_order<S: AsRef<str>>(&self, input: &[S]) -> Vec<String> {
        let mut order: Vec<String> = input
            .iter()
            .map(|name| self.renamed(name.as_ref()).to_string())
            .filter(|name| !self.dropped.iter().any(|d| *d == name.as_str()))
            .collect();

        for placement in &self.placements {
            let Some(from) = order.iter().position(|c| c.as_str() == placement.column) else {
                continue;
            };
            if !order.iter().any(|c| c.as_str() == placement.after) {
                continue;
            }

            let column = order.remove(from);
            if let Some(anchor) = order.iter().position(|c| c.as_str() == placement.after) {
                order.insert(anchor + 1, column);
            }
        }

        order
    }

    /// Rename, prune and reorder a frame.
    pub fn apply(&self, mut df: DataFrame) -> Result<DataFrame> {
        let input = column_names(&df);

        for (from, to) in &self.renames {
            if !input.iter().any(|c| c.as_str() == *from) {
                continue;
            }
            df.rename(from, (*to).into())?;
            debug!("Renamed column '{}' -> '{}'", from, to);
        }

        let order = self.target_order(&input[..]);
        let present = column_names(&df);
        if let Some(missing) = order.iter().find(|c| !present.contains(*c)) {
            return Err(EtlError::ColumnNotFound(missing.clone()));
        }

        Ok(df.select(order.iter().map(String::as_str))?)
    }
}
