//! Rescales a series relative to its first observation.

use super::table::{ColumnData, TimeSeriesTable};
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// Name of the column appended by [`normalise`].
pub const NORMALISED_COLUMN: &str = "Normalised";

/// Reasons a normalisation request leaves the table untouched.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum NormalisationSkipped {
    #[error("table is empty")]
    EmptyTable,

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("first value of column '{0}' is missing")]
    MissingBaseValue(String),

    #[error("first value of column '{0}' is zero")]
    ZeroBaseValue(String),
}

/// Returns a copy of `table` with a `Normalised` column holding the fractional
/// change of `column` against its first row: `(v_i - v_0) / v_0`.
///
/// An existing `Normalised` column is overwritten. Rows with a missing value
/// get a missing normalised value.
pub fn normalise(
    table: &TimeSeriesTable,
    column: &str,
) -> Result<TimeSeriesTable, NormalisationSkipped> {
    if table.is_empty() {
        return Err(NormalisationSkipped::EmptyTable);
    }

    let values = match table.column(column) {
        None => return Err(NormalisationSkipped::MissingColumn(column.to_string())),
        Some(ColumnData::Text(_)) => {
            return Err(NormalisationSkipped::NotNumeric(column.to_string()));
        }
        Some(ColumnData::Numeric(values)) => values,
    };

    let first = values
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| NormalisationSkipped::MissingBaseValue(column.to_string()))?;
    if first == 0.0 {
        return Err(NormalisationSkipped::ZeroBaseValue(column.to_string()));
    }

    let normalised = values
        .iter()
        .map(|v| v.map(|x| (x - first) / first))
        .collect();

    let mut result = table.clone();
    result
        .push_column(NORMALISED_COLUMN, ColumnData::Numeric(normalised))
        .map_err(|_| NormalisationSkipped::EmptyTable)?;
    Ok(result)
}

/// Applies [`normalise`] when requested, logging and returning the input
/// unchanged when the column cannot be normalised.
pub fn apply_normalisation(
    table: TimeSeriesTable,
    enabled: bool,
    column: Option<&str>,
) -> TimeSeriesTable {
    let column = match (enabled, column) {
        (true, Some(column)) => column,
        _ => return table,
    };

    match normalise(&table, column) {
        Ok(normalised) => {
            debug!(column, rows = normalised.len(), "Normalised series");
            normalised
        }
        Err(reason) => {
            warn!(%reason, "Normalisation skipped, returning original table");
            table
        }
    }
}
