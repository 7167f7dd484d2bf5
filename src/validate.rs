//! Traceability gate for new production rows.
//!
//! Every ingredient an operator selects for a production row must match a
//! registered incoming lot exactly, on both name and lot code. A single miss
//! blocks the whole row; partial appends never happen.

use crate::error::{RegistroError, TraceFailure};
use crate::schema::{IncomingLot, IngredientLot};

/// Reject rows with missing required fields before any remote work starts.
pub fn require_complete(
    product: &str,
    entries: &[IngredientLot],
) -> Result<(), RegistroError> {
    if product.trim().is_empty() {
        return Err(RegistroError::Incomplete(
            "product name is required".to_string(),
        ));
    }
    if entries.is_empty() {
        return Err(RegistroError::Incomplete(
            "at least one ingredient is required".to_string(),
        ));
    }
    for entry in entries {
        if entry.name.trim().is_empty() || entry.lot.trim().is_empty() {
            return Err(RegistroError::Incomplete(format!(
                "ingredient entry {:?} is missing a name or lot code",
                entry.name
            )));
        }
    }
    Ok(())
}

/// Check every (name, lot) pair against the in-memory incoming-goods catalog.
/// Matching is exact: no partial matches, no case folding.
pub fn validate_traceability(
    entries: &[IngredientLot],
    lots: &[IncomingLot],
) -> Result<(), RegistroError> {
    let fails: Vec<TraceFailure> = entries
        .iter()
        .filter(|entry| {
            !lots
                .iter()
                .any(|lot| lot.name == entry.name && lot.lot == entry.lot)
        })
        .map(|entry| TraceFailure {
            name: entry.name.clone(),
            lot: entry.lot.clone(),
        })
        .collect();
    if fails.is_empty() {
        Ok(())
    } else {
        Err(RegistroError::Validation(fails))
    }
}
