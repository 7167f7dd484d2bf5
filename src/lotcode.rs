//! Deterministic lot-code derivation for production batches.
//!
//! A lot code is an alphabetic sigla extracted from the product name plus a
//! `DDMMYY` date stamp. Collisions against the ledger's existing lot-code
//! column are resolved with an increasing integer suffix, globally across all
//! products.

use crate::ledger;
use chrono::NaiveDate;

/// Extract the alphabetic abbreviation for a product name: the first three
/// letters of a single-word name, or the first two letters of each of the
/// first two words. Non-letters are stripped and the result is uppercased.
pub fn sigla(product: &str) -> String {
    let words: Vec<String> = product
        .split_whitespace()
        .map(|word| word.chars().filter(|ch| ch.is_alphabetic()).collect())
        .filter(|word: &String| !word.is_empty())
        .collect();
    let raw: String = match words.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(3).collect(),
        [first, second, ..] => first
            .chars()
            .take(2)
            .chain(second.chars().take(2))
            .collect(),
    };
    raw.to_uppercase()
}

/// Base lot code for a product produced on `date`: `SIGLA + DDMMYY`.
pub fn build_base_lot_code(product: &str, date: NaiveDate) -> String {
    format!("{}{}", sigla(product), date.format("%d%m%y"))
}

/// Return `base` if it is absent from the ledger's lot-code column, otherwise
/// the first `base{n}` (n = 2, 3, …) not yet present.
pub fn ensure_unique(base: &str, ledger_text: &str) -> String {
    let existing = ledger::lot_codes(ledger_text);
    if !existing.contains(base) {
        return base.to_string();
    }
    let mut suffix = 2u32;
    loop {
        let candidate = format!("{base}{suffix}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
