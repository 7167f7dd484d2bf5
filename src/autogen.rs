//! Auto-generation of daily records over a date range.
//!
//! Temperatures fall inside the compliance bands (freezer -22..-18 °C,
//! fridges 0..4 °C, one decimal) and sanitation items come up done with
//! probability 0.9, matching what an operator would have recorded by hand.

use crate::catalog::{now_stamp, RecordBook};
use crate::schema::{DailyRecord, Sanitation, Temperatures};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rand::Rng;

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn random_freezer(rng: &mut impl Rng) -> f64 {
    round_tenth(rng.gen_range(-22.0..=-18.0))
}

pub fn random_fridge(rng: &mut impl Rng) -> f64 {
    round_tenth(rng.gen_range(0.0..=4.0))
}

pub fn random_sanitation(rng: &mut impl Rng) -> Sanitation {
    let mut done = || rng.gen_bool(0.9);
    Sanitation {
        equipment: done(),
        surfaces: done(),
        utensils: done(),
        floors: done(),
        refrigerators: done(),
        walls: done(),
        lighting: done(),
        doors: done(),
        shelves: done(),
        toilets: done(),
        waste_containers: done(),
        ovens: done(),
    }
}

/// Inclusive range of dates, ascending.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if end < start {
        return Err(anyhow!("end date {end} precedes start date {start}"));
    }
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current = current
            .succ_opt()
            .ok_or_else(|| anyhow!("date range overflows the calendar"))?;
    }
    Ok(dates)
}

/// Generate one record per date in the range, replacing existing dates via
/// the book's upsert. Returns the number of records written.
pub fn generate(
    book: &mut RecordBook,
    start: NaiveDate,
    end: NaiveDate,
    rng: &mut impl Rng,
) -> Result<usize> {
    let dates = date_range(start, end)?;
    let count = dates.len();
    for date in dates {
        let stamp = now_stamp();
        book.upsert(DailyRecord {
            date,
            temperatures: Temperatures {
                freezer: random_freezer(rng),
                fridge1: random_fridge(rng),
                fridge2: random_fridge(rng),
            },
            sanitation: random_sanitation(rng),
            notes: None,
            signature: None,
            created_at: stamp.clone(),
            updated_at: stamp,
        });
    }
    Ok(count)
}
