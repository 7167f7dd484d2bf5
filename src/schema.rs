//! Data model for daily records, incoming lots, templates, and production rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Temperature readings for the three monitored units, in degrees Celsius.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Temperatures {
    pub freezer: f64,
    pub fridge1: f64,
    pub fridge2: f64,
}

/// Daily sanitation checklist. One flag per register row, in declared order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sanitation {
    pub equipment: bool,
    pub surfaces: bool,
    pub utensils: bool,
    pub floors: bool,
    pub refrigerators: bool,
    pub walls: bool,
    pub lighting: bool,
    pub doors: bool,
    pub shelves: bool,
    pub toilets: bool,
    pub waste_containers: bool,
    pub ovens: bool,
}

/// Register labels for the sanitation rows, in the fixed row order.
pub const SANITATION_LABELS: [&str; 12] = [
    "ATTREZZATURE",
    "SUPERFICI",
    "UTENSILI",
    "PAVIMENTI",
    "FRIGORIFERI",
    "PARETI",
    "ILLUMINAZIONE",
    "PORTE",
    "SCAFFALI",
    "SERVIZI IGIENICI",
    "CONTENITORI RIFIUTI",
    "FORNI",
];

impl Sanitation {
    pub fn all_done() -> Self {
        Self {
            equipment: true,
            surfaces: true,
            utensils: true,
            floors: true,
            refrigerators: true,
            walls: true,
            lighting: true,
            doors: true,
            shelves: true,
            toilets: true,
            waste_containers: true,
            ovens: true,
        }
    }

    /// Flags in the same order as [`SANITATION_LABELS`].
    pub fn flags(&self) -> [bool; 12] {
        [
            self.equipment,
            self.surfaces,
            self.utensils,
            self.floors,
            self.refrigerators,
            self.walls,
            self.lighting,
            self.doors,
            self.shelves,
            self.toilets,
            self.waste_containers,
            self.ovens,
        ]
    }
}

/// One compliance record per calendar date. At most one record exists per
/// date; updates replace in place and bump `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub temperatures: Temperatures,
    pub sanitation: Sanitation,
    #[serde(default)]
    pub notes: Option<String>,
    /// Optional operator signature payload, base64-encoded PNG/JPEG bytes.
    #[serde(default)]
    pub signature: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One goods-receipt event. Rows are independent receipts; (name, lot) pairs
/// may repeat across time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingLot {
    pub name: String,
    pub lot: String,
    pub purchased: NaiveDate,
    #[serde(default)]
    pub supplier: Option<String>,
}

/// A reusable recipe definition keyed by product name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemiProductTemplate {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub ingredients: Vec<String>,
}

/// An (ingredient name, ingredient lot) pair inside a production row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLot {
    pub name: String,
    pub lot: String,
}

/// The ledger's unit of record. Dates are stored in the register display
/// form `DD/MM/YYYY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionRow {
    pub production_date: String,
    pub expiry_date: String,
    pub product: String,
    pub lot_code: String,
    pub ingredients: Vec<IngredientLot>,
}

/// Company identity printed on every register document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub piva: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Register display form for calendar dates.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_date_uses_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 21).expect("valid date");
        assert_eq!(display_date(date), "21/10/2025");
    }

    #[test]
    fn sanitation_flags_match_label_order() {
        let mut sanitation = Sanitation::all_done();
        sanitation.ovens = false;
        let flags = sanitation.flags();
        assert_eq!(flags.len(), SANITATION_LABELS.len());
        assert!(flags[..11].iter().all(|flag| *flag));
        assert!(!flags[11]);
    }
}
