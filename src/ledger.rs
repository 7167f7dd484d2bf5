//! CSV codec for the append-only semi-finished-product ledger.
//!
//! The ledger is one `;`-delimited UTF-8 file with CRLF line endings. Four
//! fixed columns (production date, expiry date, product, product lot) are
//! followed by the ingredient (name, lot) column pairs declared by the header
//! at first write. Rows are never edited or deleted; every append rewrites the
//! whole file from the text produced here.

use crate::error::RegistroError;
use crate::schema::{IngredientLot, ProductionRow};
use anyhow::{Context, Result};
use std::collections::BTreeSet;

pub const LEDGER_FILE_NAME: &str = "Registro_Semilavorati.csv";

/// Ingredient slot capacity written into a brand-new ledger header.
pub const DEFAULT_SLOT_CAPACITY: usize = 10;

const FIXED_COLUMNS: usize = 4;
const LOT_CODE_COLUMN: usize = 3;

/// Build the header line for a ledger with `slots` ingredient pairs.
pub fn build_header(slots: usize) -> String {
    let mut columns = vec![
        "Data Produzione".to_string(),
        "Data Scadenza".to_string(),
        "Prodotto".to_string(),
        "Lotto Prodotto".to_string(),
    ];
    for slot in 1..=slots {
        columns.push(format!("Ingrediente {slot}"));
        columns.push(format!("Lotto Ingrediente {slot}"));
    }
    write_line(&columns)
}

/// Derive the slot capacity from an existing header line.
///
/// A dangling ingredient column (odd remainder) is a schema defect in the
/// file; it is logged and floored rather than silently accepted.
pub fn read_capacity(header_line: &str) -> usize {
    let columns = split_line(header_line);
    if columns.len() <= FIXED_COLUMNS {
        return 0;
    }
    let extra = columns.len() - FIXED_COLUMNS;
    if extra % 2 != 0 {
        tracing::warn!(
            columns = columns.len(),
            "ledger header has a dangling ingredient column; flooring slot count"
        );
    }
    extra / 2
}

/// Serialize one row, padding unused slots with empty pairs.
pub fn build_row(row: &ProductionRow, slots: usize) -> Result<String, RegistroError> {
    if row.ingredients.len() > slots {
        return Err(RegistroError::Schema(format!(
            "row carries {} ingredient pairs but the ledger holds {slots}",
            row.ingredients.len()
        )));
    }
    let mut fields = vec![
        row.production_date.clone(),
        row.expiry_date.clone(),
        row.product.clone(),
        row.lot_code.clone(),
    ];
    for slot in 0..slots {
        match row.ingredients.get(slot) {
            Some(pair) => {
                fields.push(pair.name.clone());
                fields.push(pair.lot.clone());
            }
            None => {
                fields.push(String::new());
                fields.push(String::new());
            }
        }
    }
    Ok(write_line(&fields))
}

/// Append one row to the current ledger text, normalizing the trailing
/// newline. The caller overwrites the whole remote file with the result.
pub fn append_row(
    existing: &str,
    row: &ProductionRow,
    slots: usize,
) -> Result<String, RegistroError> {
    let line = build_row(row, slots)?;
    let trimmed = existing.trim_end();
    if trimmed.is_empty() {
        return Ok(line);
    }
    Ok(format!("{trimmed}\r\n{line}"))
}

/// Parse the full ledger text into (slot capacity, rows). Empty trailing
/// slot pairs are dropped from each row.
pub fn parse(text: &str) -> Result<(usize, Vec<ProductionRow>)> {
    let mut reader = reader_for(text);
    let headers = reader.headers().context("read ledger header")?.clone();
    let slots = if headers.len() <= FIXED_COLUMNS {
        0
    } else {
        (headers.len() - FIXED_COLUMNS) / 2
    };
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("read ledger row")?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(row_from_record(&record));
    }
    Ok((slots, rows))
}

/// All product lot codes already present in the ledger text.
pub fn lot_codes(text: &str) -> BTreeSet<String> {
    let mut reader = reader_for(text);
    let mut codes = BTreeSet::new();
    for record in reader.records().flatten() {
        if let Some(code) = record.get(LOT_CODE_COLUMN) {
            if !code.is_empty() {
                codes.insert(code.to_string());
            }
        }
    }
    codes
}

fn reader_for(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn row_from_record(record: &csv::StringRecord) -> ProductionRow {
    let field = |index: usize| record.get(index).unwrap_or("").to_string();
    let mut ingredients = Vec::new();
    let mut index = FIXED_COLUMNS;
    while index < record.len() {
        let name = field(index);
        let lot = field(index + 1);
        if !name.trim().is_empty() || !lot.trim().is_empty() {
            ingredients.push(IngredientLot { name, lot });
        }
        index += 2;
    }
    ProductionRow {
        production_date: field(0),
        expiry_date: field(1),
        product: field(2),
        lot_code: field(3),
        ingredients,
    }
}

fn write_line(fields: &[String]) -> String {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer
        .write_record(fields)
        .expect("write csv record to memory");
    let bytes = writer.into_inner().expect("flush in-memory csv writer");
    String::from_utf8(bytes).expect("csv output is UTF-8")
}

fn split_line(line: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
