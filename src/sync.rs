//! Folder layout and upload composition for the remote register store.
//!
//! Composes the object-store operations into the site structure (one root
//! register folder, per-month subfolders named by locale month label), the
//! ledger read-modify-write append cycle, and the register upload paths. The
//! ledger is a single mutable remote resource with whole-file overwrite
//! semantics and an at-most-one-writer assumption.

use crate::error::RegistroError;
use crate::ledger;
use crate::lotcode;
use crate::render::{self, RegisterKind, RenderContext};
use crate::schema::{display_date, CompanyInfo, DailyRecord, IncomingLot, IngredientLot, ProductionRow};
use crate::signature;
use crate::store::{upload_or_update, ObjectStore, StoreResult};
use crate::validate;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use image::RgbaImage;
use std::collections::BTreeMap;

/// Root folder holding every register file on the remote store.
pub const ROOT_FOLDER: &str = "HACCP_Registri";

/// File name of the incoming-goods registry export.
pub const INCOMING_FILE_NAME: &str = "Registro_Alimenti_Ingresso.csv";

/// File name of the production-register PDF rendered from the ledger.
pub const PRODUCTION_PDF_NAME: &str = "Registro_Semilavorati_aggiornato.pdf";

pub struct FolderStructure {
    pub root_id: String,
    pub month_folders: BTreeMap<String, String>,
}

/// Locate (or create) the root register folder and index its month folders.
pub fn folder_structure(store: &dyn ObjectStore) -> StoreResult<FolderStructure> {
    let root_id = match store.find_by_name(ROOT_FOLDER, None)? {
        Some(entry) => entry.id,
        None => store.create_folder(ROOT_FOLDER, None)?,
    };
    let mut month_folders = BTreeMap::new();
    for entry in store.list(Some(&root_id))? {
        if entry.is_folder {
            month_folders.insert(entry.name.clone(), entry.id);
        }
    }
    Ok(FolderStructure {
        root_id,
        month_folders,
    })
}

/// Locale month label, e.g. `ottobre 2025`.
pub fn month_label(year: i32, month: u32) -> String {
    format!("{} {year}", render::month_name(month).to_lowercase())
}

/// Register file names for one month; the label is whitespace-collapsed.
pub fn month_file_names(year: i32, month: u32) -> (String, String) {
    let safe: String = month_label(year, month)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    (
        format!("HACCP_Temperature_{safe}.pdf"),
        format!("HACCP_Sanificazione_{safe}.pdf"),
    )
}

/// Find or create the per-month folder under the register root.
pub fn month_folder(store: &dyn ObjectStore, root_id: &str, year: i32, month: u32) -> StoreResult<String> {
    let label = month_label(year, month);
    match store.find_by_name(&label, Some(root_id))? {
        Some(entry) if entry.is_folder => Ok(entry.id),
        _ => store.create_folder(&label, Some(root_id)),
    }
}

/// Find the ledger file, writing a fresh default-capacity header when the
/// file does not exist yet. Returns the file id and its slot capacity.
pub fn ensure_ledger(store: &dyn ObjectStore, root_id: &str) -> StoreResult<(String, usize)> {
    match store.find_by_name(ledger::LEDGER_FILE_NAME, Some(root_id))? {
        Some(existing) => {
            let bytes = store.download(&existing.id)?;
            let text = String::from_utf8_lossy(&bytes);
            let first_line = text.lines().next().unwrap_or("");
            let slots = ledger::read_capacity(first_line);
            if slots == 0 {
                tracing::warn!(
                    "ledger header is empty or malformed; assuming default capacity"
                );
                return Ok((existing.id, ledger::DEFAULT_SLOT_CAPACITY));
            }
            Ok((existing.id, slots))
        }
        None => {
            let header = ledger::build_header(ledger::DEFAULT_SLOT_CAPACITY);
            let id = store.upload(
                ledger::LEDGER_FILE_NAME,
                header.as_bytes(),
                Some(root_id),
            )?;
            Ok((id, ledger::DEFAULT_SLOT_CAPACITY))
        }
    }
}

#[derive(Debug)]
pub struct AppendOutcome {
    pub lot_code: String,
    pub slots: usize,
}

/// Validate, stamp, and append one production row, then overwrite the remote
/// ledger. Nothing is written when validation fails.
pub fn append_production(
    store: &dyn ObjectStore,
    product: &str,
    production_date: NaiveDate,
    expiry_date: NaiveDate,
    ingredients: &[IngredientLot],
    lots: &[IncomingLot],
) -> Result<AppendOutcome> {
    validate::require_complete(product, ingredients)?;
    validate::validate_traceability(ingredients, lots)?;

    let structure = folder_structure(store)?;
    let (ledger_id, slots) = ensure_ledger(store, &structure.root_id)?;
    if ingredients.len() > slots {
        return Err(RegistroError::Schema(format!(
            "{} ingredients exceed the ledger capacity of {slots}",
            ingredients.len()
        ))
        .into());
    }
    let existing = String::from_utf8(store.download(&ledger_id)?).context("ledger is not UTF-8")?;

    let base = lotcode::build_base_lot_code(product, production_date);
    let lot_code = lotcode::ensure_unique(&base, &existing);
    let row = ProductionRow {
        production_date: display_date(production_date),
        expiry_date: display_date(expiry_date),
        product: product.to_string(),
        lot_code: lot_code.clone(),
        ingredients: ingredients.to_vec(),
    };
    let updated = ledger::append_row(&existing, &row, slots)?;
    upload_or_update(
        store,
        ledger::LEDGER_FILE_NAME,
        updated.as_bytes(),
        Some(&structure.root_id),
    )?;
    tracing::info!(product, lot_code = %lot_code, "production row appended");
    Ok(AppendOutcome { lot_code, slots })
}

/// Download and parse the remote ledger, if it exists.
pub fn load_ledger(store: &dyn ObjectStore) -> Result<Option<(usize, Vec<ProductionRow>)>> {
    let structure = folder_structure(store)?;
    let Some(entry) = store.find_by_name(ledger::LEDGER_FILE_NAME, Some(&structure.root_id))?
    else {
        return Ok(None);
    };
    let bytes = store.download(&entry.id)?;
    let text = String::from_utf8(bytes).context("ledger is not UTF-8")?;
    Ok(Some(ledger::parse(&text)?))
}

/// Fetch and decode the operator signature; lookup or decode failures are
/// absorbed so rendering can fall back to the text marker.
pub fn load_signature(store: &dyn ObjectStore, root_id: &str) -> Option<RgbaImage> {
    match signature::fetch(store, root_id) {
        Ok(Some(bytes)) => match signature::decode(&bytes) {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(error = %err, "stored signature could not be decoded");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(error = %err, "signature lookup failed");
            None
        }
    }
}

/// Render and upload both monthly registers for one month. Returns the two
/// uploaded file names.
pub fn push_month(
    store: &dyn ObjectStore,
    records: &[DailyRecord],
    company: &CompanyInfo,
    year: i32,
    month: u32,
) -> Result<(String, String)> {
    let structure = folder_structure(store)?;
    let operator_signature = load_signature(store, &structure.root_id);
    let ctx = RenderContext {
        company,
        signature: operator_signature.as_ref(),
    };
    let (temperature_name, sanitation_name) = month_file_names(year, month);
    let temperature = render::month_pdf(RegisterKind::Temperature, records, &ctx, year, month);
    let sanitation = render::month_pdf(RegisterKind::Sanitation, records, &ctx, year, month);
    upload_or_update(store, &temperature_name, &temperature, Some(&structure.root_id))?;
    tracing::info!(file = %temperature_name, "temperature register uploaded");
    upload_or_update(store, &sanitation_name, &sanitation, Some(&structure.root_id))?;
    tracing::info!(file = %sanitation_name, "sanitation register uploaded");
    Ok((temperature_name, sanitation_name))
}

/// Sequential bulk upload. The first hard failure propagates; registers
/// already uploaded stay in place and a re-run continues from the remainder.
pub fn push_months(
    store: &dyn ObjectStore,
    records: &[DailyRecord],
    company: &CompanyInfo,
    months: &[(i32, u32)],
) -> Result<Vec<(String, String)>> {
    let mut uploaded = Vec::new();
    for (year, month) in months {
        let month_records: Vec<DailyRecord> = records
            .iter()
            .filter(|record| record.date.year() == *year && record.date.month() == *month)
            .cloned()
            .collect();
        let names = push_month(store, &month_records, company, *year, *month)?;
        tracing::info!(year, month, "month registers pushed");
        uploaded.push(names);
    }
    Ok(uploaded)
}

/// Serialize the incoming-goods registry, purchase date ascending.
pub fn incoming_csv(lots: &[IncomingLot]) -> String {
    let mut sorted: Vec<&IncomingLot> = lots.iter().collect();
    sorted.sort_by_key(|lot| lot.purchased);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(["Nome alimento", "Lotto", "Data di acquisto", "Fornitore"])
        .expect("write csv header to memory");
    for lot in sorted {
        let purchased = display_date(lot.purchased);
        writer
            .write_record([
                lot.name.as_str(),
                lot.lot.as_str(),
                purchased.as_str(),
                lot.supplier.as_deref().unwrap_or(""),
            ])
            .expect("write csv record to memory");
    }
    let bytes = writer.into_inner().expect("flush in-memory csv writer");
    String::from_utf8(bytes).expect("csv output is UTF-8")
}

/// Upload the incoming-goods registry to the register root.
pub fn push_incoming(store: &dyn ObjectStore, lots: &[IncomingLot]) -> Result<String> {
    let structure = folder_structure(store)?;
    let text = incoming_csv(lots);
    upload_or_update(
        store,
        INCOMING_FILE_NAME,
        text.as_bytes(),
        Some(&structure.root_id),
    )?;
    Ok(INCOMING_FILE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DirStore;
    use tempfile::tempdir;

    fn lot(name: &str, code: &str, purchased: &str) -> IncomingLot {
        IncomingLot {
            name: name.to_string(),
            lot: code.to_string(),
            purchased: purchased.parse().expect("valid date"),
            supplier: None,
        }
    }

    fn entry(name: &str, code: &str) -> IngredientLot {
        IngredientLot {
            name: name.to_string(),
            lot: code.to_string(),
        }
    }

    fn date(value: &str) -> NaiveDate {
        value.parse().expect("valid date")
    }

    #[test]
    fn month_file_names_collapse_whitespace() {
        let (temperature, sanitation) = month_file_names(2025, 10);
        assert_eq!(temperature, "HACCP_Temperature_ottobre_2025.pdf");
        assert_eq!(sanitation, "HACCP_Sanificazione_ottobre_2025.pdf");
    }

    #[test]
    fn ensure_ledger_writes_a_default_header_on_first_use() {
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let structure = folder_structure(&store).expect("structure");
        let (id, slots) = ensure_ledger(&store, &structure.root_id).expect("ensure");
        assert_eq!(slots, ledger::DEFAULT_SLOT_CAPACITY);
        let text = String::from_utf8(store.download(&id).expect("download")).expect("utf-8");
        assert_eq!(ledger::read_capacity(text.trim_end()), 10);

        // A second call sees the existing file and re-reads its capacity.
        let (_, slots_again) = ensure_ledger(&store, &structure.root_id).expect("ensure again");
        assert_eq!(slots_again, 10);
    }

    #[test]
    fn append_production_round_trips_through_the_store() {
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let lots = vec![lot("Pomodoro", "LTN-20251021-01", "2025-10-20")];
        let outcome = append_production(
            &store,
            "Salsa piccante",
            date("2025-10-21"),
            date("2025-11-21"),
            &[entry("Pomodoro", "LTN-20251021-01")],
            &lots,
        )
        .expect("append");
        assert_eq!(outcome.lot_code, "SAPI211025");

        let (slots, rows) = load_ledger(&store).expect("load").expect("ledger exists");
        assert_eq!(slots, 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product, "Salsa piccante");
        assert_eq!(rows[0].lot_code, "SAPI211025");
        assert_eq!(rows[0].ingredients, vec![entry("Pomodoro", "LTN-20251021-01")]);
    }

    #[test]
    fn collision_on_the_same_day_takes_a_suffix() {
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let lots = vec![lot("Pomodoro", "LTN-01", "2025-10-20")];
        let entries = [entry("Pomodoro", "LTN-01")];
        let first = append_production(
            &store,
            "Salsa piccante",
            date("2025-10-21"),
            date("2025-11-21"),
            &entries,
            &lots,
        )
        .expect("first append");
        let second = append_production(
            &store,
            "Salsa piccante",
            date("2025-10-21"),
            date("2025-11-21"),
            &entries,
            &lots,
        )
        .expect("second append");
        assert_eq!(first.lot_code, "SAPI211025");
        assert_eq!(second.lot_code, "SAPI2110252");
    }

    #[test]
    fn failed_validation_leaves_the_ledger_untouched() {
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let lots = vec![lot("Pomodoro", "LTN-20251021-01", "2025-10-20")];
        append_production(
            &store,
            "Salsa piccante",
            date("2025-10-21"),
            date("2025-11-21"),
            &[entry("Pomodoro", "LTN-20251021-01")],
            &lots,
        )
        .expect("append");
        let structure = folder_structure(&store).expect("structure");
        let (id, _) = ensure_ledger(&store, &structure.root_id).expect("ensure");
        let before = store.download(&id).expect("download");

        let err = append_production(
            &store,
            "Salsa piccante",
            date("2025-10-22"),
            date("2025-11-22"),
            &[entry("Pomodoro", "LTN-WRONG")],
            &lots,
        )
        .expect_err("validation must fail");
        assert!(err.to_string().contains("LTN-WRONG"));

        let after = store.download(&id).expect("download");
        assert_eq!(before.len(), after.len());
        assert_eq!(before, after);
    }

    #[test]
    fn stale_read_modify_write_loses_the_earlier_row() {
        // Known limitation: the remote ledger is one whole file with no
        // version token, so two writers appending from the same snapshot are
        // last-writer-wins.
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let structure = folder_structure(&store).expect("structure");
        let (id, slots) = ensure_ledger(&store, &structure.root_id).expect("ensure");
        let snapshot = String::from_utf8(store.download(&id).expect("download")).expect("utf-8");

        let row = |code: &str| ProductionRow {
            production_date: "21/10/2025".to_string(),
            expiry_date: "21/11/2025".to_string(),
            product: "Salsa base".to_string(),
            lot_code: code.to_string(),
            ingredients: vec![entry("Pomodoro", "LTN-01")],
        };
        let first = ledger::append_row(&snapshot, &row("SABA211025"), slots).expect("row");
        store.update(&id, first.as_bytes()).expect("first write");
        let second = ledger::append_row(&snapshot, &row("SABA2110252"), slots).expect("row");
        store.update(&id, second.as_bytes()).expect("second write");

        let (_, rows) = load_ledger(&store).expect("load").expect("ledger exists");
        let codes: Vec<&str> = rows.iter().map(|row| row.lot_code.as_str()).collect();
        assert_eq!(codes, vec!["SABA2110252"]);
    }

    #[test]
    fn push_month_uploads_both_registers() {
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let company = CompanyInfo {
            name: "Trattoria Da Mario".to_string(),
            piva: "01234567890".to_string(),
            address: None,
        };
        let (temperature, sanitation) =
            push_month(&store, &[], &company, 2025, 10).expect("push");
        let structure = folder_structure(&store).expect("structure");
        for name in [&temperature, &sanitation] {
            let entry = store
                .find_by_name(name, Some(&structure.root_id))
                .expect("find")
                .expect("uploaded");
            let bytes = store.download(&entry.id).expect("download");
            assert!(bytes.starts_with(b"%PDF-"));
        }
    }

    #[test]
    fn incoming_csv_sorts_by_purchase_date_and_quotes() {
        let lots = vec![
            lot("Olio extra; vergine", "O-2", "2025-10-22"),
            lot("Pomodoro", "LTN-01", "2025-10-20"),
        ];
        let text = incoming_csv(&lots);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Nome alimento;Lotto;Data di acquisto;Fornitore");
        assert!(lines[1].starts_with("Pomodoro"));
        assert!(lines[2].starts_with("\"Olio extra; vergine\""));
    }

    #[test]
    fn month_folders_are_created_under_the_root() {
        let dir = tempdir().expect("tempdir");
        let store = DirStore::new(dir.path());
        let structure = folder_structure(&store).expect("structure");
        let id = month_folder(&store, &structure.root_id, 2025, 10).expect("folder");
        let again = month_folder(&store, &structure.root_id, 2025, 10).expect("folder again");
        assert_eq!(id, again);
        let refreshed = folder_structure(&store).expect("structure");
        assert!(refreshed.month_folders.contains_key("ottobre 2025"));
    }
}
