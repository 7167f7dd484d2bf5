//! Local JSON catalogs: daily records, incoming lots, semi-product templates.
//!
//! Explicit state holders loaded and persisted by the command layer. The
//! remote store stays the durable system of record for the ledger and
//! rendered registers; these catalogs are the per-device working set.

use crate::schema::{DailyRecord, IncomingLot, SemiProductTemplate};
use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const RECORDS_FILE: &str = "records.json";
pub const LOTS_FILE: &str = "incoming_lots.json";
pub const TEMPLATES_FILE: &str = "templates.json";

pub fn now_stamp() -> String {
    Utc::now().to_rfc3339()
}

fn load_vec<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn save_vec<T: Serialize>(path: &Path, values: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(values).context("serialize catalog")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Daily compliance records, unique per date.
#[derive(Default)]
pub struct RecordBook {
    records: Vec<DailyRecord>,
}

impl RecordBook {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            records: load_vec(path)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_vec(path, &self.records)
    }

    pub fn all(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        self.records.iter().find(|record| record.date == date)
    }

    /// Insert or replace the record for its date. A replacement keeps the
    /// original creation stamp and bumps `updated_at`.
    pub fn upsert(&mut self, mut record: DailyRecord) {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.date == record.date)
        {
            Some(existing) => {
                record.created_at = existing.created_at.clone();
                record.updated_at = now_stamp();
                *existing = record;
            }
            None => self.records.push(record),
        }
        self.records.sort_by_key(|record| record.date);
    }

    pub fn remove_date(&mut self, date: NaiveDate) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.date != date);
        self.records.len() != before
    }

    pub fn remove_month(&mut self, year: i32, month: u32) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| !(record.date.year() == year && record.date.month() == month));
        before - self.records.len()
    }

    /// Records for one month, date ascending.
    pub fn by_month(&self, year: i32, month: u32) -> Vec<DailyRecord> {
        let mut selected: Vec<DailyRecord> = self
            .records
            .iter()
            .filter(|record| record.date.year() == year && record.date.month() == month)
            .cloned()
            .collect();
        selected.sort_by_key(|record| record.date);
        selected
    }

    /// Every (year, month) with at least one record, ascending.
    pub fn month_keys(&self) -> Vec<(i32, u32)> {
        let keys: BTreeSet<(i32, u32)> = self
            .records
            .iter()
            .map(|record| (record.date.year(), record.date.month()))
            .collect();
        keys.into_iter().collect()
    }
}

/// Incoming goods receipts; display order is purchase date ascending.
#[derive(Default)]
pub struct LotBook {
    lots: Vec<IncomingLot>,
}

impl LotBook {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            lots: load_vec(path)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_vec(path, &self.lots)
    }

    pub fn add(&mut self, lot: IncomingLot) {
        self.lots.push(lot);
    }

    pub fn all(&self) -> &[IncomingLot] {
        &self.lots
    }

    pub fn sorted(&self) -> Vec<IncomingLot> {
        let mut sorted = self.lots.clone();
        sorted.sort_by_key(|lot| lot.purchased);
        sorted
    }
}

/// Semi-product recipe templates, unique by product name. Deletions are
/// permanent and never rewrite historical ledger rows.
#[derive(Default)]
pub struct TemplateBook {
    templates: Vec<SemiProductTemplate>,
}

impl TemplateBook {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            templates: load_vec(path)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_vec(path, &self.templates)
    }

    pub fn all(&self) -> &[SemiProductTemplate] {
        &self.templates
    }

    pub fn get(&self, name: &str) -> Option<&SemiProductTemplate> {
        self.templates.iter().find(|template| template.name == name)
    }

    pub fn add(&mut self, template: SemiProductTemplate) -> Result<()> {
        if self.get(&template.name).is_some() {
            return Err(anyhow!("template {:?} already exists", template.name));
        }
        self.templates.push(template);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|template| template.name != name);
        self.templates.len() != before
    }
}
