//! Fixed-layout register documents: temperature and sanitation calendars
//! (single-day and monthly) and the paginated production register.
//!
//! Geometry is fixed: one label column plus 31 day columns regardless of the
//! month length; unused trailing columns simply stay empty. Day columns are
//! populated in ascending date order and rows in declared order, so output is
//! deterministic for a given record set.

use crate::canvas::{Canvas, Font, RectMm, CHECK_GLYPH};
use crate::pdf::PdfCanvas;
use crate::schema::{CompanyInfo, DailyRecord, ProductionRow, SANITATION_LABELS};
use crate::signature::{self, SignatureOptions};
use chrono::Datelike;
use image::RgbaImage;
use std::collections::BTreeMap;

pub const MONTH_NAMES: [&str; 12] = [
    "Gennaio",
    "Febbraio",
    "Marzo",
    "Aprile",
    "Maggio",
    "Giugno",
    "Luglio",
    "Agosto",
    "Settembre",
    "Ottobre",
    "Novembre",
    "Dicembre",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month as usize).clamp(1, 12) - 1]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Temperature,
    Sanitation,
}

impl RegisterKind {
    fn title(self) -> &'static str {
        match self {
            RegisterKind::Temperature => "REGISTRO DI CONTROLLO TEMPERATURE",
            RegisterKind::Sanitation => "REGISTRO DI CONTROLLO SANIFICAZIONE",
        }
    }

    fn cell_height(self) -> f32 {
        match self {
            RegisterKind::Temperature => 6.0,
            RegisterKind::Sanitation => 5.5,
        }
    }

    fn row_labels(self) -> &'static [&'static str] {
        match self {
            RegisterKind::Temperature => &["C1", "F1", "F2"],
            RegisterKind::Sanitation => &SANITATION_LABELS,
        }
    }
}

pub struct RenderContext<'a> {
    pub company: &'a CompanyInfo,
    /// Operator signature fetched from the store, already decoded.
    pub signature: Option<&'a RgbaImage>,
}

const MANUAL_TITLE: &str = "MANUALE DI CONTROLLO IGIENICO SANITARIO";
const DAY_COLUMNS: u32 = 31;

// Monthly grid geometry (mm).
const GRID_X: f32 = 10.0;
const GRID_Y: f32 = 60.0;
const LABEL_COL_W: f32 = 22.0;
const DAY_COL_W: f32 = 8.2;

fn signature_options() -> SignatureOptions {
    SignatureOptions {
        scale: 0.9,
        ..Default::default()
    }
}

fn text_centered<C: Canvas>(canvas: &mut C, text: &str, center_x: f32, y: f32) {
    let width = canvas.text_width(text);
    canvas.text(text, center_x - width / 2.0, y);
}

fn format_temperature(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}\u{b0}")
    } else {
        format!("{value}\u{b0}")
    }
}

fn day_column_x(day: u32) -> f32 {
    GRID_X + LABEL_COL_W + (day - 1) as f32 * DAY_COL_W
}

/// Monthly calendar grid for one register kind. Only day columns with a
/// record for that exact date are populated.
pub fn month_grid<C: Canvas>(
    canvas: &mut C,
    kind: RegisterKind,
    records: &[DailyRecord],
    ctx: &RenderContext,
    year: i32,
    month: u32,
) {
    let mut by_day: BTreeMap<u32, &DailyRecord> = BTreeMap::new();
    for record in records {
        if record.date.year() == year && record.date.month() == month {
            by_day.insert(record.date.day(), record);
        }
    }

    canvas.set_font(Font::Bold, 11.0);
    canvas.text(MANUAL_TITLE, 15.0, 15.0);
    canvas.text(kind.title(), 15.0, 22.0);

    canvas.set_font(Font::Regular, 9.0);
    canvas.text(&format!("MESE: {}", month_name(month)), 15.0, 35.0);
    canvas.text(&format!("ANNO {year}"), 70.0, 35.0);
    canvas.text(&format!("AZIENDA: {}", ctx.company.name), 15.0, 42.0);
    canvas.text(&format!("P.IVA: {}", ctx.company.piva), 15.0, 49.0);

    let cell_h = kind.cell_height();
    canvas.set_line_width(0.5);

    // Header row: label column plus the 31 fixed day columns.
    canvas.set_font(Font::Bold, 7.0);
    canvas.rect(RectMm::new(GRID_X, GRID_Y - cell_h, LABEL_COL_W, cell_h));
    canvas.text("GIORNO", GRID_X + 2.0, GRID_Y - 2.0);
    for day in 1..=DAY_COLUMNS {
        let x = day_column_x(day);
        canvas.rect(RectMm::new(x, GRID_Y - cell_h, DAY_COL_W, cell_h));
        text_centered(canvas, &day.to_string(), x + DAY_COL_W / 2.0, GRID_Y - 2.0);
    }

    let labels = kind.row_labels();
    for (row_index, label) in labels.iter().enumerate() {
        let y = GRID_Y + row_index as f32 * cell_h;
        canvas.rect(RectMm::new(GRID_X, y, LABEL_COL_W, cell_h));
        match kind {
            RegisterKind::Temperature => {
                canvas.set_font(Font::Bold, 7.0);
                canvas.text(label, GRID_X + 2.0, y + cell_h / 2.0 + 1.0);
            }
            RegisterKind::Sanitation => {
                canvas.set_font(Font::Bold, 6.0);
                canvas.text(label, GRID_X + 1.0, y + cell_h / 2.0 + 1.0);
            }
        }
        for day in 1..=DAY_COLUMNS {
            let x = day_column_x(day);
            canvas.rect(RectMm::new(x, y, DAY_COL_W, cell_h));
            let Some(record) = by_day.get(&day) else {
                continue;
            };
            match kind {
                RegisterKind::Temperature => {
                    let value = match row_index {
                        0 => record.temperatures.freezer,
                        1 => record.temperatures.fridge1,
                        _ => record.temperatures.fridge2,
                    };
                    canvas.set_font(Font::Regular, 6.0);
                    text_centered(
                        canvas,
                        &format_temperature(value),
                        x + DAY_COL_W / 2.0,
                        y + cell_h / 2.0 + 1.0,
                    );
                }
                RegisterKind::Sanitation => {
                    if record.sanitation.flags()[row_index] {
                        canvas.set_font(Font::Regular, 8.0);
                        text_centered(canvas, "X", x + DAY_COL_W / 2.0, y + cell_h / 2.0 + 1.0);
                    }
                }
            }
        }
    }

    // Signature row, slightly taller than the value rows.
    let sig_y = GRID_Y + labels.len() as f32 * cell_h;
    let sig_h = cell_h + 0.4;
    canvas.rect(RectMm::new(GRID_X, sig_y, LABEL_COL_W, sig_h));
    canvas.set_font(Font::Bold, 7.0);
    canvas.text("FIRMA OSA", GRID_X + 2.0, sig_y + sig_h / 2.0 + 1.0);
    for day in 1..=DAY_COLUMNS {
        canvas.rect(RectMm::new(day_column_x(day), sig_y, DAY_COL_W, sig_h));
    }

    for (day, record) in &by_day {
        let x = day_column_x(*day);
        let cell = RectMm::new(x, sig_y, DAY_COL_W, sig_h);
        if !place_signature(canvas, ctx, record, cell) {
            canvas.set_font(Font::Symbol, 8.0);
            text_centered(canvas, CHECK_GLYPH, x + DAY_COL_W / 2.0, sig_y + sig_h / 2.0 + 1.0);
        }
        // Border again, over the image, so the gridline stays visible.
        canvas.rect(cell);
    }

    let bottom_y = sig_y + sig_h;
    let right_x = GRID_X + LABEL_COL_W + DAY_COLUMNS as f32 * DAY_COL_W;
    canvas.line(GRID_X, bottom_y, right_x, bottom_y);
}

fn place_signature<C: Canvas>(
    canvas: &mut C,
    ctx: &RenderContext,
    record: &DailyRecord,
    cell: RectMm,
) -> bool {
    if let Some(image) = ctx.signature {
        if signature::composite_into(canvas, image, cell, &signature_options()) {
            return true;
        }
    }
    if let Some(payload) = record.signature.as_deref() {
        match signature::decode_payload(payload) {
            Ok(image) => {
                if signature::composite_into(canvas, &image, cell, &signature_options()) {
                    return true;
                }
            }
            Err(err) => {
                tracing::warn!(date = %record.date, error = %err, "record signature unusable");
            }
        }
    }
    false
}

/// Single-day sheet: same register layout without gridlines, populated only
/// at the record's own day column.
pub fn day_sheet<C: Canvas>(canvas: &mut C, kind: RegisterKind, record: &DailyRecord, ctx: &RenderContext) {
    let date = record.date;
    canvas.set_font(Font::Bold, 12.0);
    canvas.text(MANUAL_TITLE, 20.0, 15.0);
    canvas.text(kind.title(), 20.0, 22.0);

    canvas.set_font(Font::Regular, 10.0);
    canvas.text(
        &format!("MESE: {} ANNO: {}", month_name(date.month()), date.year()),
        20.0,
        30.0,
    );
    canvas.text(
        &format!("AZIENDA: {} P.IVA: {}", ctx.company.name, ctx.company.piva),
        20.0,
        37.0,
    );

    let start_x = 20.0;
    let start_y = 50.0;
    let cell_w = 8.0;
    let cell_h = 6.0;
    let day = date.day();

    canvas.set_font(Font::Regular, 8.0);
    canvas.text("GIORNO", start_x, start_y - 2.0);
    for column in 1..=DAY_COLUMNS {
        canvas.text(
            &column.to_string(),
            start_x + column as f32 * cell_w - 2.0,
            start_y - 2.0,
        );
    }

    let labels = kind.row_labels();
    for (row_index, label) in labels.iter().enumerate() {
        let y = start_y + (row_index + 1) as f32 * cell_h;
        canvas.text(label, start_x, y);
        let value = match kind {
            RegisterKind::Temperature => {
                let value = match row_index {
                    0 => record.temperatures.freezer,
                    1 => record.temperatures.fridge1,
                    _ => record.temperatures.fridge2,
                };
                Some(format_temperature(value))
            }
            RegisterKind::Sanitation => record.sanitation.flags()[row_index].then(|| "X".to_string()),
        };
        if let Some(value) = value {
            canvas.text(&value, start_x + day as f32 * cell_w - 2.0, y);
        }
    }

    let sig_y = start_y + (labels.len() + 1) as f32 * cell_h;
    canvas.text("FIRMA OSA", start_x, sig_y);
    let cell = RectMm::new(start_x + day as f32 * cell_w - 4.0, sig_y - 4.0, 10.0, 6.0);
    place_signature(canvas, ctx, record, cell);

    if let Some(notes) = record.notes.as_deref() {
        if !notes.trim().is_empty() {
            canvas.set_font(Font::Regular, 8.0);
            canvas.text("Note:", 20.0, sig_y + 15.0);
            canvas.text(notes, 20.0, sig_y + 20.0);
        }
    }
}

/// Paginated production register: one product block per ledger row followed
/// by its two-column ingredient listing.
pub fn production_register<C: Canvas>(canvas: &mut C, rows: &[ProductionRow]) {
    let (page_w, page_h) = canvas.page_size();
    let margin = 15.0;
    let available = page_w - margin * 2.0;

    canvas.set_font(Font::Bold, 14.0);
    text_centered(canvas, "REGISTRO SEMILAVORATI", page_w / 2.0, margin);

    let mut y = margin + 10.0;
    let row_h = 16.0;
    canvas.set_line_width(0.2);

    for row in rows {
        let labels = [
            "Data di preparazione",
            "Data di scadenza",
            "Nome del prodotto",
            "Lotto del prodotto",
        ];
        let values = [
            non_empty_or_dash(&row.production_date),
            non_empty_or_dash(&row.expiry_date),
            non_empty_or_dash(&row.product),
            non_empty_or_dash(&row.lot_code),
        ];
        let cell_w = available / labels.len() as f32;
        for (index, label) in labels.iter().enumerate() {
            let x = margin + index as f32 * cell_w;
            canvas.rect(RectMm::new(x, y, cell_w, row_h));
            canvas.set_font(Font::Bold, 10.0);
            text_centered(canvas, label, x + cell_w / 2.0, y + 6.0);
            canvas.set_font(Font::Regular, 9.0);
            text_centered(canvas, values[index], x + cell_w / 2.0, y + 13.0);
        }
        y += row_h + 6.0;

        if !row.ingredients.is_empty() {
            canvas.set_font(Font::Bold, 11.0);
            canvas.text("Ingredienti utilizzati", margin, y);
            y += 5.0;

            let column_w = available / 2.0;
            let headers = ["Nome dell\u{2019}ingrediente", "Lotto dell\u{2019}ingrediente"];
            for (index, header) in headers.iter().enumerate() {
                let x = margin + index as f32 * column_w;
                canvas.rect(RectMm::new(x, y, column_w, 7.0));
                canvas.set_font(Font::Bold, 9.5);
                text_centered(canvas, header, x + column_w / 2.0, y + 5.0);
            }
            y += 7.0;

            canvas.set_font(Font::Regular, 9.0);
            for pair in &row.ingredients {
                let values = [non_empty_or_dash(&pair.name), non_empty_or_dash(&pair.lot)];
                for (index, value) in values.iter().enumerate() {
                    let x = margin + index as f32 * column_w;
                    canvas.rect(RectMm::new(x, y, column_w, 10.0));
                    text_centered(canvas, value, x + column_w / 2.0, y + 6.0);
                }
                y += 10.0;

                if y > page_h - margin - 20.0 {
                    canvas.add_page();
                    y = margin + 10.0;
                }
            }
        }

        y += 12.0;
        if y > page_h - margin - 20.0 {
            canvas.add_page();
            y = margin + 10.0;
        }
    }
}

fn non_empty_or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Render a monthly register straight to PDF bytes.
pub fn month_pdf(
    kind: RegisterKind,
    records: &[DailyRecord],
    ctx: &RenderContext,
    year: i32,
    month: u32,
) -> Vec<u8> {
    let mut canvas = PdfCanvas::a4_landscape();
    month_grid(&mut canvas, kind, records, ctx, year, month);
    canvas.finish()
}

/// Render a single-day sheet straight to PDF bytes.
pub fn day_pdf(kind: RegisterKind, record: &DailyRecord, ctx: &RenderContext) -> Vec<u8> {
    let mut canvas = PdfCanvas::a4_landscape();
    day_sheet(&mut canvas, kind, record, ctx);
    canvas.finish()
}

/// Render the production register straight to PDF bytes.
pub fn production_pdf(rows: &[ProductionRow]) -> Vec<u8> {
    let mut canvas = PdfCanvas::a4_portrait();
    production_register(&mut canvas, rows);
    canvas.finish()
}
