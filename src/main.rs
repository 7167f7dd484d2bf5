use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Datelike;
use clap::Parser;
use std::path::Path;

mod archive;
mod autogen;
mod canvas;
mod catalog;
mod cli;
mod drive;
mod error;
mod ledger;
mod lotcode;
mod pdf;
mod render;
mod schema;
mod settings;
mod signature;
mod store;
mod sync;
mod validate;

use catalog::{now_stamp, LotBook, RecordBook, TemplateBook, LOTS_FILE, RECORDS_FILE, TEMPLATES_FILE};
use cli::{
    ArchiveArgs, AutogenArgs, Command, InitArgs, LedgerCommand, LedgerPdfArgs, LotCommand,
    ProduceArgs, RecordAddArgs, RecordCommand, RecordDeleteArgs, RecordListArgs, RenderArgs,
    RenderKindArg, RootArgs, SignatureCommand, SignatureSetArgs, SyncCommand, SyncMonthArgs,
    TemplateCommand,
};
use render::{RegisterKind, RenderContext};
use schema::{CompanyInfo, DailyRecord, IngredientLot, Sanitation, Temperatures};
use store::ObjectStore;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    let root = settings::config_root()?;
    let store_dir = args.store_dir.clone();

    match args.command {
        Command::Init(args) => cmd_init(&root, args),
        Command::Record(command) => cmd_record(&root, command),
        Command::Lot(command) => cmd_lot(&root, command, store_dir.as_deref()),
        Command::Template(command) => cmd_template(&root, command),
        Command::Produce(args) => cmd_produce(&root, args, store_dir.as_deref()),
        Command::Ledger(command) => cmd_ledger(&root, command, store_dir.as_deref()),
        Command::Render(args) => cmd_render(&root, args, store_dir.as_deref()),
        Command::Archive(args) => cmd_archive(&root, args, store_dir.as_deref()),
        Command::Sync(command) => cmd_sync(&root, command, store_dir.as_deref()),
        Command::Autogen(args) => cmd_autogen(&root, args),
        Command::Signature(command) => cmd_signature(&root, command, store_dir.as_deref()),
    }
}

fn open_store(root: &Path, override_dir: Option<&Path>) -> Result<Box<dyn ObjectStore>> {
    let loaded = settings::load(root)?;
    settings::open_store(&loaded, root, override_dir)
}

fn company(root: &Path) -> Result<CompanyInfo> {
    Ok(settings::load(root)?.company)
}

fn cmd_init(root: &Path, args: InitArgs) -> Result<()> {
    let mut current = settings::load(root)?;
    current.company = CompanyInfo {
        name: args.company,
        piva: args.piva,
        address: args.address,
    };
    if let Some(token) = args.drive_token {
        current.store.kind = settings::StoreKind::Drive;
        current.store.token = Some(token);
    }
    settings::save(root, &current)?;
    println!("Settings written to {}", settings::settings_path(root).display());
    Ok(())
}

fn cmd_record(root: &Path, command: RecordCommand) -> Result<()> {
    match command {
        RecordCommand::Add(args) => cmd_record_add(root, args),
        RecordCommand::List(args) => cmd_record_list(root, args),
        RecordCommand::Delete(args) => cmd_record_delete(root, args),
    }
}

fn cmd_record_add(root: &Path, args: RecordAddArgs) -> Result<()> {
    let mut sanitation = Sanitation::all_done();
    apply_skips(&mut sanitation, &args.skip)?;
    let signature = match &args.signature {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
            signature::decode(&bytes).context("signature image is not a usable PNG/JPEG")?;
            Some(BASE64_STANDARD.encode(bytes))
        }
        None => None,
    };

    let path = root.join(RECORDS_FILE);
    let mut book = RecordBook::load(&path)?;
    let stamp = now_stamp();
    book.upsert(DailyRecord {
        date: args.date,
        temperatures: Temperatures {
            freezer: args.freezer,
            fridge1: args.fridge1,
            fridge2: args.fridge2,
        },
        sanitation,
        notes: args.notes,
        signature,
        created_at: stamp.clone(),
        updated_at: stamp,
    });
    book.save(&path)?;
    println!("Record saved for {}", args.date);
    Ok(())
}

fn cmd_record_list(root: &Path, args: RecordListArgs) -> Result<()> {
    let book = RecordBook::load(&root.join(RECORDS_FILE))?;
    let records: Vec<DailyRecord> = match &args.month {
        Some(month) => {
            let (year, month) = parse_month(month)?;
            book.by_month(year, month)
        }
        None => book.all().to_vec(),
    };
    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }
    for record in records {
        let done = record
            .sanitation
            .flags()
            .iter()
            .filter(|flag| **flag)
            .count();
        println!(
            "{}  C1 {:>6.1}  F1 {:>5.1}  F2 {:>5.1}  sanitation {done}/12{}",
            record.date,
            record.temperatures.freezer,
            record.temperatures.fridge1,
            record.temperatures.fridge2,
            record
                .notes
                .as_deref()
                .map(|notes| format!("  note: {notes}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn cmd_record_delete(root: &Path, args: RecordDeleteArgs) -> Result<()> {
    let path = root.join(RECORDS_FILE);
    let mut book = RecordBook::load(&path)?;
    match (args.date, args.month) {
        (Some(date), None) => {
            if book.remove_date(date) {
                println!("Deleted record for {date}");
            } else {
                println!("No record for {date}");
            }
        }
        (None, Some(month)) => {
            let (year, month) = parse_month(&month)?;
            let removed = book.remove_month(year, month);
            println!("Deleted {removed} records");
        }
        _ => return Err(anyhow!("pass exactly one of --date or --month")),
    }
    book.save(&path)
}

fn cmd_lot(root: &Path, command: LotCommand, store_dir: Option<&Path>) -> Result<()> {
    let path = root.join(LOTS_FILE);
    match command {
        LotCommand::Add(args) => {
            let mut book = LotBook::load(&path)?;
            book.add(schema::IncomingLot {
                name: args.name.trim().to_string(),
                lot: args.code.trim().to_string(),
                purchased: args.purchased,
                supplier: args.supplier.map(|supplier| supplier.trim().to_string()),
            });
            book.save(&path)?;
            println!("Incoming lot registered");
            Ok(())
        }
        LotCommand::List => {
            let book = LotBook::load(&path)?;
            if book.all().is_empty() {
                println!("No incoming lots.");
                return Ok(());
            }
            for lot in book.sorted() {
                println!(
                    "{}  {}  lot {}{}",
                    lot.purchased,
                    lot.name,
                    lot.lot,
                    lot.supplier
                        .as_deref()
                        .map(|supplier| format!("  ({supplier})"))
                        .unwrap_or_default()
                );
            }
            Ok(())
        }
        LotCommand::Push => {
            let book = LotBook::load(&path)?;
            let store = open_store(root, store_dir)?;
            let name = sync::push_incoming(store.as_ref(), book.all())?;
            println!("Uploaded {name}");
            Ok(())
        }
    }
}

fn cmd_template(root: &Path, command: TemplateCommand) -> Result<()> {
    let path = root.join(TEMPLATES_FILE);
    let mut book = TemplateBook::load(&path)?;
    match command {
        TemplateCommand::Add(args) => {
            let ingredients: Vec<String> = args
                .ingredients
                .iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect();
            if ingredients.is_empty() {
                return Err(anyhow!("a template needs at least one ingredient"));
            }
            book.add(schema::SemiProductTemplate {
                name: args.name.trim().to_string(),
                category: args.category,
                notes: args.notes,
                ingredients,
            })?;
            book.save(&path)?;
            println!("Template saved");
        }
        TemplateCommand::Remove(args) => {
            if !book.remove(&args.name) {
                return Err(anyhow!("no template named {:?}", args.name));
            }
            book.save(&path)?;
            println!("Template removed");
        }
        TemplateCommand::List => {
            if book.all().is_empty() {
                println!("No templates.");
                return Ok(());
            }
            for template in book.all() {
                println!(
                    "{}{}: {}",
                    template.name,
                    template
                        .category
                        .as_deref()
                        .map(|category| format!(" [{category}]"))
                        .unwrap_or_default(),
                    template.ingredients.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn cmd_produce(root: &Path, args: ProduceArgs, store_dir: Option<&Path>) -> Result<()> {
    let entries = parse_ingredient_entries(&args.ingredients)?;
    let lots = LotBook::load(&root.join(LOTS_FILE))?;
    let store = open_store(root, store_dir)?;
    let outcome = sync::append_production(
        store.as_ref(),
        args.product.trim(),
        args.production_date,
        args.expiry_date,
        &entries,
        lots.all(),
    )?;
    println!(
        "Ledger updated: lot code {} ({} ingredient slots)",
        outcome.lot_code, outcome.slots
    );
    Ok(())
}

fn cmd_ledger(root: &Path, command: LedgerCommand, store_dir: Option<&Path>) -> Result<()> {
    let store = open_store(root, store_dir)?;
    let Some((slots, rows)) = sync::load_ledger(store.as_ref())? else {
        println!("No ledger on the store yet.");
        return Ok(());
    };
    match command {
        LedgerCommand::Show => {
            println!("Ledger capacity: {slots} ingredient slots, {} rows", rows.len());
            for row in rows {
                let pairs: Vec<String> = row
                    .ingredients
                    .iter()
                    .map(|pair| format!("{} ({})", pair.name, pair.lot))
                    .collect();
                println!(
                    "{}  {}  lot {}  expiry {}  [{}]",
                    row.production_date,
                    row.product,
                    row.lot_code,
                    row.expiry_date,
                    pairs.join(", ")
                );
            }
        }
        LedgerCommand::Pdf(LedgerPdfArgs { out, push }) => {
            let bytes = render::production_pdf(&rows);
            if let Some(out) = &out {
                std::fs::write(out, &bytes)
                    .with_context(|| format!("write {}", out.display()))?;
                println!("Wrote {}", out.display());
            }
            if push {
                let structure = sync::folder_structure(store.as_ref())?;
                store::upload_or_update(
                    store.as_ref(),
                    sync::PRODUCTION_PDF_NAME,
                    &bytes,
                    Some(&structure.root_id),
                )?;
                println!("Uploaded {}", sync::PRODUCTION_PDF_NAME);
            }
            if out.is_none() && !push {
                return Err(anyhow!("pass --out, --push, or both"));
            }
        }
    }
    Ok(())
}

fn cmd_render(root: &Path, args: RenderArgs, store_dir: Option<&Path>) -> Result<()> {
    let company = company(root)?;
    let book = RecordBook::load(&root.join(RECORDS_FILE))?;
    let store = open_store(root, store_dir)?;
    let structure = sync::folder_structure(store.as_ref())?;
    let operator_signature = sync::load_signature(store.as_ref(), &structure.root_id);
    let ctx = RenderContext {
        company: &company,
        signature: operator_signature.as_ref(),
    };
    let kind = match args.kind {
        RenderKindArg::Temperature => RegisterKind::Temperature,
        RenderKindArg::Sanitation => RegisterKind::Sanitation,
    };

    let (bytes, file_name, year, month) = if let Some(date) = args.date {
        let record = book
            .get(date)
            .ok_or_else(|| anyhow!("no record for {date}"))?;
        let bytes = render::day_pdf(kind, record, &ctx);
        let prefix = kind_file_prefix(kind);
        (
            bytes,
            format!("{prefix}_{date}.pdf"),
            date.year(),
            date.month(),
        )
    } else {
        let month_arg = args
            .month
            .as_deref()
            .ok_or_else(|| anyhow!("pass --month or --date"))?;
        let (year, month) = parse_month(month_arg)?;
        let records = book.by_month(year, month);
        let bytes = render::month_pdf(kind, &records, &ctx, year, month);
        let (temperature_name, sanitation_name) = sync::month_file_names(year, month);
        let file_name = match kind {
            RegisterKind::Temperature => temperature_name,
            RegisterKind::Sanitation => sanitation_name,
        };
        (bytes, file_name, year, month)
    };

    if let Some(out) = &args.out {
        std::fs::write(out, &bytes).with_context(|| format!("write {}", out.display()))?;
        println!("Wrote {}", out.display());
    }
    if args.push {
        let folder = sync::month_folder(store.as_ref(), &structure.root_id, year, month)?;
        store::upload_or_update(store.as_ref(), &file_name, &bytes, Some(&folder))?;
        println!("Uploaded {file_name}");
    }
    if args.out.is_none() && !args.push {
        return Err(anyhow!("pass --out, --push, or both"));
    }
    Ok(())
}

fn kind_file_prefix(kind: RegisterKind) -> &'static str {
    match kind {
        RegisterKind::Temperature => "HACCP_Temperature",
        RegisterKind::Sanitation => "HACCP_Sanificazione",
    }
}

fn cmd_archive(root: &Path, args: ArchiveArgs, store_dir: Option<&Path>) -> Result<()> {
    let company = company(root)?;
    let book = RecordBook::load(&root.join(RECORDS_FILE))?;
    if book.all().is_empty() {
        return Err(anyhow!("no records to archive"));
    }
    let store = open_store(root, store_dir)?;
    let structure = sync::folder_structure(store.as_ref())?;
    let operator_signature = sync::load_signature(store.as_ref(), &structure.root_id);
    let ctx = RenderContext {
        company: &company,
        signature: operator_signature.as_ref(),
    };

    let mut documents = Vec::new();
    for (year, month) in book.month_keys() {
        let records = book.by_month(year, month);
        let key = format!("{year}-{month:02}");
        documents.push(archive::RenderedDocument {
            name: format!("HACCP_Temperature_{key}.pdf"),
            bytes: render::month_pdf(RegisterKind::Temperature, &records, &ctx, year, month),
        });
        documents.push(archive::RenderedDocument {
            name: format!("HACCP_Sanificazione_{key}.pdf"),
            bytes: render::month_pdf(RegisterKind::Sanitation, &records, &ctx, year, month),
        });
    }
    let bytes = archive::package(&documents)?;
    std::fs::write(&args.out, bytes).with_context(|| format!("write {}", args.out.display()))?;
    println!("Wrote {} ({} documents)", args.out.display(), documents.len());
    Ok(())
}

fn cmd_sync(root: &Path, command: SyncCommand, store_dir: Option<&Path>) -> Result<()> {
    let store = open_store(root, store_dir)?;
    match command {
        SyncCommand::Month(SyncMonthArgs { month }) => {
            let company = company(root)?;
            let book = RecordBook::load(&root.join(RECORDS_FILE))?;
            let (year, month) = match month {
                Some(month) => parse_month(&month)?,
                None => {
                    let today = chrono::Local::now().date_naive();
                    (today.year(), today.month())
                }
            };
            let records = book.by_month(year, month);
            let (temperature, sanitation) =
                sync::push_month(store.as_ref(), &records, &company, year, month)?;
            println!("Uploaded {temperature} and {sanitation}");
        }
        SyncCommand::All => {
            let company = company(root)?;
            let book = RecordBook::load(&root.join(RECORDS_FILE))?;
            let months = book.month_keys();
            if months.is_empty() {
                return Err(anyhow!("no records to push"));
            }
            let uploaded = sync::push_months(store.as_ref(), book.all(), &company, &months)?;
            println!("Uploaded registers for {} months", uploaded.len());
        }
        SyncCommand::Lots => {
            let book = LotBook::load(&root.join(LOTS_FILE))?;
            let name = sync::push_incoming(store.as_ref(), book.all())?;
            println!("Uploaded {name}");
        }
        SyncCommand::Status => {
            let structure = sync::folder_structure(store.as_ref())?;
            let entries = store.list(Some(&structure.root_id))?;
            println!(
                "Store reachable; {} entries and {} month folders under {}",
                entries.len(),
                structure.month_folders.len(),
                sync::ROOT_FOLDER
            );
        }
    }
    Ok(())
}

fn cmd_autogen(root: &Path, args: AutogenArgs) -> Result<()> {
    let path = root.join(RECORDS_FILE);
    let mut book = RecordBook::load(&path)?;
    let mut rng = rand::thread_rng();
    let written = autogen::generate(&mut book, args.start, args.end, &mut rng)?;
    book.save(&path)?;
    println!("Generated {written} records");
    Ok(())
}

fn cmd_signature(root: &Path, command: SignatureCommand, store_dir: Option<&Path>) -> Result<()> {
    let store = open_store(root, store_dir)?;
    let structure = sync::folder_structure(store.as_ref())?;
    match command {
        SignatureCommand::Set(SignatureSetArgs { file }) => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            signature::decode(&bytes).context("signature image is not a usable PNG/JPEG")?;
            let folder =
                match store.find_by_name(signature::SIGNATURE_FOLDER, Some(&structure.root_id))? {
                    Some(entry) => entry.id,
                    None => {
                        store.create_folder(signature::SIGNATURE_FOLDER, Some(&structure.root_id))?
                    }
                };
            let name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("firma_osa.png");
            store::upload_or_update(store.as_ref(), name, &bytes, Some(&folder))?;
            println!("Signature uploaded as {name}");
        }
        SignatureCommand::Status => {
            match sync::load_signature(store.as_ref(), &structure.root_id) {
                Some(image) => println!(
                    "Signature available ({}x{} px)",
                    image.width(),
                    image.height()
                ),
                None => println!("No usable signature on the store."),
            }
        }
    }
    Ok(())
}

fn parse_month(value: &str) -> Result<(i32, u32)> {
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| anyhow!("month must be YYYY-MM, got {value:?}"))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("invalid year in {value:?}"))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("invalid month in {value:?}"))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("month out of range in {value:?}"));
    }
    Ok((year, month))
}

fn parse_ingredient_entries(raw: &[String]) -> Result<Vec<IngredientLot>> {
    raw.iter()
        .map(|entry| {
            let (name, lot) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("ingredient must be NAME=LOT, got {entry:?}"))?;
            Ok(IngredientLot {
                name: name.trim().to_string(),
                lot: lot.trim().to_string(),
            })
        })
        .collect()
}

fn apply_skips(sanitation: &mut Sanitation, skips: &[String]) -> Result<()> {
    for skip in skips {
        let flag = match skip.trim().to_lowercase().as_str() {
            "equipment" => &mut sanitation.equipment,
            "surfaces" => &mut sanitation.surfaces,
            "utensils" => &mut sanitation.utensils,
            "floors" => &mut sanitation.floors,
            "refrigerators" => &mut sanitation.refrigerators,
            "walls" => &mut sanitation.walls,
            "lighting" => &mut sanitation.lighting,
            "doors" => &mut sanitation.doors,
            "shelves" => &mut sanitation.shelves,
            "toilets" => &mut sanitation.toilets,
            "waste-containers" | "waste_containers" => &mut sanitation.waste_containers,
            "ovens" => &mut sanitation.ovens,
            other => return Err(anyhow!("unknown sanitation item {other:?}")),
        };
        *flag = false;
    }
    Ok(())
}
