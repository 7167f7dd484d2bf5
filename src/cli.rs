//! CLI argument parsing for the register workflow.
//!
//! The CLI is intentionally thin: it loads catalogs and settings, hands
//! explicit data to the core functions, and persists the results, so the
//! same core logic stays reusable and testable on its own.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint for the compliance-register workflow.
#[derive(Parser, Debug)]
#[command(
    name = "registri",
    version,
    about = "Food-safety compliance ledger and register documents",
    after_help = "Examples:\n  registri init --company \"Trattoria Da Mario\" --piva 01234567890\n  registri record add --date 2025-10-21 --freezer -19.5 --fridge1 2.0 --fridge2 3.5\n  registri lot add --name Pomodoro --code LTN-20251021-01 --purchased 2025-10-20\n  registri produce --product \"Salsa piccante\" --production-date 2025-10-21 \\\n      --expiry-date 2025-11-21 --ingredient \"Pomodoro=LTN-20251021-01\"\n  registri render --kind temperature --month 2025-10 --out temperature.pdf\n  registri archive --out registri.zip\n  registri sync month --month 2025-10",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Use a local directory store rooted here instead of the configured store
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the company identity and store configuration
    Init(InitArgs),
    /// Manage daily temperature/sanitation records
    #[command(subcommand)]
    Record(RecordCommand),
    /// Manage the incoming-goods registry
    #[command(subcommand)]
    Lot(LotCommand),
    /// Manage semi-product recipe templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Validate and append a production row to the remote ledger
    Produce(ProduceArgs),
    /// Inspect the remote ledger or render it as a register document
    #[command(subcommand)]
    Ledger(LedgerCommand),
    /// Render a temperature or sanitation register
    Render(RenderArgs),
    /// Bundle every monthly register into one archive
    Archive(ArchiveArgs),
    /// Upload registers and registries to the remote store
    #[command(subcommand)]
    Sync(SyncCommand),
    /// Generate daily records over a date range
    Autogen(AutogenArgs),
    /// Manage the stored operator signature
    #[command(subcommand)]
    Signature(SignatureCommand),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Company name printed on every register
    #[arg(long)]
    pub company: String,

    /// Company tax id (partita IVA)
    #[arg(long)]
    pub piva: String,

    /// Company address
    #[arg(long)]
    pub address: Option<String>,

    /// Bearer token for the Drive-style remote store; selects the drive store
    #[arg(long, value_name = "TOKEN")]
    pub drive_token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    Add(RecordAddArgs),
    List(RecordListArgs),
    Delete(RecordDeleteArgs),
}

#[derive(Args, Debug)]
#[command(about = "Add or replace the record for a date")]
pub struct RecordAddArgs {
    /// Record date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Freezer reading in °C
    #[arg(long, allow_hyphen_values = true)]
    pub freezer: f64,

    /// First refrigerator reading in °C
    #[arg(long, allow_hyphen_values = true)]
    pub fridge1: f64,

    /// Second refrigerator reading in °C
    #[arg(long, allow_hyphen_values = true)]
    pub fridge2: f64,

    /// Sanitation items left undone (repeatable; e.g. --skip ovens)
    #[arg(long, value_name = "ITEM")]
    pub skip: Vec<String>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,

    /// PNG/JPEG signature image attached to this record
    #[arg(long, value_name = "PATH")]
    pub signature: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(about = "List records, optionally for one month")]
pub struct RecordListArgs {
    /// Month to list (YYYY-MM)
    #[arg(long)]
    pub month: Option<String>,
}

#[derive(Args, Debug)]
#[command(about = "Delete the record for a date or a whole month")]
pub struct RecordDeleteArgs {
    /// Date to delete (YYYY-MM-DD)
    #[arg(long, conflicts_with = "month")]
    pub date: Option<NaiveDate>,

    /// Month to delete (YYYY-MM)
    #[arg(long)]
    pub month: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum LotCommand {
    Add(LotAddArgs),
    List,
    /// Upload the incoming-goods registry CSV to the store
    Push,
}

#[derive(Args, Debug)]
#[command(about = "Register a goods receipt")]
pub struct LotAddArgs {
    /// Food name
    #[arg(long)]
    pub name: String,

    /// Lot code stamped on the receipt
    #[arg(long)]
    pub code: String,

    /// Purchase date (YYYY-MM-DD)
    #[arg(long)]
    pub purchased: NaiveDate,

    /// Supplier name
    #[arg(long)]
    pub supplier: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    Add(TemplateAddArgs),
    Remove(TemplateRemoveArgs),
    List,
}

#[derive(Args, Debug)]
#[command(about = "Add a semi-product template")]
pub struct TemplateAddArgs {
    /// Product name (unique)
    #[arg(long)]
    pub name: String,

    /// Ingredient name (repeatable, in recipe order)
    #[arg(long = "ingredient", value_name = "NAME")]
    pub ingredients: Vec<String>,

    /// Category label
    #[arg(long)]
    pub category: Option<String>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
#[command(about = "Remove a template permanently")]
pub struct TemplateRemoveArgs {
    /// Product name
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug)]
#[command(about = "Validate and append a production row to the ledger")]
pub struct ProduceArgs {
    /// Product name (usually a template name)
    #[arg(long)]
    pub product: String,

    /// Production date (YYYY-MM-DD)
    #[arg(long)]
    pub production_date: NaiveDate,

    /// Expiry date (YYYY-MM-DD)
    #[arg(long)]
    pub expiry_date: NaiveDate,

    /// Ingredient entry as NAME=LOT (repeatable)
    #[arg(long = "ingredient", value_name = "NAME=LOT")]
    pub ingredients: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Print the ledger rows
    Show,
    /// Render the production register PDF
    Pdf(LedgerPdfArgs),
}

#[derive(Args, Debug)]
pub struct LedgerPdfArgs {
    /// Write the PDF here
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Upload the PDF to the register root
    #[arg(long)]
    pub push: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RenderKindArg {
    Temperature,
    Sanitation,
}

#[derive(Args, Debug)]
#[command(about = "Render a monthly grid or a single-day sheet")]
pub struct RenderArgs {
    /// Register kind
    #[arg(long, value_enum)]
    pub kind: RenderKindArg,

    /// Month to render (YYYY-MM)
    #[arg(long, conflicts_with = "date")]
    pub month: Option<String>,

    /// Single day to render (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Write the PDF here
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Upload the PDF into the month folder on the store
    #[arg(long)]
    pub push: bool,
}

#[derive(Args, Debug)]
#[command(about = "Bundle every monthly register into one archive")]
pub struct ArchiveArgs {
    /// Write the archive here
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Render and upload both registers for one month
    Month(SyncMonthArgs),
    /// Render and upload registers for every month with records
    All,
    /// Upload the incoming-goods registry CSV
    Lots,
    /// Check that the configured store is reachable
    Status,
}

#[derive(Args, Debug)]
pub struct SyncMonthArgs {
    /// Month to push (YYYY-MM); defaults to the current month
    #[arg(long)]
    pub month: Option<String>,
}

#[derive(Args, Debug)]
#[command(about = "Generate one record per date in an inclusive range")]
pub struct AutogenArgs {
    /// First date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,
}

#[derive(Subcommand, Debug)]
pub enum SignatureCommand {
    /// Upload an operator signature image to the store
    Set(SignatureSetArgs),
    /// Report whether a signature is available
    Status,
}

#[derive(Args, Debug)]
pub struct SignatureSetArgs {
    /// PNG or JPEG image file
    pub file: PathBuf,
}
