pub mod check;
pub mod codes;
pub mod import;
pub mod init;
pub mod normalize;
pub mod status;

use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::normalizer::Policy;
use crate::settings::{get_data_dir, load_settings, DB_FILE};

/// Open the configured database, creating the data directory and schema if needed.
pub(crate) fn open_db() -> Result<Connection> {
    let data_dir = get_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let conn = get_connection(&data_dir.join(DB_FILE))?;
    init_db(&conn)?;
    Ok(conn)
}

/// `--policy` if given, else the configured default.
pub(crate) fn resolve_policy(policy: Option<&str>) -> Result<Policy> {
    match policy {
        Some(p) => p.parse(),
        None => Ok(load_settings().policy),
    }
}

#[derive(Parser)]
#[command(
    name = "kad",
    version,
    about = "Import, normalize and classify Greek business activity codes (KAD)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and normalization policy, and initialize the database.
    Init {
        /// Path for kad data (default: ~/Documents/kad)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Normalization policy: grouped, pad6, truncate6
        #[arg(long)]
        policy: Option<String>,
        /// Default VAT rate for imported codes
        #[arg(long = "vat-rate")]
        vat_rate: Option<f64>,
    },
    /// Import activity codes from an XLSX, CSV or PDF-text file.
    Import {
        /// Path to the source file
        file: String,
        /// Source format: xlsx, csv, pdf-text (default: from extension)
        #[arg(long)]
        format: Option<String>,
        /// Worksheet name (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Normalization policy (default: from settings)
        #[arg(long)]
        policy: Option<String>,
        /// Print the report without writing anything
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Write records even when several source lines map to one code
        #[arg(long = "accept-collisions")]
        accept_collisions: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical code and section for raw code values.
    Normalize {
        /// Raw code values, e.g. 10000 or "01.11.11"
        #[arg(required = true)]
        values: Vec<String>,
        /// Normalization policy (default: from settings)
        #[arg(long)]
        policy: Option<String>,
    },
    /// Print the section (A-U) for canonical codes.
    Classify {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Browse and edit stored activity codes.
    Codes {
        #[command(subcommand)]
        command: CodesCommands,
    },
    /// Check a Greek AFM, VAT number or IBAN.
    Check {
        #[arg(value_enum)]
        kind: CheckKind,
        value: String,
    },
    /// Show current database and summary statistics.
    Status,
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum CodesCommands {
    /// List stored codes.
    List {
        /// Only codes in this section (A-U)
        #[arg(long)]
        section: Option<String>,
        /// Include inactive codes
        #[arg(long)]
        all: bool,
    },
    /// Show one code in full.
    Show { code: String },
    /// Edit a stored code.
    Update {
        code: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "description-en")]
        description_en: Option<String>,
        #[arg(long = "vat-rate")]
        vat_rate: Option<f64>,
        /// true or false
        #[arg(long)]
        popular: Option<bool>,
        /// Comma-separated canonical codes
        #[arg(long, value_delimiter = ',')]
        related: Option<Vec<String>>,
    },
    /// Mark a code inactive.
    Deactivate { code: String },
    /// Mark a code active again.
    Activate { code: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CheckKind {
    Afm,
    Vat,
    Iban,
}
