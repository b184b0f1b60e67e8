use std::path::PathBuf;

use crate::db::{get_connection, init_db, pinned_policy};
use crate::error::{KadError, Result};
use crate::normalizer::Policy;
use crate::settings::{load_settings, save_settings, shellexpand_path, DB_FILE};

pub fn run(data_dir: Option<String>, policy: Option<String>, vat_rate: Option<f64>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(p) = policy {
        settings.policy = p.parse::<Policy>()?;
    }
    if let Some(rate) = vat_rate {
        if !(0.0..=100.0).contains(&rate) {
            return Err(KadError::Settings(format!("VAT rate out of range: {rate}")));
        }
        settings.default_vat_rate = rate;
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;

    if let Some(pinned) = pinned_policy(&conn)? {
        if pinned != settings.policy {
            println!(
                "Note: this database is pinned to policy '{pinned}'; imports with '{}' will be refused.",
                settings.policy
            );
        }
    }

    save_settings(&settings)?;
    println!("Initialized kad at {}", resolved.display());
    println!("Policy: {}  Default VAT: {}", settings.policy, crate::fmt::rate(settings.default_vat_rate));
    Ok(())
}
