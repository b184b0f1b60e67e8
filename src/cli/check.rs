use colored::Colorize;

use crate::cli::CheckKind;
use crate::error::{KadError, Result};
use crate::validate::{check_afm, check_iban, check_vat};

pub fn run(kind: CheckKind, value: &str) -> Result<()> {
    let (label, result) = match kind {
        CheckKind::Afm => ("AFM", check_afm(value)),
        CheckKind::Vat => ("VAT number", check_vat(value)),
        CheckKind::Iban => ("IBAN", check_iban(value)),
    };
    let normalized = result.map_err(|source| KadError::InvalidId { kind: label, source })?;
    println!("{} {label}: {normalized}", "\u{2713} valid".green().bold());
    Ok(())
}
