use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::cli::open_db;
use crate::db::{self, CodeUpdate};
use crate::error::{KadError, Result};
use crate::fmt::{rate, truncate};
use crate::models::RawCode;
use crate::normalizer::normalize;
use crate::sections::Section;
use crate::settings::load_settings;

/// Accept a dotted code or raw digits and normalize it the way the database was.
fn resolve_code(conn: &Connection, input: &str) -> Result<String> {
    let input = input.trim();
    let policy = db::pinned_policy(conn)?.unwrap_or_else(|| load_settings().policy);
    normalize(&RawCode::Text(input.to_string()), policy)
        .map_err(|e| KadError::Other(format!("{input}: {e}")))
}

pub fn list(section: Option<&str>, all: bool) -> Result<()> {
    let conn = open_db()?;
    let section = section.map(|s| s.parse::<Section>()).transpose()?;
    let codes = db::list_codes(&conn, section, all)?;

    let mut table = Table::new();
    table.set_header(vec!["Code", "Section", "Description", "VAT", "Popular", "Active"]);
    for rec in &codes {
        table.add_row(vec![
            Cell::new(&rec.code),
            Cell::new(rec.section),
            Cell::new(truncate(&rec.description, 60)),
            Cell::new(rate(rec.vat_rate)),
            Cell::new(if rec.is_popular { "yes" } else { "" }),
            Cell::new(if rec.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("Activity codes ({})\n{table}", codes.len());
    Ok(())
}

pub fn show(code: &str) -> Result<()> {
    let conn = open_db()?;
    let code = resolve_code(&conn, code)?;
    let rec = db::get_code(&conn, &code)?.ok_or_else(|| KadError::UnknownCode(code.clone()))?;

    println!("Code:          {}", rec.code);
    println!("Description:   {}", rec.description);
    println!("English:       {}", rec.description_en.as_deref().unwrap_or("(not set)"));
    println!("Section:       {} ({})", rec.section, rec.section.title_en());
    println!("Category:      {}", rec.category);
    println!("VAT rate:      {}", rate(rec.vat_rate));
    println!("Popular:       {}", if rec.is_popular { "yes" } else { "no" });
    println!("Active:        {}", if rec.is_active { "yes" } else { "no" });
    println!("Keywords:      {}", rec.keywords.join(", "));
    println!("Related codes: {}", rec.related_codes.join(", "));
    Ok(())
}

pub fn update(code: &str, update: CodeUpdate) -> Result<()> {
    if let Some(vat) = update.vat_rate {
        if !(0.0..=100.0).contains(&vat) {
            return Err(KadError::Other(format!("VAT rate out of range: {vat}")));
        }
    }
    let conn = open_db()?;
    let code = resolve_code(&conn, code)?;

    let mut update = update;
    if let Some(related) = update.related_codes.take() {
        let resolved = related
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(|r| resolve_code(&conn, r))
            .collect::<Result<Vec<_>>>()?;
        update.related_codes = Some(resolved);
    }

    let rec = db::update_code(&conn, &code, &update)?;
    println!("Updated {}: {}", rec.code, rec.description);
    Ok(())
}

pub fn set_active(code: &str, active: bool) -> Result<()> {
    let conn = open_db()?;
    let code = resolve_code(&conn, code)?;
    let changed = db::set_active(&conn, &code, active)?;
    let state = if active { "active" } else { "inactive" };
    if changed {
        println!("{code} is now {state}");
    } else {
        println!("{code} is already {state}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db, pin_policy};
    use crate::normalizer::Policy;

    fn test_db(policy: Policy) -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        pin_policy(&conn, policy).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_resolve_code_applies_pinned_policy_to_dotted_input() {
        let (_dir, conn) = test_db(Policy::Pad6);
        assert_eq!(resolve_code(&conn, "01.11").unwrap(), "01.11.00");
        assert_eq!(resolve_code(&conn, " 0111 ").unwrap(), "01.11.00");
        assert_eq!(resolve_code(&conn, "46.42.11.14").unwrap(), "46.42.11.14");
    }

    #[test]
    fn test_resolve_code_keeps_grouped_codes() {
        let (_dir, conn) = test_db(Policy::Grouped);
        assert_eq!(resolve_code(&conn, "10.000").unwrap(), "10.000");
        assert_eq!(resolve_code(&conn, "01.11").unwrap(), "01.11");
        assert!(resolve_code(&conn, "01.1").is_err());
    }
}
