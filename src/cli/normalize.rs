use comfy_table::{Cell, Table};

use crate::cli::resolve_policy;
use crate::error::{KadError, Result};
use crate::models::RawCode;
use crate::normalizer::normalize;
use crate::sections::classify;

pub fn run(values: &[String], policy: Option<&str>) -> Result<()> {
    let policy = resolve_policy(policy)?;

    let mut table = Table::new();
    table.set_header(vec!["Input", "Canonical", "Section", "Category"]);
    let mut rejected = 0usize;
    for value in values {
        match normalize(&RawCode::Text(value.clone()), policy) {
            Ok(code) => {
                let section = classify(&code);
                table.add_row(vec![
                    Cell::new(value),
                    Cell::new(&code),
                    Cell::new(section),
                    Cell::new(section.title()),
                ]);
            }
            Err(e) => {
                rejected += 1;
                table.add_row(vec![
                    Cell::new(value),
                    Cell::new(e.to_string()),
                    Cell::new(""),
                    Cell::new(""),
                ]);
            }
        }
    }
    println!("Policy: {policy}\n{table}");

    if rejected > 0 {
        return Err(KadError::Other(format!("{rejected} value(s) rejected")));
    }
    Ok(())
}

pub fn classify_codes(codes: &[String]) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Code", "Section", "Title", "Title (EN)"]);
    for code in codes {
        let section = classify(code.trim());
        table.add_row(vec![
            Cell::new(code),
            Cell::new(section),
            Cell::new(section.title()),
            Cell::new(section.title_en()),
        ]);
    }
    println!("{table}");
    Ok(())
}
