use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_db, resolve_policy};
use crate::error::{KadError, Result};
use crate::fmt::truncate;
use crate::importer::{import_file, ImportOptions, ImportReport};
use crate::settings::load_settings;

const DESCRIPTION_WIDTH: usize = 60;

pub struct ImportArgs {
    pub file: String,
    pub format: Option<String>,
    pub sheet: Option<String>,
    pub policy: Option<String>,
    pub dry_run: bool,
    pub accept_collisions: bool,
    pub json: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let file_path = PathBuf::from(&args.file);
    if !file_path.exists() {
        return Err(KadError::Other(format!("File not found: {}", file_path.display())));
    }
    let settings = load_settings();
    let policy = resolve_policy(args.policy.as_deref())?;
    let conn = open_db()?;

    let opts = ImportOptions {
        policy,
        format: args.format.as_deref(),
        sheet: args.sheet.as_deref(),
        vat_rate: settings.default_vat_rate,
        dry_run: args.dry_run,
        accept_collisions: args.accept_collisions,
    };
    let report = import_file(&conn, &file_path, &opts)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.duplicate_file {
        println!("This file has already been imported (duplicate checksum).");
        return Ok(());
    } else {
        print_report(&report);
    }

    if report.needs_review() && !report.written && !args.dry_run {
        return Err(KadError::CollisionsPending(report.collisions.len()));
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    let mut table = Table::new();
    table.set_header(vec!["", "Count"]);
    table.add_row(vec![Cell::new("Rows after header"), Cell::new(report.total_rows)]);
    table.add_row(vec![Cell::new("Header rows"), Cell::new(report.header_rows)]);
    table.add_row(vec![Cell::new("Blank rows"), Cell::new(report.blank_rows)]);
    table.add_row(vec![Cell::new("Valid"), Cell::new(report.valid)]);
    table.add_row(vec![Cell::new("Skipped"), Cell::new(report.skipped.len())]);
    table.add_row(vec![Cell::new("Unique codes"), Cell::new(report.unique_codes)]);
    table.add_row(vec![Cell::new("Exact duplicates"), Cell::new(report.exact_duplicates.len())]);
    table.add_row(vec![Cell::new("Duplicate groups"), Cell::new(report.collisions.len())]);
    if report.written {
        table.add_row(vec![Cell::new("Inserted".green().bold()), Cell::new(report.inserted)]);
        table.add_row(vec![Cell::new("Already present"), Cell::new(report.already_present)]);
        table.add_row(vec![Cell::new("Write errors"), Cell::new(report.write_errors.len())]);
    }
    println!("Import {} ({}, policy {})\n{table}", report.file, report.source, report.policy);

    if !report.skipped.is_empty() {
        let mut t = Table::new();
        t.set_header(vec!["Line", "Raw code", "Reason"]);
        for s in &report.skipped {
            t.add_row(vec![
                Cell::new(s.line),
                Cell::new(truncate(&s.raw, DESCRIPTION_WIDTH)),
                Cell::new(&s.reason),
            ]);
        }
        println!("\n{}\n{t}", "Skipped rows".yellow().bold());
    }

    if !report.exact_duplicates.is_empty() {
        let mut t = Table::new();
        t.set_header(vec!["Line", "Code", "Description"]);
        for d in &report.exact_duplicates {
            t.add_row(vec![
                Cell::new(d.row.line),
                Cell::new(&d.code),
                Cell::new(truncate(&d.row.description, DESCRIPTION_WIDTH)),
            ]);
        }
        println!("\n{}\n{t}", "Exact duplicates (ignored, first occurrence kept)".bold());
    }

    if !report.collisions.is_empty() {
        let mut t = Table::new();
        t.set_header(vec!["Code", "Line", "Raw code", "Description"]);
        for group in &report.collisions {
            for (i, row) in group.rows.iter().enumerate() {
                let code = if i == 0 {
                    format!("{} ({})", group.code, group.rows.len())
                } else {
                    String::new()
                };
                t.add_row(vec![
                    Cell::new(code),
                    Cell::new(row.line),
                    Cell::new(row.code.to_string()),
                    Cell::new(truncate(&row.description, DESCRIPTION_WIDTH)),
                ]);
            }
        }
        println!("\n{}\n{t}", "Collisions (different source lines, same code)".red().bold());
    }

    if !report.write_errors.is_empty() {
        let mut t = Table::new();
        t.set_header(vec!["Code", "Error"]);
        for e in &report.write_errors {
            t.add_row(vec![Cell::new(&e.code), Cell::new(&e.error)]);
        }
        println!("\n{}\n{t}", "Write errors".red().bold());
    }

    if !report.written {
        println!("\nNothing written.");
    }
}
