use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db;
use crate::dedup::{AddOutcome, Deduplicator};
use crate::error::{KadError, Result};
use crate::models::{ActivityCodeRecord, RawCode, RawRow};
use crate::normalizer::{self, Policy};
use crate::sources::{self, cell_is_blank, SourceData, SourceKind};

pub const REASON_SHORT_ROW: &str = "fewer than 2 non-empty columns";

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollisionGroup {
    pub code: String,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateLine {
    pub code: String,
    pub row: RawRow,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteError {
    pub code: String,
    pub error: String,
}

/// Everything an import run found and did, in the order it was found.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub file: String,
    pub source: String,
    pub policy: String,
    pub duplicate_file: bool,
    pub total_rows: usize,
    pub header_rows: usize,
    pub blank_rows: usize,
    pub valid: usize,
    pub skipped: Vec<SkippedRow>,
    pub unique_codes: usize,
    pub exact_duplicates: Vec<DuplicateLine>,
    pub collisions: Vec<CollisionGroup>,
    pub written: bool,
    pub inserted: usize,
    pub already_present: usize,
    pub write_errors: Vec<WriteError>,
}

impl ImportReport {
    pub fn needs_review(&self) -> bool {
        !self.collisions.is_empty()
    }
}

pub struct ImportOptions<'a> {
    pub policy: Policy,
    pub format: Option<&'a str>,
    pub sheet: Option<&'a str>,
    pub vat_rate: f64,
    pub dry_run: bool,
    pub accept_collisions: bool,
}

// ---------------------------------------------------------------------------
// Pure pipeline
// ---------------------------------------------------------------------------

fn describe_cell(cell: &RawCode) -> String {
    match cell {
        RawCode::Text(s) => s.trim().to_string(),
        RawCode::Number(n) => n.to_string(),
    }
}

/// Normalize and deduplicate every record; no I/O.
pub fn process(data: SourceData, policy: Policy) -> (ImportReport, Deduplicator) {
    let mut report = ImportReport {
        policy: policy.to_string(),
        header_rows: data.header_rows,
        total_rows: data.records.len(),
        ..Default::default()
    };
    let mut dedup = Deduplicator::new();

    for record in data.records {
        if record.is_blank() {
            report.blank_rows += 1;
            continue;
        }
        let code_cell = &record.cells[0];
        // the description is the first non-empty column after the code
        let Some(description) = record.cells[1..].iter().find(|c| !cell_is_blank(c)) else {
            log::debug!("line {}: {REASON_SHORT_ROW}", record.line);
            report.skipped.push(SkippedRow {
                line: record.line,
                raw: describe_cell(code_cell),
                reason: REASON_SHORT_ROW.to_string(),
            });
            continue;
        };

        let digits = match normalizer::clean(code_cell) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("line {}: {e}", record.line);
                report.skipped.push(SkippedRow {
                    line: record.line,
                    raw: describe_cell(code_cell),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let code = match normalizer::canonicalize(&digits, policy) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("line {}: {e}", record.line);
                report.skipped.push(SkippedRow {
                    line: record.line,
                    raw: describe_cell(code_cell),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        report.valid += 1;
        let row = RawRow::new(record.line, code_cell.clone(), &describe_cell(description));
        if dedup.add(row, &digits, &code) == AddOutcome::Collision {
            log::debug!("line {}: collides on {code}", record.line);
        }
    }

    report.unique_codes = dedup.unique_count();
    report.collisions = dedup
        .collisions()
        .map(|(code, rows)| CollisionGroup {
            code: code.to_string(),
            rows: rows.to_vec(),
        })
        .collect();
    report.exact_duplicates = dedup
        .exact_duplicates()
        .iter()
        .map(|d| DuplicateLine {
            code: d.code.clone(),
            row: d.row.clone(),
        })
        .collect();
    (report, dedup)
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

pub fn import_file(conn: &Connection, file_path: &Path, opts: &ImportOptions) -> Result<ImportReport> {
    let kind = sources::resolve(file_path, opts.format)?;
    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();

    if opts.sheet.is_some() && !kind.has_sheets() {
        return Err(KadError::Other(format!(
            "--sheet only applies to spreadsheets, not {} sources",
            kind.key()
        )));
    }
    log::debug!("reading {filename} as {}", kind.name());
    db::ensure_policy(conn, opts.policy)?;

    let checksum = compute_checksum(file_path)?;
    if db::import_exists(conn, &checksum)? {
        return Ok(ImportReport {
            file: filename,
            source: kind.key().to_string(),
            policy: opts.policy.to_string(),
            duplicate_file: true,
            ..Default::default()
        });
    }

    let data = kind.read(file_path, opts.sheet)?;
    let (mut report, dedup) = process(data, opts.policy);
    report.file = filename;
    report.source = kind.key().to_string();

    log::info!(
        "{}: {} row(s), {} valid, {} skipped, {} unique, {} collision group(s)",
        report.file,
        report.total_rows,
        report.valid,
        report.skipped.len(),
        report.unique_codes,
        dedup.collision_count()
    );

    if opts.dry_run || (report.needs_review() && !opts.accept_collisions) {
        return Ok(report);
    }

    write_records(conn, &mut report, &dedup, kind, &checksum, opts)?;
    Ok(report)
}

fn write_records(
    conn: &Connection,
    report: &mut ImportReport,
    dedup: &Deduplicator,
    kind: SourceKind,
    checksum: &str,
    opts: &ImportOptions,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let import_id = db::record_import(
        &tx,
        &db::NewImport {
            filename: &report.file,
            source_kind: kind.key(),
            policy: opts.policy,
            record_count: report.total_rows,
            checksum,
        },
    )?;

    for (code, row) in dedup.firsts() {
        match db::code_exists(&tx, code) {
            Ok(true) => {
                report.already_present += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                log::warn!("{code}: {e}");
                report.write_errors.push(WriteError {
                    code: code.to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        }
        let record = ActivityCodeRecord::from_import(code, &row.description, opts.vat_rate);
        match db::insert_code(&tx, &record, Some(import_id)) {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                log::warn!("{code}: {e}");
                report.write_errors.push(WriteError {
                    code: code.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    db::finish_import(&tx, import_id, report.inserted)?;
    db::pin_policy(&tx, opts.policy)?;
    tx.commit()?;
    report.written = true;
    Ok(())
}
