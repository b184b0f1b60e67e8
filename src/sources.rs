use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{KadError, Result};
use crate::models::RawCode;
use crate::normalizer::MIN_DIGITS;

/// One row of the source after the header region, cells in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub line: usize,
    pub cells: Vec<RawCode>,
}

impl SourceRecord {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(cell_is_blank)
    }
}

#[derive(Debug, Default)]
pub struct SourceData {
    pub records: Vec<SourceRecord>,
    /// Rows (or lines) before the first data row.
    pub header_rows: usize,
}

pub fn cell_is_blank(cell: &RawCode) -> bool {
    matches!(cell, RawCode::Text(s) if s.trim().is_empty())
}

/// True when the cell, once whitespace and dots are stripped, is all digits.
pub fn parses_as_number(cell: &RawCode) -> bool {
    match cell {
        RawCode::Number(n) => n.is_finite(),
        RawCode::Text(s) => {
            let digits: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '.')
                .collect();
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
    }
}

fn trim_trailing_blanks(cells: &mut Vec<RawCode>) {
    while cells.last().is_some_and(cell_is_blank) {
        cells.pop();
    }
}

/// Drop everything before the first row whose first column parses as a number.
fn split_header(rows: Vec<SourceRecord>) -> SourceData {
    let start = rows
        .iter()
        .position(|r| r.cells.first().is_some_and(parses_as_number))
        .unwrap_or(rows.len());
    let mut rows = rows;
    let records = rows.split_off(start);
    SourceData {
        header_rows: rows.len(),
        records,
    }
}

// ---------------------------------------------------------------------------
// Source kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceKind {
    #[cfg(feature = "xlsx")]
    Xlsx,
    Csv,
    PdfText,
}

const ALL_SOURCES: &[SourceKind] = &[
    #[cfg(feature = "xlsx")]
    SourceKind::Xlsx,
    SourceKind::Csv,
    SourceKind::PdfText,
];

impl SourceKind {
    pub fn key(&self) -> &'static str {
        match self {
            #[cfg(feature = "xlsx")]
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::PdfText => "pdf-text",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "xlsx")]
            Self::Xlsx => "Spreadsheet (XLSX/XLS/ODS)",
            Self::Csv => "CSV",
            Self::PdfText => "Text extracted from PDF",
        }
    }

    pub fn has_sheets(&self) -> bool {
        match self {
            #[cfg(feature = "xlsx")]
            Self::Xlsx => true,
            Self::Csv | Self::PdfText => false,
        }
    }

    fn extensions(&self) -> &[&str] {
        match self {
            #[cfg(feature = "xlsx")]
            Self::Xlsx => &["xlsx", "xlsm", "xls", "ods"],
            Self::Csv => &["csv"],
            Self::PdfText => &["txt", "text"],
        }
    }

    pub fn read(&self, file_path: &Path, sheet: Option<&str>) -> Result<SourceData> {
        match self {
            #[cfg(feature = "xlsx")]
            Self::Xlsx => read_spreadsheet(file_path, sheet),
            Self::Csv => read_csv(file_path),
            Self::PdfText => {
                let content = std::fs::read_to_string(file_path)?;
                Ok(parse_pdf_text(&content))
            }
        }
    }
}

pub fn get_by_key(key: &str) -> Option<SourceKind> {
    ALL_SOURCES.iter().find(|s| s.key() == key).copied()
}

pub fn detect(file_path: &Path) -> Option<SourceKind> {
    let ext = file_path.extension()?.to_str()?.to_ascii_lowercase();
    ALL_SOURCES
        .iter()
        .find(|s| s.extensions().contains(&ext.as_str()))
        .copied()
}

/// `--format` wins; otherwise the file extension decides.
pub fn resolve(file_path: &Path, format_key: Option<&str>) -> Result<SourceKind> {
    match format_key {
        Some(key) => get_by_key(key).ok_or_else(|| KadError::UnknownFormat(key.to_string())),
        None => detect(file_path).ok_or_else(|| {
            KadError::UnknownFormat(
                file_path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| "(no extension)".to_string()),
            )
        }),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn read_spreadsheet(file_path: &Path, sheet: Option<&str>) -> Result<SourceData> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| KadError::Spreadsheet(format!("Failed to open {}: {e}", file_path.display())))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| KadError::Spreadsheet("Workbook has no sheets".to_string()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| KadError::Spreadsheet(format!("Sheet '{sheet_name}': {e}")))?;

    let rows = sheet_rows(&range);
    log::debug!("read {} row(s) from sheet '{sheet_name}'", rows.len());
    Ok(split_header(rows))
}

/// Numeric cells stay numbers; dates and other typed cells become text so they never pass as codes.
#[cfg(feature = "xlsx")]
fn cell_to_raw(cell: &calamine::Data) -> RawCode {
    use calamine::Data;

    match cell {
        Data::Int(n) => RawCode::Number(*n as f64),
        Data::Float(f) => RawCode::Number(*f),
        Data::String(s) => RawCode::Text(s.clone()),
        Data::Empty => RawCode::Text(String::new()),
        Data::DateTime(dt) => RawCode::Text(format!("date {dt}")),
        other => RawCode::Text(other.to_string()),
    }
}

/// Line numbers are 1-based sheet rows, counting from the top of the sheet.
#[cfg(feature = "xlsx")]
fn sheet_rows(range: &calamine::Range<calamine::Data>) -> Vec<SourceRecord> {
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    range
        .rows()
        .enumerate()
        .map(|(i, row)| {
            let mut cells: Vec<RawCode> = row.iter().map(cell_to_raw).collect();
            trim_trailing_blanks(&mut cells);
            SourceRecord {
                line: first_row + i + 1,
                cells,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(file_path: &Path) -> Result<SourceData> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 1);
        let mut cells: Vec<RawCode> = record.iter().map(|f| RawCode::Text(f.to_string())).collect();
        trim_trailing_blanks(&mut cells);
        rows.push(SourceRecord { line, cells });
    }
    Ok(split_header(rows))
}

// ---------------------------------------------------------------------------
// PDF text
// ---------------------------------------------------------------------------

fn code_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{2}[\d.]*\d)(?:\s+(.*))?$")
            .expect("static pattern")
    })
}

fn page_furniture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(σελίδα|σελ\.|page)\s*\d+(\s*(από|of|/)\s*\d+)?\s*$")
            .expect("static pattern")
    })
}

/// Code-leading lines start a record; following lines extend its description.
///
/// A line counts as code-leading when its first token is digits and dots with at
/// least four digits. Tokens of the wrong length still start a record so the
/// importer rejects them with a reason instead of folding them into a description.
pub fn parse_pdf_text(content: &str) -> SourceData {
    let mut data = SourceData::default();
    let mut current: Option<(usize, String, String)> = None;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || page_furniture_re().is_match(trimmed) {
            continue;
        }
        let caps = code_line_re()
            .captures(trimmed)
            .filter(|c| c[1].bytes().filter(u8::is_ascii_digit).count() >= MIN_DIGITS);
        if let Some(caps) = caps {
            if let Some((line_no, code, desc)) = current.take() {
                data.records.push(pdf_record(line_no, code, desc));
            }
            let code = caps[1].to_string();
            let desc = caps.get(2).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            current = Some((i + 1, code, desc));
        } else if let Some((_, _, desc)) = current.as_mut() {
            if !desc.is_empty() {
                desc.push(' ');
            }
            desc.push_str(trimmed);
        } else {
            data.header_rows += 1;
        }
    }
    if let Some((line_no, code, desc)) = current {
        data.records.push(pdf_record(line_no, code, desc));
    }
    data
}

fn pdf_record(line: usize, code: String, description: String) -> SourceRecord {
    let mut cells = vec![RawCode::Text(code), RawCode::Text(description)];
    trim_trailing_blanks(&mut cells);
    SourceRecord { line, cells }
}
