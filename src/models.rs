use std::fmt;

use serde::Serialize;

use crate::sections::Section;

/// A code cell as it came out of the source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawCode {
    Text(String),
    Number(f64),
}

impl fmt::Display for RawCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RawCode {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for RawCode {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// One data line from a spreadsheet or PDF text, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    /// 1-based line (or spreadsheet row) number in the source.
    pub line: usize,
    pub code: RawCode,
    pub description: String,
}

impl RawRow {
    pub fn new(line: usize, code: impl Into<RawCode>, description: &str) -> Self {
        Self {
            line,
            code: code.into(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityCodeRecord {
    pub code: String,
    pub description: String,
    pub description_en: Option<String>,
    pub category: String,
    pub section: Section,
    pub is_active: bool,
    pub vat_rate: f64,
    pub is_popular: bool,
    pub keywords: Vec<String>,
    pub related_codes: Vec<String>,
}

impl ActivityCodeRecord {
    /// Build the record an import writes for a freshly seen canonical code.
    pub fn from_import(code: &str, description: &str, vat_rate: f64) -> Self {
        let section = crate::sections::classify(code);
        Self {
            code: code.to_string(),
            description: description.to_string(),
            description_en: None,
            category: section.title().to_string(),
            section,
            is_active: true,
            vat_rate,
            is_popular: false,
            keywords: extract_keywords(description),
            related_codes: Vec::new(),
        }
    }
}

const MAX_KEYWORDS: usize = 10;

/// Lowercased words of at least four letters, in first-seen order.
pub fn extract_keywords(description: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in description.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().filter(|c| c.is_alphabetic()).count() < 4 {
            continue;
        }
        let word = word.to_lowercase();
        if !keywords.contains(&word) {
            keywords.push(word);
        }
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    keywords
}
