use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{KadError, NormalizeError};
use crate::models::RawCode;

pub const MIN_DIGITS: usize = 4;
pub const MAX_DIGITS: usize = 8;

/// How digit strings of different lengths are grouped into a dotted code.
///
/// A database is pinned to one policy the first time it is imported into;
/// see `db::pin_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Keep every digit: `XX.XX`, `XX.XXX`, `XX.XX.XX`, `XX.XX.XXX`, `XX.XX.XX.XX`.
    #[default]
    Grouped,
    /// Right-pad 4 and 5 digit codes with zeros to `XX.XX.XX`; longer codes as `Grouped`.
    Pad6,
    /// `XX.XX` from the first 4 digits below 6 digits, `XX.XX.XX` from the first 6 otherwise.
    Truncate6,
}

pub const ALL_POLICIES: &[Policy] = &[Policy::Grouped, Policy::Pad6, Policy::Truncate6];

impl Policy {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Grouped => "grouped",
            Self::Pad6 => "pad6",
            Self::Truncate6 => "truncate6",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Policy {
    type Err = KadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_POLICIES
            .iter()
            .find(|p| p.key().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| KadError::UnknownPolicy(s.to_string()))
    }
}

/// Strip whitespace and literal dots, leaving the digit string to canonicalize.
pub fn clean(raw: &RawCode) -> Result<String, NormalizeError> {
    let text = match raw {
        RawCode::Number(n) => {
            if !n.is_finite() || *n < 0.0 {
                return Err(NormalizeError::NonNumeric(n.to_string()));
            }
            if n.fract() == 0.0 {
                format!("{n:.0}")
            } else {
                n.to_string()
            }
        }
        RawCode::Text(s) => s.clone(),
    };

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();

    if cleaned.is_empty() {
        return Err(NormalizeError::InvalidCodeLength { digits: 0 });
    }
    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(NormalizeError::NonNumeric(text.trim().to_string()));
    }
    Ok(cleaned)
}

fn group(digits: &str, sizes: &[usize]) -> String {
    let mut parts = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for size in sizes {
        parts.push(&digits[start..start + size]);
        start += size;
    }
    parts.join(".")
}

/// Canonical dotted code for an already-cleaned digit string.
pub fn canonicalize(digits: &str, policy: Policy) -> Result<String, NormalizeError> {
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(NormalizeError::NonNumeric(digits.to_string()));
    }
    let len = digits.len();
    if !(MIN_DIGITS..=MAX_DIGITS).contains(&len) {
        return Err(NormalizeError::InvalidCodeLength { digits: len });
    }

    let code = match policy {
        Policy::Grouped => match len {
            4 => group(digits, &[2, 2]),
            5 => group(digits, &[2, 3]),
            6 => group(digits, &[2, 2, 2]),
            7 => group(digits, &[2, 2, 3]),
            _ => group(digits, &[2, 2, 2, 2]),
        },
        Policy::Pad6 => match len {
            4 | 5 => group(&format!("{digits:0<6}"), &[2, 2, 2]),
            6 => group(digits, &[2, 2, 2]),
            7 => group(digits, &[2, 2, 3]),
            _ => group(digits, &[2, 2, 2, 2]),
        },
        Policy::Truncate6 => match len {
            4 | 5 => group(&digits[..4], &[2, 2]),
            _ => group(&digits[..6], &[2, 2, 2]),
        },
    };
    debug_assert!(is_canonical(&code), "{digits} -> {code}");
    Ok(code)
}

/// Clean and canonicalize in one step.
pub fn normalize(raw: &RawCode, policy: Policy) -> Result<String, NormalizeError> {
    let digits = clean(raw)?;
    canonicalize(&digits, policy)
}

fn canonical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}(\.\d{2,4}){1,3}$").expect("static pattern"))
}

pub fn is_canonical(code: &str) -> bool {
    canonical_re().is_match(code)
}
