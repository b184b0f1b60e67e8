use thiserror::Error;

#[derive(Error, Debug)]
pub enum KadError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Unknown normalization policy: {0} (expected grouped, pad6 or truncate6)")]
    UnknownPolicy(String),

    #[error("Database was populated with policy '{pinned}', refusing to import with '{requested}'")]
    PolicyMismatch { pinned: String, requested: String },

    #[error("Unknown activity code: {0}")]
    UnknownCode(String),

    #[error("{0} collision group(s) need review; re-run with --accept-collisions to import anyway")]
    CollisionsPending(usize),

    #[error("Invalid {kind}: {source}")]
    InvalidId {
        kind: &'static str,
        #[source]
        source: IdError,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KadError>;

/// Why a raw code could not be canonicalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("InvalidCodeLength: {digits} digit(s), expected 4 to 8")]
    InvalidCodeLength { digits: usize },

    #[error("NonNumeric: {0:?}")]
    NonNumeric(String),
}

/// Why a Greek tax number or IBAN failed its format check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("expected {expected} characters, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("must contain only digits after the prefix")]
    NotDigits,

    #[error("must not be all zeros")]
    AllZeros,

    #[error("check digit does not match")]
    Checksum,

    #[error("expected country prefix {0}")]
    WrongCountry(&'static str),
}
