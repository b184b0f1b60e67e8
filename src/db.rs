use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{KadError, Result};
use crate::models::ActivityCodeRecord;
use crate::normalizer::Policy;
use crate::sections::Section;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS activity_codes (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    description_en TEXT,
    category TEXT NOT NULL,
    section TEXT NOT NULL,
    is_active INTEGER DEFAULT 1,
    vat_rate REAL NOT NULL,
    is_popular INTEGER DEFAULT 0,
    keywords TEXT NOT NULL DEFAULT '[]',
    related_codes TEXT NOT NULL DEFAULT '[]',
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT,
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_activity_codes_section ON activity_codes(section);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    source_kind TEXT NOT NULL,
    policy TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    inserted INTEGER,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const POLICY_KEY: &str = "normalization_policy";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .optional()?)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

pub fn pinned_policy(conn: &Connection) -> Result<Option<Policy>> {
    get_metadata(conn, POLICY_KEY)?
        .map(|v| v.parse::<Policy>())
        .transpose()
}

/// Fails if the database already holds codes built with a different policy.
pub fn ensure_policy(conn: &Connection, policy: Policy) -> Result<()> {
    match pinned_policy(conn)? {
        Some(pinned) if pinned != policy => Err(KadError::PolicyMismatch {
            pinned: pinned.to_string(),
            requested: policy.to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn pin_policy(conn: &Connection, policy: Policy) -> Result<()> {
    if pinned_policy(conn)?.is_none() {
        set_metadata(conn, POLICY_KEY, policy.key())?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

pub fn import_exists(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

pub struct NewImport<'a> {
    pub filename: &'a str,
    pub source_kind: &'a str,
    pub policy: Policy,
    pub record_count: usize,
    pub checksum: &'a str,
}

pub fn record_import(conn: &Connection, import: &NewImport) -> Result<i64> {
    conn.execute(
        "INSERT INTO imports (filename, source_kind, policy, record_count, inserted, checksum) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        rusqlite::params![
            import.filename,
            import.source_kind,
            import.policy.key(),
            import.record_count as i64,
            import.checksum,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_import(conn: &Connection, import_id: i64, inserted: usize) -> Result<()> {
    conn.execute(
        "UPDATE imports SET inserted = ?1 WHERE id = ?2",
        rusqlite::params![inserted as i64, import_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Activity codes
// ---------------------------------------------------------------------------

const RECORD_COLUMNS: &str = "code, description, description_en, category, section, is_active, \
                              vat_rate, is_popular, keywords, related_codes";

fn record_from_row(row: &Row) -> rusqlite::Result<ActivityCodeRecord> {
    let section: String = row.get(4)?;
    let section = section.parse::<Section>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ActivityCodeRecord {
        code: row.get(0)?,
        description: row.get(1)?,
        description_en: row.get(2)?,
        category: row.get(3)?,
        section,
        is_active: row.get(5)?,
        vat_rate: row.get(6)?,
        is_popular: row.get(7)?,
        keywords: json_list(row, 8)?,
        related_codes: json_list(row, 9)?,
    })
}

fn json_list(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn code_exists(conn: &Connection, code: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM activity_codes WHERE code = ?1")?;
    Ok(stmt.exists([code])?)
}

pub fn insert_code(conn: &Connection, record: &ActivityCodeRecord, import_id: Option<i64>) -> Result<()> {
    conn.execute(
        "INSERT INTO activity_codes (code, description, description_en, category, section, is_active, \
         vat_rate, is_popular, keywords, related_codes, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            record.code,
            record.description,
            record.description_en,
            record.category,
            record.section.to_string(),
            record.is_active,
            record.vat_rate,
            record.is_popular,
            serde_json::to_string(&record.keywords)?,
            serde_json::to_string(&record.related_codes)?,
            import_id,
        ],
    )?;
    Ok(())
}

pub fn get_code(conn: &Connection, code: &str) -> Result<Option<ActivityCodeRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM activity_codes WHERE code = ?1");
    Ok(conn.query_row(&sql, [code], record_from_row).optional()?)
}

pub fn list_codes(
    conn: &Connection,
    section: Option<Section>,
    include_inactive: bool,
) -> Result<Vec<ActivityCodeRecord>> {
    let mut sql = format!("SELECT {RECORD_COLUMNS} FROM activity_codes WHERE 1 = 1");
    if !include_inactive {
        sql.push_str(" AND is_active = 1");
    }
    if section.is_some() {
        sql.push_str(" AND section = ?1");
    }
    sql.push_str(" ORDER BY code");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match section {
        Some(s) => stmt
            .query_map([s.to_string()], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Fields an admin may change on an existing record. `None` leaves the field as is.
#[derive(Debug, Default, Clone)]
pub struct CodeUpdate {
    pub description: Option<String>,
    pub description_en: Option<String>,
    pub vat_rate: Option<f64>,
    pub is_popular: Option<bool>,
    pub related_codes: Option<Vec<String>>,
}

pub fn update_code(conn: &Connection, code: &str, update: &CodeUpdate) -> Result<ActivityCodeRecord> {
    let mut record = get_code(conn, code)?.ok_or_else(|| KadError::UnknownCode(code.to_string()))?;

    if let Some(description) = &update.description {
        record.keywords = crate::models::extract_keywords(description);
        record.description = description.clone();
    }
    if let Some(description_en) = &update.description_en {
        record.description_en = Some(description_en.clone());
    }
    if let Some(vat_rate) = update.vat_rate {
        record.vat_rate = vat_rate;
    }
    if let Some(is_popular) = update.is_popular {
        record.is_popular = is_popular;
    }
    if let Some(related) = &update.related_codes {
        record.related_codes = related.clone();
    }

    conn.execute(
        "UPDATE activity_codes SET description = ?1, description_en = ?2, vat_rate = ?3, \
         is_popular = ?4, keywords = ?5, related_codes = ?6, updated_at = datetime('now') \
         WHERE code = ?7",
        rusqlite::params![
            record.description,
            record.description_en,
            record.vat_rate,
            record.is_popular,
            serde_json::to_string(&record.keywords)?,
            serde_json::to_string(&record.related_codes)?,
            code,
        ],
    )?;
    Ok(record)
}

/// Returns false when the record already had the requested state.
pub fn set_active(conn: &Connection, code: &str, active: bool) -> Result<bool> {
    let current: Option<bool> = conn
        .query_row(
            "SELECT is_active FROM activity_codes WHERE code = ?1",
            [code],
            |r| r.get(0),
        )
        .optional()?;
    match current {
        None => Err(KadError::UnknownCode(code.to_string())),
        Some(state) if state == active => Ok(false),
        Some(_) => {
            conn.execute(
                "UPDATE activity_codes SET is_active = ?1, updated_at = datetime('now') WHERE code = ?2",
                rusqlite::params![active, code],
            )?;
            Ok(true)
        }
    }
}

pub struct DbStats {
    pub codes: i64,
    pub active: i64,
    pub imports: i64,
    pub per_section: Vec<(Section, i64)>,
}

pub fn stats(conn: &Connection) -> Result<DbStats> {
    let codes: i64 = conn.query_row("SELECT count(*) FROM activity_codes", [], |r| r.get(0))?;
    let active: i64 = conn.query_row(
        "SELECT count(*) FROM activity_codes WHERE is_active = 1",
        [],
        |r| r.get(0),
    )?;
    let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT section, count(*) FROM activity_codes GROUP BY section ORDER BY section",
    )?;
    let per_section = stmt
        .query_map([], |row| {
            let section = row.get::<_, String>(0)?.parse::<Section>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok((section, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(DbStats {
        codes,
        active,
        imports,
        per_section,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn sample(code: &str) -> ActivityCodeRecord {
        ActivityCodeRecord::from_import(code, "Χονδρικό εμπόριο ηλεκτρικών ειδών", 24.0)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["activity_codes", "imports", "metadata"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        let rec = get_code(&conn, "46.43.10").unwrap().unwrap();
        assert_eq!(rec, sample("46.43.10"));
        assert!(get_code(&conn, "46.43.11").unwrap().is_none());
    }

    #[test]
    fn test_code_is_unique() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        assert!(matches!(insert_code(&conn, &sample("46.43.10"), None), Err(KadError::Db(_))));
        assert!(code_exists(&conn, "46.43.10").unwrap());
    }

    #[test]
    fn test_list_codes_filters() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        insert_code(&conn, &sample("01.11.00"), None).unwrap();
        insert_code(&conn, &sample("10.00.00"), None).unwrap();
        set_active(&conn, "10.00.00", false).unwrap();

        let all = list_codes(&conn, None, true).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].code, "01.11.00");

        let active = list_codes(&conn, None, false).unwrap();
        assert_eq!(active.len(), 2);

        let g = list_codes(&conn, Some(Section::G), false).unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g[0].code, "46.43.10");
    }

    #[test]
    fn test_update_code_rederives_keywords() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        let update = CodeUpdate {
            description: Some("Χονδρικό εμπόριο φωτογραφικών ειδών".to_string()),
            vat_rate: Some(13.0),
            is_popular: Some(true),
            related_codes: Some(vec!["46.43.20".to_string()]),
            ..Default::default()
        };
        let rec = update_code(&conn, "46.43.10", &update).unwrap();
        assert!(rec.keywords.contains(&"φωτογραφικών".to_string()));
        let stored = get_code(&conn, "46.43.10").unwrap().unwrap();
        assert_eq!(stored.vat_rate, 13.0);
        assert!(stored.is_popular);
        assert_eq!(stored.related_codes, vec!["46.43.20"]);
        assert_eq!(stored.description_en, None);
    }

    #[test]
    fn test_update_unknown_code() {
        let (_dir, conn) = test_db();
        let err = update_code(&conn, "99.99", &CodeUpdate::default()).unwrap_err();
        assert!(matches!(err, KadError::UnknownCode(_)));
    }

    #[test]
    fn test_set_active_reports_change() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        assert!(!set_active(&conn, "46.43.10", true).unwrap());
        assert!(set_active(&conn, "46.43.10", false).unwrap());
        assert!(!get_code(&conn, "46.43.10").unwrap().unwrap().is_active);
        assert!(matches!(set_active(&conn, "00.00", false), Err(KadError::UnknownCode(_))));
    }

    #[test]
    fn test_policy_pinning() {
        let (_dir, conn) = test_db();
        assert_eq!(pinned_policy(&conn).unwrap(), None);
        ensure_policy(&conn, Policy::Pad6).unwrap();
        pin_policy(&conn, Policy::Pad6).unwrap();
        pin_policy(&conn, Policy::Grouped).unwrap();
        assert_eq!(pinned_policy(&conn).unwrap(), Some(Policy::Pad6));
        assert!(matches!(
            ensure_policy(&conn, Policy::Grouped),
            Err(KadError::PolicyMismatch { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        insert_code(&conn, &sample("46.44.00"), None).unwrap();
        insert_code(&conn, &sample("01.11.00"), None).unwrap();
        let s = stats(&conn).unwrap();
        assert_eq!(s.codes, 3);
        assert_eq!(s.active, 3);
        assert_eq!(s.imports, 0);
        assert_eq!(s.per_section, vec![(Section::A, 1), (Section::G, 2)]);
    }

    #[test]
    fn test_corrupt_json_column_is_an_error() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        conn.execute("UPDATE activity_codes SET keywords = 'not json' WHERE code = '46.43.10'", [])
            .unwrap();
        assert!(matches!(get_code(&conn, "46.43.10"), Err(KadError::Db(_))));
    }

    #[test]
    fn test_stats_reports_corrupt_section() {
        let (_dir, conn) = test_db();
        insert_code(&conn, &sample("46.43.10"), None).unwrap();
        conn.execute("UPDATE activity_codes SET section = 'Z'", []).unwrap();
        assert!(matches!(stats(&conn), Err(KadError::Db(_))));
    }
}
