use crate::db::{get_connection, pinned_policy, stats};
use crate::error::Result;
use crate::fmt::{format_bytes, rate};
use crate::settings::{load_settings, DB_FILE};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Policy:     {}", settings.policy);
    println!("VAT rate:   {}", rate(settings.default_vat_rate));

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        match pinned_policy(&conn)? {
            Some(p) => println!("Pinned to:  {p}"),
            None => println!("Pinned to:  (nothing imported yet)"),
        }

        let s = stats(&conn)?;
        println!();
        println!("Codes:      {}", s.codes);
        println!("Active:     {}", s.active);
        println!("Imports:    {}", s.imports);
        for (section, count) in &s.per_section {
            println!("  {section}  {count:>6}  {}", section.title_en());
        }
    } else {
        println!();
        println!("Database not found. Run `kad init` to set up.");
    }

    Ok(())
}
