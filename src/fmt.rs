/// Format a VAT rate without trailing zeros: 24%, 13.5%
pub fn rate(val: f64) -> String {
    let s = format!("{val:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    format!("{s}%")
}

/// Human-readable file size: 512 B, 1.5 KB, 3.2 MB
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Cut a description to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}\u{2026}", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_formatting() {
        assert_eq!(rate(24.0), "24%");
        assert_eq!(rate(13.5), "13.5%");
        assert_eq!(rate(6.0), "6%");
        assert_eq!(rate(0.0), "0%");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Μεταποίηση", 20), "Μεταποίηση");
        assert_eq!(truncate("Καλλιέργεια σιτηρών", 12), "Καλλιέργεια\u{2026}");
    }
}
