//! Formatting helpers for log lines and reports.

/// Compact count with K/M suffix.
///
/// # Examples
/// ```
/// use cidrfold::utils::format_count;
/// assert_eq!(format_count(742), "742");
/// assert_eq!(format_count(12_400), "12.4K");
/// assert_eq!(format_count(2_500_000), "2.5M");
/// ```
pub fn format_count(count: usize) -> String {
    match count {
        c if c >= 1_000_000 => format!("{:.1}M", c as f64 / 1_000_000.0),
        c if c >= 1_000 => format!("{:.1}K", c as f64 / 1_000.0),
        c => c.to_string(),
    }
}

/// Count with thousands separators.
///
/// # Examples
/// ```
/// use cidrfold::utils::format_count_with_separator;
/// assert_eq!(format_count_with_separator(16_777_216), "16,777,216");
/// ```
pub fn format_count_with_separator(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Byte size in KB/MB/GB.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

/// Truncate to `max_len` characters, ending with "..." when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{}...", head)
}
