//! Small pure functions shared by the account and file handlers.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"));

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Loose shape check: something@something.tld with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Lowercased text after the last `.` of `file_name`, or an empty string when the
/// name has no extension.
pub fn file_extension(file_name: &str) -> String {
    let base = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// An empty allow-list accepts every extension.
pub fn is_allowed_extension(extension: &str, allowed: &[String]) -> bool {
    allowed.is_empty() || allowed.iter().any(|a| a == extension)
}

/// Human readable size in base 1024, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    // 1023.995 KB prints as 1024 KB unless rounding can carry into the next unit.
    if (value * 100.0).round() / 100.0 >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// sanitize_file_name
///
/// Keeps only the last meaningful path segment of a client-supplied name so the
/// resulting object key can never climb out of the bucket root.
pub fn sanitize_file_name(name: &str) -> String {
    name.split(|c| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .last()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Object key for a fresh upload: `{unix_millis}_{sanitised name}`.
pub fn object_key_for(original_name: &str, unix_millis: i64) -> String {
    let name = sanitize_file_name(original_name);
    let name = if name.is_empty() { "file".to_string() } else { name };
    format!("{}_{}", unix_millis, name)
}
