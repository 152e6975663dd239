//! File name utilities for stored attachments.
//!
//! ## Summary
//! Uploaded file names are user-controlled. Before one becomes part of a storage
//! key it is reduced to its final path component and a conservative character set.

/// Sanitize an uploaded file name for use inside a storage key.
///
/// Drops any directory components, replaces characters outside
/// `[A-Za-z0-9._-]` with hyphens, collapses repeated hyphens and strips leading
/// dots so the result can never be hidden or relative.
///
/// Examples:
/// - "Discharge Summary.pdf" -> "Discharge-Summary.pdf"
/// - "../../etc/passwd" -> "passwd"
/// - "  " -> "file"
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let sanitized = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized.to_string()
    }
}

/// Returns the lower-cased extension of `name` including the leading dot, or an
/// empty string when there is none.
///
/// Examples:
/// - "scan.PDF" -> ".pdf"
/// - "notes" -> ""
#[must_use]
pub fn file_extension(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}
