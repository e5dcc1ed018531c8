//! Compact output rendering helpers for CLI surfaces.

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Abbreviated hash for table cells: first 8 hex chars, or a placeholder when
/// no hash is available yet.
pub fn short_hash(hash: Option<&str>) -> String {
    match hash {
        Some(h) if h.len() >= 8 => format!("{}…", &h[..8]),
        Some(h) => h.to_string(),
        None => "-".to_string(),
    }
}
