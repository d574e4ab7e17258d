// Output formatting: terminal display and report generation.

pub mod markdown;
pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Respects UTF-8 character boundaries, so article titles with accents or
/// emoji never panic the way byte slicing would.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Coefficient as text, or "insufficient data" when undefined.
pub fn format_coefficient(coefficient: Option<f64>) -> String {
    match coefficient {
        Some(r) => format!("{r:+.3}"),
        None => "insufficient data".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("Zürich café", 6), "Zürich...");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_format_coefficient() {
        assert_eq!(format_coefficient(Some(0.5)), "+0.500");
        assert_eq!(format_coefficient(None), "insufficient data");
    }
}
