//! Table formatting utilities for CLI output.

/// Truncates `s` to at most `max_chars` characters, adding "..." if needed.
///
/// Line breaks are flattened to spaces so previews stay on one row.
///
/// # Examples
///
/// ```rust
/// use readaloud_cli::presentation::preview;
///
/// assert_eq!(preview("Hello", 10), "Hello");
/// assert_eq!(preview("Hello World", 8), "Hello...");
/// assert_eq!(preview("Xin chào thế giới", 11), "Xin chào...");
/// ```
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let kept: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Format an optional value for table display, returning a default if None.
pub fn format_optional<T: std::fmt::Display>(value: Option<&T>, default: &str) -> String {
    value.map_or_else(|| default.to_string(), ToString::to_string)
}

/// A fixed-width text progress bar, e.g. `[#####-----]`.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = usize::from(percent.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_counts_characters_not_bytes() {
        assert_eq!(preview("Đọc truyện", 10), "Đọc truyện");
        assert_eq!(preview("Đọc truyện hay", 10), "Đọc tru...");
    }

    #[test]
    fn preview_flattens_newlines() {
        assert_eq!(preview("one\ntwo", 20), "one two");
    }

    #[test]
    fn format_optional_uses_default() {
        assert_eq!(format_optional::<String>(None, "(engine default)"), "(engine default)");
        assert_eq!(format_optional(Some(&"voice".to_string()), "-"), "voice");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0, 4), "[----]");
        assert_eq!(progress_bar(50, 4), "[##--]");
        assert_eq!(progress_bar(100, 4), "[####]");
        assert_eq!(progress_bar(250, 4), "[####]");
    }
}
