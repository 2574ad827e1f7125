// src/utils/text.rs

//! Text normalization for scraped cell contents.

/// Collapse runs of whitespace (including NBSP) to single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `s` is an integer figure as displayed: ASCII digits, optionally
/// grouped with `,`. Percentages, decimals and signs never qualify.
pub fn is_plain_number(s: &str) -> bool {
    let stripped: String = s.trim().chars().filter(|&c| c != ',').collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  12월\n\t "), "12월");
        assert_eq!(normalize_whitespace("2025\u{a0}.\u{a0}12"), "2025 . 12");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_plain_number() {
        assert!(is_plain_number("256,598"));
        assert!(is_plain_number(" 1,230,456 "));
        assert!(is_plain_number("0"));
        assert!(!is_plain_number("7.0%"));
        assert!(!is_plain_number("7.0"));
        assert!(!is_plain_number("-1,234"));
        assert!(!is_plain_number("12월"));
        assert!(!is_plain_number(","));
        assert!(!is_plain_number(""));
    }
}
