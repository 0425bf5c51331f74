//! Page-number and formatting-remnant patterns.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines longer than this are never page numbers.
const MAX_PAGE_NUMBER_CHARS: usize = 20;

static PAGE_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\s*page\s+\d+\s*$",
        r"(?i)^\s*page\s+\d+\s+of\s+\d+\s*$",
        r"(?i)^\s*\d+\s+of\s+\d+\s*$",
        r"^\s*[-\u{2013}\u{2014}]{1,2}\s*\d+\s*[-\u{2013}\u{2014}]{1,2}\s*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid page number regex"))
    .collect()
});

/// Well-formed roman numerals; single letters are excluded separately.
static ROMAN_NUMERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^m{0,4}(cm|cd|d?c{0,3})(xc|xl|l?x{0,3})(ix|iv|v?i{0,3})$")
        .expect("valid roman numeral regex")
});

static PAGE_X_OF_Y: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)page\s+\d+\s+of\s+\d+").expect("valid page-of regex"));

static FORMATTING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Orphaned bullets.
        r"^\s*[\u{2022}\-\*\u{25E6}\u{25AA}\u{25AB}]\s*$",
        // Table borders.
        r"^[|\u{2500}\u{253C}\u{251C}\u{2524}\u{252C}\u{2534}\u{250C}\u{2510}\u{2514}\u{2518}\u{2502}]+$",
        // Punctuation runs.
        r"^[.,:;!?]{3,}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid formatting regex"))
    .collect()
});

static TRAILING_ELLIPSIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{3,}$").expect("valid ellipsis regex"));
static TRAILING_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,:;!?]{3,}$").expect("valid punctuation regex"));

/// Whether `text` contains a "Page X of Y" marker.
pub(crate) fn contains_page_x_of_y(text: &str) -> bool {
    PAGE_X_OF_Y.is_match(text)
}

/// Whether a trimmed line is a standalone page number.
pub(crate) fn is_page_number_line(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() || line.chars().count() > MAX_PAGE_NUMBER_CHARS {
        return false;
    }
    if PAGE_NUMBER_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(line))
    {
        return true;
    }
    line.chars().count() >= 2 && ROMAN_NUMERAL.is_match(line)
}

/// Collect page-number strings: "Page X of Y" markers inside detected footers, then every
/// standalone page-number line of `text`.
pub(crate) fn detect_page_numbers(text: &str, footers: &[String]) -> Vec<String> {
    let mut found: Vec<String> = footers
        .iter()
        .flat_map(|footer| PAGE_X_OF_Y.find_iter(footer))
        .map(|found| found.as_str().to_string())
        .collect();

    found.extend(
        text.split('\n')
            .filter(|line| is_page_number_line(line))
            .map(|line| line.trim().to_string()),
    );
    found
}

/// Blank every line that consists solely of `page_number`.
pub(crate) fn remove_page_number_lines(text: &str, page_number: &str) -> String {
    let pattern = format!(r"(?m)^[ \t]*{}[ \t]*$", regex::escape(page_number));
    match Regex::new(&pattern) {
        Ok(regex) => regex.replace_all(text, "").into_owned(),
        Err(error) => {
            tracing::warn!(error = %error, page_number, "Skipping unbuildable page-number pattern");
            text.to_string()
        }
    }
}

/// Drop lines made only of formatting glyphs and strip trailing punctuation runs.
pub(crate) fn clean_formatting_remnants(text: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            kept.push(line.to_string());
            continue;
        }
        if FORMATTING_PATTERNS
            .iter()
            .any(|pattern| pattern.is_match(trimmed))
        {
            continue;
        }
        let stripped = TRAILING_ELLIPSIS.replace(trimmed, "");
        let stripped = TRAILING_PUNCTUATION.replace(&stripped, "");
        kept.push(stripped.into_owned());
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_page_number_formats() {
        for line in [
            "Page 3",
            "page 3 of 10",
            "4 of 12",
            "- 7 -",
            "-- 7 --",
            "xii",
            "IV",
        ] {
            assert!(is_page_number_line(line), "expected page number: {line}");
        }
    }

    #[test]
    fn rejects_prose_and_single_letters() {
        for line in [
            "i",
            "V",
            "Page three",
            "Chapter 4 of the book is long",
            "did",
            "civic",
        ] {
            assert!(!is_page_number_line(line), "unexpected page number: {line}");
        }
    }

    #[test]
    fn extracts_markers_from_footers() {
        let footers = vec!["Lecture notes - Page 2 of 9".to_string()];
        let found = detect_page_numbers("Body text\nPage 4\nMore", &footers);
        assert_eq!(found, vec!["Page 2 of 9".to_string(), "Page 4".to_string()]);
    }

    #[test]
    fn removes_whole_page_number_lines_only() {
        let text = "Intro\n  Page 4  \nSee Page 4 for details";
        assert_eq!(
            remove_page_number_lines(text, "Page 4"),
            "Intro\n\nSee Page 4 for details"
        );
    }

    #[test]
    fn drops_orphaned_bullets_and_borders() {
        let text = "Content\n\u{2022}\nMore content\n\u{2500}\u{2500}\u{253C}\u{2500}\n|||\n...";
        assert_eq!(clean_formatting_remnants(text), "Content\nMore content");
    }

    #[test]
    fn strips_trailing_punctuation_runs() {
        let text = "Wait for it.....\nReally?!?!\nFine.";
        assert_eq!(clean_formatting_remnants(text), "Wait for it\nReally\nFine.");
    }
}
