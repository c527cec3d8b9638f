use std::sync::LazyLock;

use regex::Regex;

static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());
static EXCESS_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Normalize extracted text before chunking.
///
/// Line endings become `\n`, horizontal whitespace runs become one space,
/// three or more line breaks collapse to a blank line.
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = HORIZONTAL_WS.replace_all(&unified, " ");
    let trimmed_lines: Vec<&str> = spaced.split('\n').map(|l| l.trim()).collect();
    let joined = trimmed_lines.join("\n");
    EXCESS_NEWLINES.replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_horizontal_whitespace() {
        assert_eq!(normalize_text("a  \t b"), "a b");
    }

    #[test]
    fn collapses_blank_line_runs() {
        assert_eq!(normalize_text("para one\n\n\n\npara two"), "para one\n\npara two");
    }

    #[test]
    fn keeps_single_line_breaks() {
        assert_eq!(normalize_text("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn converts_crlf() {
        assert_eq!(normalize_text("a\r\nb\r\n\r\nc"), "a\nb\n\nc");
    }

    #[test]
    fn whitespace_only_becomes_empty() {
        assert_eq!(normalize_text(" \n\t \n "), "");
    }
}
