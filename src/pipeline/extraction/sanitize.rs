/// Normalize extracted text before classification and field extraction.
///
/// Folds typographic quotes and dashes to ASCII, turns NBSP into a space,
/// drops control characters, collapses runs of spaces/tabs and removes
/// blank lines. Line structure is preserved; layout patterns rely on it.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\t' => Some(' '),
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' => Some('\''),
            '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{2033}' => Some('"'),
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => Some('-'),
            '\u{FEFF}' | '\u{FFFD}' | '\u{200B}' => None,
            '\r' => Some('\n'),
            c if c.is_control() && c != '\n' => None,
            c => Some(c),
        })
        .collect::<String>()
        .lines()
        .map(collapse_spaces)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse whitespace runs to a single space and trim.
pub fn collapse_spaces(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}
