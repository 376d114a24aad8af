//! Text canonicalisation shared by page text and employee names.
//!
//! Matching only ever compares normalized strings, so both sides must go
//! through [`normalize`]. The transformation is deliberately narrow: runs of
//! whitespace become one space, the ends are trimmed, and everything is
//! upper-cased. Accents and punctuation are kept as they are, which means a
//! name stored as "JOÃO" will not match a page that prints "JOAO".

/// Normalize extracted text or a candidate name for comparison.
///
/// Absent or empty input yields an empty string. Never fails.
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    text.split(is_separator)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Unicode whitespace plus the ASCII information separators (U+001C..U+001F),
/// which some PDF producers emit between fields.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}
