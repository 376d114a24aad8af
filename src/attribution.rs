//! Page-to-employee attribution.
//!
//! A page belongs to the first candidate whose normalized name occurs as a
//! contiguous substring of the normalized page text. Candidates are tried in
//! the order supplied and scanning stops at the first hit, so the result is
//! deterministic for a given order but not necessarily the "best" match: with
//! both "ANA" and "ANA SILVA" selected, whichever comes first wins a page
//! that mentions "ANA SILVA".

use crate::normalize::normalize;
use std::fmt;

/// Default number of characters kept from an unattributed page.
pub const PREVIEW_CHARS: usize = 100;

/// What the engine read from a page that nobody claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagePreview {
    /// The leading characters of the normalized page text.
    Text { text: String, truncated: bool },
    /// Normalized text was empty (blank page or image-only scan).
    NoText,
}

impl PagePreview {
    /// Build a preview from already-normalized text.
    pub fn from_normalized(text: &str, max_chars: usize) -> Self {
        if text.is_empty() {
            return PagePreview::NoText;
        }
        let mut chars = text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        PagePreview::Text {
            text: head,
            truncated: chars.next().is_some(),
        }
    }
}

impl fmt::Display for PagePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagePreview::Text { text, truncated } => {
                write!(f, "{text}")?;
                if *truncated {
                    write!(f, "...")?;
                }
                Ok(())
            }
            PagePreview::NoText => write!(f, "(empty page or image, no text extracted)"),
        }
    }
}

/// Outcome of attributing one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// The page belongs to this candidate (name as supplied, not normalized).
    Owner(String),
    /// No candidate's name was found on the page.
    Unattributed(PagePreview),
}

impl Attribution {
    pub fn owner(&self) -> Option<&str> {
        match self {
            Attribution::Owner(name) => Some(name),
            Attribution::Unattributed(_) => None,
        }
    }
}

/// Decide which candidate, if any, owns a page.
///
/// `page_text` is the raw extracted text; `None` stands for a page where
/// extraction produced nothing. Uses a preview of [`PREVIEW_CHARS`].
pub fn attribute<S: AsRef<str>>(page_text: Option<&str>, candidates: &[S]) -> Attribution {
    attribute_with_preview(page_text, candidates, PREVIEW_CHARS)
}

/// [`attribute`] with a caller-chosen preview length.
pub fn attribute_with_preview<S: AsRef<str>>(
    page_text: Option<&str>,
    candidates: &[S],
    preview_chars: usize,
) -> Attribution {
    let text = normalize(page_text);

    for candidate in candidates {
        let name = normalize(Some(candidate.as_ref()));
        // An empty needle would match every page.
        if name.is_empty() {
            continue;
        }
        if text.contains(&name) {
            return Attribution::Owner(candidate.as_ref().to_string());
        }
    }

    Attribution::Unattributed(PagePreview::from_normalized(&text, preview_chars))
}
