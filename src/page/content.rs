//! Page snapshot handed to the converter.

// ============================================================================
// Imports
// ============================================================================

use crate::error::ReaderError;

// ============================================================================
// Constants
// ============================================================================

/// Default cap on body length, in characters.
pub const DEFAULT_MAX_BODY_CHARS: usize = 60_000;

/// Title used when the reader returns a blank one.
const UNTITLED: &str = "Untitled";

// ============================================================================
// PageContent
// ============================================================================

/// Immutable page snapshot: source URL, title and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    url: String,
    title: String,
    body: String,
}

impl PageContent {
    /// Creates a page snapshot.
    ///
    /// A blank title is replaced with `Untitled`.
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            title
        };

        Self {
            url: url.into(),
            title,
            body: body.into(),
        }
    }

    /// Returns the source URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the page title.
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the body text.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the body length in characters.
    #[inline]
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.body.chars().count()
    }

    /// Rejects blank bodies and caps the body at `max_chars` characters.
    ///
    /// A capped body ends with a `[Content truncated at N characters]`
    /// marker.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::EmptyContent`] if the body is only whitespace.
    pub fn prepare(self, max_chars: usize) -> Result<Self, ReaderError> {
        if self.body.trim().is_empty() {
            return Err(ReaderError::EmptyContent);
        }

        let Some((cut, _)) = self.body.char_indices().nth(max_chars) else {
            return Ok(self);
        };

        let mut body = self.body;
        body.truncate(cut);
        body.push_str(&format!("\n\n[Content truncated at {max_chars} characters]"));

        Ok(Self { body, ..self })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_title_becomes_untitled() {
        let page = PageContent::new("https://a", "  ", "body");
        assert_eq!(page.title(), "Untitled");

        let page = PageContent::new("https://a", "Real", "body");
        assert_eq!(page.title(), "Real");
    }

    #[test]
    fn test_prepare_rejects_whitespace_body() {
        let page = PageContent::new("https://a", "T", " \n\t ");
        assert_eq!(page.prepare(100), Err(ReaderError::EmptyContent));
    }

    #[test]
    fn test_prepare_keeps_short_body() {
        let page = PageContent::new("https://a", "T", "hello");
        let prepared = page.clone().prepare(5).expect("prepare");
        assert_eq!(prepared, page);
    }

    #[test]
    fn test_prepare_truncates_by_chars() {
        let page = PageContent::new("https://a", "T", "héllo wörld");
        let prepared = page.prepare(4).expect("prepare");

        assert_eq!(prepared.body(), "héll\n\n[Content truncated at 4 characters]");
        assert_eq!(prepared.url(), "https://a");
    }

    #[test]
    fn test_char_count_counts_scalars() {
        let page = PageContent::new("u", "t", "日本語");
        assert_eq!(page.char_count(), 3);
    }
}
