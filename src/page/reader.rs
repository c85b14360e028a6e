//! Page source abstraction.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::ReaderError;

use super::PageContent;

// ============================================================================
// PageReader
// ============================================================================

/// Blocking source of the page to convert.
///
/// Implementations may take hundreds of milliseconds (OS scripting,
/// file I/O). The converter always calls [`read_page`](Self::read_page)
/// on a blocking worker thread.
///
/// Any `Fn() -> Result<PageContent, ReaderError>` closure is a reader.
pub trait PageReader: Send + Sync + 'static {
    /// Reads the current page.
    ///
    /// # Errors
    ///
    /// Returns a [`ReaderError`] describing why no page was available.
    fn read_page(&self) -> Result<PageContent, ReaderError>;
}

impl<F> PageReader for F
where
    F: Fn() -> Result<PageContent, ReaderError> + Send + Sync + 'static,
{
    fn read_page(&self) -> Result<PageContent, ReaderError> {
        self()
    }
}

// ============================================================================
// SharedReader
// ============================================================================

/// Cloneable, type-erased [`PageReader`].
#[derive(Clone)]
pub struct SharedReader(Arc<dyn PageReader>);

impl SharedReader {
    /// Wraps a reader.
    #[inline]
    #[must_use]
    pub fn new(reader: impl PageReader) -> Self {
        Self(Arc::new(reader))
    }

    /// Reads the current page.
    ///
    /// # Errors
    ///
    /// Propagates the wrapped reader's error.
    #[inline]
    pub fn read_page(&self) -> Result<PageContent, ReaderError> {
        self.0.read_page()
    }
}

impl fmt::Debug for SharedReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReader").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_reader() {
        let reader = SharedReader::new(|| Ok(PageContent::new("https://a", "A", "body")));
        let page = reader.read_page().expect("read");
        assert_eq!(page.title(), "A");
    }

    #[test]
    fn test_reader_error_propagates() {
        let reader = SharedReader::new(|| Err(ReaderError::not_running("Safari")));
        assert_eq!(
            reader.read_page().unwrap_err().to_string(),
            "Safari is not running. Open a page in Safari and try again."
        );
    }

    #[test]
    fn test_shared_reader_clones_share_source() {
        let reader = SharedReader::new(|| Ok(PageContent::new("u", "t", "b")));
        let cloned = reader.clone();
        assert_eq!(reader.read_page(), cloned.read_page());
    }
}
