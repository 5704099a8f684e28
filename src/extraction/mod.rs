//! Format extractors and the streaming contract they share.
//!
//! An [`Extractor`] turns raw bytes into a [`ContentStream`] of results.
//! Most formats yield exactly one result; multi-item containers (mbox
//! mailboxes, ZIP archives) yield one result per contained item, produced
//! lazily in source order.

use crate::error::Result;
use crate::types::DocumentContent;

pub mod text;

#[cfg(feature = "archives")]
pub mod archive;
#[cfg(feature = "email")]
pub mod email;
#[cfg(feature = "html")]
pub mod html;
#[cfg(feature = "office")]
pub mod office;
#[cfg(feature = "office")]
pub mod opendoc;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "excel")]
pub mod spreadsheet;

/// A format backend: bytes in, a stream of typed results out.
///
/// Implementations run the relevant pre-parse guards themselves before any
/// structural parsing, so a caller holding an `Extractor` cannot bypass
/// them.
pub trait Extractor: Send + Sync {
    /// Extract all results from `data`.
    ///
    /// `path_hint` only seeds metadata; the file does not need to exist and
    /// no I/O is performed.
    fn extract<'a>(&self, data: &'a [u8], path_hint: Option<&str>) -> Result<ContentStream<'a>>;
}

/// Lazy, forward-only sequence of extraction results.
///
/// Items are produced on demand as the caller consumes them; nothing is
/// buffered ahead. The stream is not restartable: once exhausted it yields
/// `None`, and there is no way to rewind it. Collect into a `Vec` first if
/// repeated traversal is needed.
///
/// Per-item faults come through as `Err` items. A failed item does not
/// invalidate items already yielded; each item is whole or absent.
pub struct ContentStream<'a> {
    inner: Box<dyn Iterator<Item = Result<DocumentContent>> + 'a>,
}

impl<'a> ContentStream<'a> {
    /// Stream yielding a single already-built result.
    pub fn one(content: DocumentContent) -> Self {
        Self {
            inner: Box::new(std::iter::once(Ok(content))),
        }
    }

    /// Stream over lazily produced items.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DocumentContent>> + 'a,
    {
        Self { inner: Box::new(iter) }
    }

    /// Stream with no items.
    pub fn empty() -> Self {
        Self {
            inner: Box::new(std::iter::empty()),
        }
    }
}

impl std::fmt::Debug for ContentStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream").finish_non_exhaustive()
    }
}

impl Iterator for ContentStream<'_> {
    type Item = Result<DocumentContent>;

    /// Item errors are normalized here: taxonomy conditions pass through,
    /// anything else is wrapped as
    /// [`ExtractionFailed`](crate::DocsieveError::ExtractionFailed). This is
    /// the single boundary where generic wrapping happens.
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| item.map_err(|e| e.into_boundary_error()))
    }
}
