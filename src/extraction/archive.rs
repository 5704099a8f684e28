//! ZIP archive extractor.
//!
//! An archive yields one result per extractable entry, lazily and in entry
//! order. Each entry is routed the same way a standalone file would be:
//! extension first, content sniffing only for extension-less names. Entries
//! no extractor claims are skipped, not errored. Nested archives recurse,
//! up to a fixed depth.

use std::collections::VecDeque;
use std::io::Cursor;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::core::router;
use crate::error::{DocsieveError, Result};
use crate::extraction::{ContentStream, Extractor};
use crate::guards::archive::{ArchiveLimits, open_guarded, read_guarded};
use crate::types::DocumentContent;

/// How many archive-in-archive levels are followed before giving up.
const MAX_NESTING: usize = 4;

pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract<'a>(&self, data: &'a [u8], _path_hint: Option<&str>) -> Result<ContentStream<'a>> {
        stream_entries(data, 0)
    }
}

fn stream_entries(data: &[u8], depth: usize) -> Result<ContentStream<'_>> {
    let archive = open_guarded(data, &ArchiveLimits::DEFAULT)?;
    Ok(ContentStream::from_iter(Entries {
        archive,
        index: 0,
        depth,
        pending: VecDeque::new(),
    }))
}

/// Forward-only walk over an archive's entries.
///
/// Entries are processed one at a time as the caller pulls; an entry that
/// itself contains several results (a nested mbox, a nested archive) parks
/// them in `pending` and hands them out before the walk advances.
struct Entries<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    index: usize,
    depth: usize,
    pending: VecDeque<Result<DocumentContent>>,
}

impl Entries<'_> {
    /// Extract one entry into `pending`. Unclaimed entries contribute
    /// nothing.
    fn process_entry(&mut self, index: usize) -> Result<()> {
        let (name, declared, is_dir) = {
            let entry = self.archive.by_index_raw(index)?;
            (entry.name().to_string(), entry.size(), entry.is_dir())
        };
        if is_dir {
            return Ok(());
        }

        let has_extension = std::path::Path::new(&name).extension().is_some();
        let route = match router::file_type_for_path(&name) {
            Some(router::FileType::Zip) => Route::Nested,
            Some(file_type) => match router::resolve_type(file_type) {
                Some(extractor) => Route::Registered(extractor),
                None => Route::Skip,
            },
            // Unknown extensions are final; only extension-less entries get
            // a content sniff after reading.
            None if has_extension => Route::Skip,
            None => Route::Sniff,
        };
        if matches!(route, Route::Skip) {
            debug!(entry = %name, "skipping unclaimed archive entry");
            return Ok(());
        }

        let bytes = {
            let entry = self.archive.by_index(index)?;
            read_guarded(entry, declared, &ArchiveLimits::DEFAULT)?
        };

        let stream = match route {
            Route::Nested => {
                if self.depth + 1 >= MAX_NESTING {
                    warn!(entry = %name, depth = self.depth, "archive nesting limit reached");
                    return Err(DocsieveError::resource_limit(format!(
                        "archive nesting exceeds {MAX_NESTING} levels at entry '{name}'"
                    )));
                }
                stream_entries(&bytes, self.depth + 1)
            }
            Route::Registered(extractor) => extractor.extract(&bytes, Some(&name)),
            Route::Sniff => crate::core::extractor::extract_bytes(&bytes, None),
            Route::Skip => unreachable!(),
        };
        match stream {
            Ok(stream) => self.pending.extend(stream),
            Err(DocsieveError::UnsupportedFormat(_)) => {
                debug!(entry = %name, "entry content not recognized, skipping");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

enum Route {
    Registered(&'static dyn Extractor),
    Nested,
    Sniff,
    Skip,
}

impl Iterator for Entries<'_> {
    type Item = Result<DocumentContent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.index >= self.archive.len() {
                return None;
            }
            let index = self.index;
            self.index += 1;
            if let Err(e) = self.process_entry(index) {
                return Some(Err(e));
            }
        }
    }
}
