//! File emitter: writes the pages and the index of a kind through the session's
//! [`FileStore`].
//!
//! Paginated kinds produce `<kind>-<n>.json` for every page plus
//! `<kind>-index.json`. Unbounded kinds produce a single `<kind>.json` and no
//! index. The first failed write is returned; nothing after it is attempted.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::contract::FileStore;
use crate::index::RunIndex;
use crate::project::OutputItem;
use crate::query::PageSize;
use crate::reference::Kind;

/// Per-kind fields repeated at the top of every page file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KindMetadata {
    Versioned { version: String, url: String },
    Generic { post_type: String, url: String },
}

impl KindMetadata {
    /// Versioned kinds link to `<reference_url>/<segment>`, generic kinds to the site.
    pub fn for_kind(kind: &Kind, version: &str, reference_url: &str, site_url: Option<&str>) -> Self {
        if kind.is_versioned() {
            KindMetadata::Versioned {
                version: version.to_string(),
                url: format!("{}/{}", reference_url.trim_end_matches('/'), kind.url_segment()),
            }
        } else {
            KindMetadata::Generic {
                post_type: kind.content_type.clone(),
                url: site_url.unwrap_or_default().to_string(),
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageFile<'a> {
    #[serde(flatten)]
    meta: &'a KindMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    found_posts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<usize>,
    content: &'a [OutputItem],
}

#[derive(Serialize)]
struct VersionFile<'a> {
    version: &'a str,
}

/// A failed write, with the file it was meant for.
#[derive(Debug)]
pub struct EmitError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// Replace every character outside `[A-Za-z0-9._-]` with `-`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// File name of page `page` of `label`; `None` for an unbounded kind.
pub fn page_file_name(label: &str, page: Option<usize>) -> String {
    match page {
        Some(n) => sanitize_file_name(&format!("{label}-{n}.json")),
        None => sanitize_file_name(&format!("{label}.json")),
    }
}

pub fn index_file_name(label: &str) -> String {
    sanitize_file_name(&format!("{label}-index.json"))
}

fn write_json<T: Serialize>(store: &dyn FileStore, path: PathBuf, value: &T) -> Result<PathBuf, EmitError> {
    let bytes = serde_json::to_vec(value).map_err(|e| EmitError {
        path: path.clone(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;
    match store.put_contents(&path, &bytes) {
        Ok(()) => {
            debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
            Ok(path)
        }
        Err(source) => {
            error!(error = ?source, path = %path.display(), "[EXPORT] Failed to write file");
            Err(EmitError { path, source })
        }
    }
}

/// Write the files of one kind into `dir` and return their paths in write order.
pub fn emit_kind(
    store: &dyn FileStore,
    dir: &Path,
    kind: &Kind,
    meta: &KindMetadata,
    pages: &[Vec<OutputItem>],
    index: &RunIndex,
    page_size: PageSize,
) -> Result<Vec<PathBuf>, EmitError> {
    let mut written = Vec::new();

    if page_size.is_unbounded() {
        let content: &[OutputItem] = pages.first().map(Vec::as_slice).unwrap_or_default();
        let file = PageFile {
            meta,
            found_posts: None,
            max_pages: None,
            page: None,
            content,
        };
        written.push(write_json(store, dir.join(page_file_name(&kind.label, None)), &file)?);
    } else {
        for (i, page) in pages.iter().enumerate() {
            let number = i + 1;
            let file = PageFile {
                meta,
                found_posts: Some(index.found_posts),
                max_pages: Some(index.max_pages),
                page: Some(number),
                content: page,
            };
            written.push(write_json(
                store,
                dir.join(page_file_name(&kind.label, Some(number))),
                &file,
            )?);
        }
        written.push(write_json(store, dir.join(index_file_name(&kind.label)), index)?);
    }

    info!(kind = %kind.label, files = written.len(), "[EXPORT] Emitted kind files");
    Ok(written)
}

/// Write `version.json`.
pub fn emit_version(store: &dyn FileStore, dir: &Path, version: &str) -> Result<PathBuf, EmitError> {
    write_json(store, dir.join("version.json"), &VersionFile { version })
}
