//! Lookup index and run statistics of one kind.
//!
//! The index maps each output page (numbered from 1) to the lookup keys of its
//! items, so a consumer can find the page holding an item without loading every
//! page. It is built from the finished pages only; the engine never mutates it.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::project::OutputItem;
use crate::query::PageSize;
use crate::reference::Kind;

/// Extracts the lookup key of an item. Items without a key are left out of the index.
pub trait LookupKeyFn: Send + Sync {
    fn key(&self, item: &OutputItem) -> Option<String>;
}

impl<F> LookupKeyFn for F
where
    F: Fn(&OutputItem) -> Option<String> + Send + Sync,
{
    fn key(&self, item: &OutputItem) -> Option<String> {
        self(item)
    }
}

/// Default key: the item's slug.
pub struct SlugKey;

impl LookupKeyFn for SlugKey {
    fn key(&self, item: &OutputItem) -> Option<String> {
        (!item.slug.is_empty()).then(|| item.slug.clone())
    }
}

/// Counters collected while one kind is paginated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records returned by the store.
    pub found: usize,
    /// Items written to output pages.
    pub used: usize,
    pub deprecated: usize,
    pub duplicates: usize,
    /// Source pages that yielded items.
    pub source_pages: usize,
    /// Source pages whose records were all filtered out.
    pub skipped_pages: usize,
    /// Output was cut short by the file limit.
    pub truncated: bool,
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "posts found: {}, posts used: {}, deprecated: {}, duplicates: {}",
            self.found, self.used, self.deprecated, self.duplicates
        )?;
        if self.truncated {
            f.write_str(" (truncated)")?;
        }
        Ok(())
    }
}

/// Cross-reference index of one kind, written as `<kind>-index.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunIndex {
    pub post_type: String,
    pub found_posts: usize,
    pub max_pages: usize,
    pub page_size: PageSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<usize>,
    pub pages: BTreeMap<usize, Vec<String>>,
}

/// Build the index of a kind from its output pages.
///
/// `found_posts` counts the keys that made it into the index, after filtering.
/// Filter counters are only reported for versioned kinds, the only ones the
/// deprecation and duplicate checks are meaningful for.
pub fn build_index<K>(
    kind: &Kind,
    pages: &[Vec<OutputItem>],
    key_fn: &K,
    stats: &RunStats,
    page_size: PageSize,
) -> RunIndex
where
    K: LookupKeyFn + ?Sized,
{
    let pages: BTreeMap<usize, Vec<String>> = pages
        .iter()
        .enumerate()
        .map(|(i, page)| (i + 1, page.iter().filter_map(|item| key_fn.key(item)).collect()))
        .collect();

    let (deprecated, duplicates) = if kind.is_versioned() {
        (Some(stats.deprecated), Some(stats.duplicates))
    } else {
        (None, None)
    };

    RunIndex {
        post_type: kind.content_type.clone(),
        found_posts: pages.values().map(Vec::len).sum(),
        max_pages: pages.len(),
        page_size,
        deprecated,
        duplicates,
        pages,
    }
}
