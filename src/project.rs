//! Filtering projector: raw records in, output items out.
//!
//! Records that are deprecated or that carry the store's auto-disambiguation
//! suffix are dropped and counted. The remaining records are reduced to a
//! title and a slug, then handed to the injected [`ItemTransform`].
//!
//! The result of a page is a [`FetchOutcome`]. A page whose records were *all*
//! dropped is [`FetchOutcome::Retry`], never an empty item list: the pagination
//! loop must keep going in that case, while an empty source page ends it.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

use crate::contract::Record;
use crate::index::RunStats;
use crate::reference::{is_hook_ref_type, Kind};

/// Minimal exported form of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputItem {
    pub title: String,
    pub slug: String,
    /// Extra fields added by an [`ItemTransform`], serialized next to title and slug.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutputItem {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            extra: Map::new(),
        }
    }
}

/// Result of projecting one source page.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Items(Vec<OutputItem>),
    /// Records were fetched but every one was filtered out; try the next page.
    Retry,
    /// The source page was empty.
    Exhausted,
}

/// Per-item hook applied after the title and slug are extracted.
pub trait ItemTransform: Send + Sync {
    fn transform(&self, record: &Record, item: OutputItem) -> OutputItem;
}

impl<F> ItemTransform for F
where
    F: Fn(&Record, OutputItem) -> OutputItem + Send + Sync,
{
    fn transform(&self, record: &Record, item: OutputItem) -> OutputItem {
        self(record, item)
    }
}

/// Leaves items untouched.
pub struct IdentityTransform;

impl ItemTransform for IdentityTransform {
    fn transform(&self, _record: &Record, item: OutputItem) -> OutputItem {
        item
    }
}

/// Decides whether a record of a reference category is dropped.
pub trait FilterPredicate: Send + Sync {
    fn matches(&self, ref_type: &str, record: &Record) -> bool;
}

/// Records parsed from a source file whose name mentions `deprecated`.
pub struct DeprecatedSourceFile;

impl FilterPredicate for DeprecatedSourceFile {
    fn matches(&self, _ref_type: &str, record: &Record) -> bool {
        record
            .source_file
            .as_deref()
            .is_some_and(|file| file.contains("deprecated"))
    }
}

/// Hook records whose slug ends in `-<digits>`, the suffix the store appends to
/// disambiguate hooks registered more than once.
pub struct DisambiguatedHookSlug;

fn disambiguation_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"-\d+$").expect("static regex is valid"))
}

impl FilterPredicate for DisambiguatedHookSlug {
    fn matches(&self, ref_type: &str, record: &Record) -> bool {
        is_hook_ref_type(ref_type) && disambiguation_suffix().is_match(&record.name)
    }
}

/// How the slug is derived from a record's permalink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugStyle {
    /// Last path segment of the permalink.
    Basename,
    /// Permalink relative to the site URL, without surrounding slashes.
    RelativeTo(Option<String>),
}

impl SlugStyle {
    pub fn slug(&self, permalink: &str) -> String {
        match self {
            SlugStyle::Basename => permalink
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
            SlugStyle::RelativeTo(base) => {
                let relative = base
                    .as_deref()
                    .filter(|b| !b.is_empty())
                    .and_then(|b| permalink.strip_prefix(b))
                    .unwrap_or(permalink);
                relative
                    .trim_matches(|c| c == '/' || c == ' ')
                    .to_string()
            }
        }
    }
}

/// Maps raw records to output items for a kind.
pub struct Projector {
    site_url: Option<String>,
    deprecated: Option<Box<dyn FilterPredicate>>,
    duplicate: Box<dyn FilterPredicate>,
    transform: Box<dyn ItemTransform>,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Projector {
    /// Projector with the default predicates, deprecation skipping enabled.
    pub fn new(site_url: Option<String>) -> Self {
        Self {
            site_url,
            deprecated: Some(Box::new(DeprecatedSourceFile)),
            duplicate: Box::new(DisambiguatedHookSlug),
            transform: Box::new(IdentityTransform),
        }
    }

    pub fn skip_deprecated(mut self, skip: bool) -> Self {
        if !skip {
            self.deprecated = None;
        } else if self.deprecated.is_none() {
            self.deprecated = Some(Box::new(DeprecatedSourceFile));
        }
        self
    }

    pub fn with_deprecated_predicate(mut self, predicate: impl FilterPredicate + 'static) -> Self {
        self.deprecated = Some(Box::new(predicate));
        self
    }

    pub fn with_duplicate_predicate(mut self, predicate: impl FilterPredicate + 'static) -> Self {
        self.duplicate = Box::new(predicate);
        self
    }

    pub fn with_transform(mut self, transform: impl ItemTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn slug_style(&self, kind: &Kind) -> SlugStyle {
        if kind.is_versioned() {
            SlugStyle::Basename
        } else {
            SlugStyle::RelativeTo(self.site_url.clone())
        }
    }

    /// Project one source page of `kind`, counting dropped records in `stats`.
    pub fn project(&self, records: &[Record], kind: &Kind, stats: &mut RunStats) -> FetchOutcome {
        if records.is_empty() {
            return FetchOutcome::Exhausted;
        }

        let slug_style = self.slug_style(kind);
        let ref_type = kind.label.as_str();
        let mut items = Vec::with_capacity(records.len());

        for record in records {
            if let Some(deprecated) = &self.deprecated {
                if deprecated.matches(ref_type, record) {
                    stats.deprecated += 1;
                    continue;
                }
            }
            if self.duplicate.matches(ref_type, record) {
                stats.duplicates += 1;
                continue;
            }

            let item = OutputItem::new(
                record.title.trim_matches('"'),
                slug_style.slug(&record.permalink),
            );
            items.push(self.transform.transform(record, item));
        }

        if items.is_empty() {
            debug!(kind = %kind.label, records = records.len(), "Every record on the page was filtered out");
            FetchOutcome::Retry
        } else {
            FetchOutcome::Items(items)
        }
    }
}
