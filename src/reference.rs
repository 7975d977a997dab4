//! Kinds of exportable content and how `--type` arguments resolve to them.
//!
//! The documentation parser stores its reference in a fixed set of content types.
//! Those are "versioned" kinds: their files carry the parsed version, their slugs
//! come from the permalink basename, and a `version.json` stamp is written next
//! to them. Every other content type is exported as a generic kind.

use tracing::{debug, info, warn};

use crate::contract::{FilterSpec, RecordSource, SourceError};

/// Parser content types, keyed by the label used for their files.
pub const PARSER_TYPES: [(&str, &str); 4] = [
    ("functions", "wp-parser-function"),
    ("hooks", "wp-parser-hook"),
    ("classes", "wp-parser-class"),
    ("methods", "wp-parser-method"),
];

/// Hook categories exported from the hook content type.
pub const HOOK_CATEGORIES: [&str; 2] = ["actions", "filters"];

/// Content type holding hooks.
pub const HOOK_TYPE: &str = "wp-parser-hook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Parser reference content, stamped with a version.
    Versioned,
    Generic,
}

/// One unit of export: a label (file prefix, also the reference category) and
/// the content type its records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kind {
    pub label: String,
    pub content_type: String,
    pub category: Category,
}

impl Kind {
    pub fn new(label: impl Into<String>, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let category = if is_parser_type(&content_type) {
            Category::Versioned
        } else {
            Category::Generic
        };
        Self {
            label: label.into(),
            content_type,
            category,
        }
    }

    pub fn is_versioned(&self) -> bool {
        self.category == Category::Versioned
    }

    /// Actions and filters of the parser hook type.
    pub fn is_hook_category(&self) -> bool {
        self.is_versioned() && HOOK_CATEGORIES.contains(&self.label.as_str())
    }

    /// Store-side filter for this kind. Hook categories are restricted to the
    /// matching hook subtypes; everything else is unfiltered.
    pub fn filter_spec(&self) -> FilterSpec {
        if !self.is_hook_category() {
            return FilterSpec::All;
        }
        let values = if self.label == "actions" {
            ["action", "action_reference"]
        } else {
            ["filter", "filter_reference"]
        };
        FilterSpec::HookTypes(values.iter().map(|v| v.to_string()).collect())
    }

    /// Path segment under the reference base URL.
    pub fn url_segment(&self) -> &str {
        if self.is_hook_category() {
            "hooks"
        } else {
            &self.label
        }
    }
}

pub fn is_parser_type(content_type: &str) -> bool {
    PARSER_TYPES.iter().any(|(_, t)| *t == content_type)
}

/// Whether slugs of this reference category may carry a disambiguation suffix.
pub fn is_hook_ref_type(ref_type: &str) -> bool {
    ref_type == "hooks" || HOOK_CATEGORIES.contains(&ref_type)
}

/// Split a comma separated `--type` value into trimmed, de-duplicated names.
pub fn parse_type_list(raw: &str) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !types.iter().any(|t| t == name) {
            types.push(name.to_string());
        }
    }
    types
}

/// Resolve requested content types to kinds. Parser content types are exported
/// under their label, everything else under its own name.
pub fn resolve_kinds(types: &[String]) -> Vec<Kind> {
    let kinds: Vec<Kind> = types
        .iter()
        .map(|content_type| {
            let label = PARSER_TYPES
                .iter()
                .find(|(_, t)| t == content_type)
                .map(|(label, _)| label.to_string())
                .unwrap_or_else(|| content_type.clone());
            Kind::new(label, content_type.as_str())
        })
        .collect();
    debug!(?kinds, "Resolved requested types");
    kinds
}

/// Kinds exported when no type is requested: every parser type except methods,
/// plus the two hook categories.
pub fn default_kinds() -> Vec<Kind> {
    let mut kinds: Vec<Kind> = PARSER_TYPES
        .iter()
        .filter(|(label, _)| *label != "methods")
        .map(|(label, content_type)| Kind::new(*label, *content_type))
        .collect();
    kinds.extend(HOOK_CATEGORIES.iter().map(|c| Kind::new(*c, HOOK_TYPE)));
    info!(count = kinds.len(), "Using default parser kinds");
    kinds
}

/// Kinds for a `--type` argument. An empty or missing list falls back to the
/// defaults, but only when the store has every parser content type; otherwise
/// no kind is returned and the export reports that no valid type was given.
pub async fn kinds_for<S>(raw: Option<&str>, source: &S) -> Result<Vec<Kind>, SourceError>
where
    S: RecordSource + ?Sized,
{
    let types = raw.map(parse_type_list).unwrap_or_default();
    if !types.is_empty() {
        return Ok(resolve_kinds(&types));
    }
    for (_, content_type) in PARSER_TYPES {
        if !source.kind_exists(content_type).await? {
            warn!(content_type, "Parser content type missing, no default kinds");
            return Ok(Vec::new());
        }
    }
    Ok(default_kinds())
}
