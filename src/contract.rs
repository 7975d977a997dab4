//! # contract: interfaces to the collaborators of an export run
//!
//! This module defines the traits and plain data types the export core talks to.
//! Nothing in here knows about pagination or file layout; it only describes how
//! records are read and how bytes reach the disk.
//!
//! ## Collaborators
//! - [`RecordSource`]: the content store. Queried per content type with an optional
//!   categorical filter, paged by offset/limit, ordered by title ascending.
//! - [`CredentialGate`]: hands out a [`Session`] when filesystem access is available.
//!   A missing session aborts the run before any directory is touched.
//! - [`FileStore`]: directory lifecycle and file writes, reached through the session.
//! - [`ArchiveWriter`]: packs a directory into a single archive file.
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall` so tests can script the store and the
//!   filesystem deterministically (`test-export-mocks` feature).

use std::io;
use std::path::Path;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

/// One record as stored in the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub title: String,
    /// Public URL of the record.
    pub permalink: String,
    /// Name of the source file the record was parsed from, if any.
    #[serde(default)]
    pub source_file: Option<String>,
    /// Raw slug as stored (the store's own unique name).
    pub name: String,
    /// Hook subtype (`action`, `filter`, `action_reference`, ...).
    #[serde(default)]
    pub hook_type: Option<String>,
}

/// Categorical filter handed to the store together with a query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterSpec {
    #[default]
    All,
    /// Only records whose hook type is one of the listed values.
    HookTypes(Vec<String>),
}

impl FilterSpec {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            FilterSpec::All => true,
            FilterSpec::HookTypes(values) => record
                .hook_type
                .as_deref()
                .is_some_and(|hook_type| values.iter().any(|v| v == hook_type)),
        }
    }
}

/// Error type for record sources (simple boxed error, as for the other collaborators).
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for archive writers.
pub type ArchiveError = Box<dyn std::error::Error + Send + Sync>;

/// Read access to the content store.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Return the records of `kind` matching `filter`, ordered by title ascending,
    /// starting at `offset`. `limit: None` means no upper bound.
    async fn query(
        &self,
        kind: &str,
        filter: &FilterSpec,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, SourceError>;

    /// Whether the store knows the content type at all.
    async fn kind_exists(&self, kind: &str) -> Result<bool, SourceError>;
}

/// Filesystem operations used by the emitter and the export pipeline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Create a directory (and missing parents).
    fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory recursively.
    fn rmdir(&self, path: &Path) -> io::Result<()>;

    fn put_contents(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Filesystem capability for one run. Acquired once, threaded through every
/// call that touches the disk.
pub struct Session {
    store: Box<dyn FileStore>,
}

impl Session {
    pub fn new<F>(store: F) -> Self
    where
        F: FileStore + 'static,
    {
        Self {
            store: Box::new(store),
        }
    }

    pub fn store(&self) -> &dyn FileStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Grants filesystem access. `None` means the run cannot proceed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CredentialGate {
    fn acquire(&self) -> Option<Session>;
}

/// Packs a directory of emitted files into one archive.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ArchiveWriter: Send + Sync {
    /// Walk `source_dir`, skip every file or directory whose name is listed in
    /// `exclude`, and write the rest into a new archive at `dest`.
    fn pack(&self, source_dir: &Path, exclude: &[String], dest: &Path)
        -> Result<(), ArchiveError>;
}
