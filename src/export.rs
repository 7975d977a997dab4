//! High-level pipeline: gate → directories → kinds → version stamp → archive.
//!
//! This module orchestrates one export run as described by an [`ExportConfig`]:
//!   - Refuses an empty kind list before touching anything
//!   - Acquires a filesystem [`Session`] from the [`CredentialGate`]; without one
//!     the run stops before anything on disk changes
//!   - Deletes and recreates the output and temp directories
//!   - For each requested kind: paginates its records, builds the index and writes
//!     the files
//!   - Writes `version.json` when a versioned kind was exported
//!   - Packs the output directory into a zip archive (built in the temp directory,
//!     then moved next to the JSON files) and removes the temp directory
//!
//! # Error Handling
//! Problems confined to one kind (unknown content type, file limit hit) are
//! collected as [`ExportWarning`]s in the report and the run goes on. Anything
//! else is an [`ExportError`]: the run stops immediately and the temp directory
//! is removed on a best-effort basis.
//!
//! # Navigation
//! - Main entrypoint: [`Exporter::run`]
//! - Supporting types: [`ExportReport`], [`KindReport`]

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ExportConfig;
use crate::contract::{ArchiveWriter, CredentialGate, FileStore, RecordSource, Session, SourceError};
use crate::emit::{emit_kind, emit_version, EmitError, KindMetadata};
use crate::index::{build_index, LookupKeyFn, RunIndex, RunStats, SlugKey};
use crate::paginate::PaginationEngine;
use crate::project::Projector;
use crate::reference::Kind;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not access the filesystem")]
    CredentialUnavailable,
    #[error("unable to {action} directory {}: {source}", path.display())]
    DirectoryOperationFailed {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no JSON files generated, please provide a valid post type")]
    NoKindsRequested,
    #[error("failed to fetch records for '{kind}': {source}")]
    Fetch {
        kind: String,
        #[source]
        source: SourceError,
    },
    #[error("unable to create the file {}: {source}", path.display())]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not generate zip file {}: {reason}", path.display())]
    ArchiveGenerationFailed { path: PathBuf, reason: String },
    #[error("no JSON files created")]
    NoFilesProduced,
}

impl From<EmitError> for ExportError {
    fn from(e: EmitError) -> Self {
        ExportError::FileWriteFailed {
            path: e.path,
            source: e.source,
        }
    }
}

/// A per-kind problem that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    InvalidKindRequested { label: String, content_type: String },
    FileLimitExceeded { label: String, file_limit: usize },
}

impl ExportWarning {
    /// Whether a requested kind produced no files at all.
    pub fn is_missing_kind(&self) -> bool {
        matches!(self, ExportWarning::InvalidKindRequested { .. })
    }
}

impl fmt::Display for ExportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportWarning::InvalidKindRequested { label, content_type } => write!(
                f,
                "No {label}.json file created. Please make sure post type {content_type} exists"
            ),
            ExportWarning::FileLimitExceeded { label, file_limit } => write!(
                f,
                "Output of {label} truncated: file limit of {file_limit} reached"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KindReport {
    pub label: String,
    pub content_type: String,
    pub files: Vec<PathBuf>,
    pub index: RunIndex,
    pub stats: RunStats,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub archive: PathBuf,
    pub kinds: Vec<KindReport>,
    pub version_file: Option<PathBuf>,
    pub warnings: Vec<ExportWarning>,
}

impl ExportReport {
    /// True when every requested kind was written.
    pub fn is_complete(&self) -> bool {
        !self.warnings.iter().any(ExportWarning::is_missing_kind)
    }
}

pub struct Exporter<'a, S: ?Sized, A: ?Sized> {
    config: &'a ExportConfig,
    source: &'a S,
    archiver: &'a A,
    projector: Projector,
    key_fn: Box<dyn LookupKeyFn>,
}

impl<'a, S, A> Exporter<'a, S, A>
where
    S: RecordSource + ?Sized,
    A: ArchiveWriter + ?Sized,
{
    pub fn new(config: &'a ExportConfig, source: &'a S, archiver: &'a A) -> Self {
        let projector =
            Projector::new(config.site_url.clone()).skip_deprecated(config.skip_deprecated);
        Self {
            config,
            source,
            archiver,
            projector,
            key_fn: Box::new(SlugKey),
        }
    }

    pub fn with_projector(mut self, projector: Projector) -> Self {
        self.projector = projector;
        self
    }

    pub fn with_lookup_key(mut self, key_fn: impl LookupKeyFn + 'static) -> Self {
        self.key_fn = Box::new(key_fn);
        self
    }

    /// Run a full export of `kinds`.
    pub async fn run<G>(&self, gate: &G, kinds: &[Kind]) -> Result<ExportReport, ExportError>
    where
        G: CredentialGate + ?Sized,
    {
        info!(kinds = kinds.len(), "[EXPORT] Starting export");
        if kinds.is_empty() {
            error!("[EXPORT][ERROR] No kinds requested, nothing was changed");
            return Err(ExportError::NoKindsRequested);
        }

        let session = gate.acquire().ok_or_else(|| {
            error!("[EXPORT][ERROR] Filesystem access unavailable, nothing was changed");
            ExportError::CredentialUnavailable
        })?;

        let output_dir = self.config.output_dir.clone();
        let temp_dir = self.config.temp_dir();
        for dir in [&output_dir, &temp_dir] {
            reset_dir(session.store(), dir)?;
        }

        match self.export_all(&session, kinds, &output_dir, &temp_dir).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(error = %e, "[EXPORT][ERROR] Export failed");
                discard_temp(session.store(), &temp_dir);
                Err(e)
            }
        }
    }

    async fn export_all(
        &self,
        session: &Session,
        kinds: &[Kind],
        output_dir: &Path,
        temp_dir: &Path,
    ) -> Result<ExportReport, ExportError> {
        let store = session.store();
        let mut reports = Vec::new();
        let mut warnings = Vec::new();
        let mut versioned = false;

        for kind in kinds {
            let exists = self
                .source
                .kind_exists(&kind.content_type)
                .await
                .map_err(|source| ExportError::Fetch {
                    kind: kind.label.clone(),
                    source,
                })?;
            if !exists {
                warn!(kind = %kind.label, content_type = %kind.content_type, "[EXPORT] Content type does not exist, skipping");
                warnings.push(ExportWarning::InvalidKindRequested {
                    label: kind.label.clone(),
                    content_type: kind.content_type.clone(),
                });
                continue;
            }

            let report = self.export_kind(store, kind, output_dir).await?;
            if report.stats.truncated {
                warnings.push(ExportWarning::FileLimitExceeded {
                    label: kind.label.clone(),
                    file_limit: self.config.pagination().file_limit,
                });
            }
            versioned |= kind.is_versioned();
            reports.push(report);
        }

        let version_file = if versioned {
            info!(version = %self.config.reference.version, "[EXPORT] Generating version.json file");
            if self.config.reference.version.is_empty() {
                warn!("[EXPORT] reference.version is empty");
            }
            Some(emit_version(store, output_dir, &self.config.reference.version)?)
        } else {
            None
        };

        let files_created = version_file.is_some() || reports.iter().any(|r| !r.files.is_empty());
        if !files_created {
            error!("[EXPORT][ERROR] No JSON files created");
            return Err(ExportError::NoFilesProduced);
        }

        let archive = self.package(store, output_dir, temp_dir)?;

        store.rmdir(temp_dir).map_err(|source| {
            error!(error = ?source, path = %temp_dir.display(), "[EXPORT][ERROR] Unable to delete temp directory");
            ExportError::DirectoryOperationFailed {
                action: "delete",
                path: temp_dir.to_path_buf(),
                source,
            }
        })?;

        info!(
            kinds = reports.len(),
            warnings = warnings.len(),
            archive = %archive.display(),
            "[EXPORT] Export complete"
        );
        Ok(ExportReport {
            output_dir: output_dir.to_path_buf(),
            archive,
            kinds: reports,
            version_file,
            warnings,
        })
    }

    async fn export_kind(
        &self,
        store: &dyn FileStore,
        kind: &Kind,
        output_dir: &Path,
    ) -> Result<KindReport, ExportError> {
        info!(kind = %kind.label, content_type = %kind.content_type, "[EXPORT] Generating kind");
        let pagination = self.config.pagination();
        let engine = PaginationEngine::new(self.source, &self.projector, pagination);
        let paginated = engine.run(kind).await.map_err(|source| ExportError::Fetch {
            kind: kind.label.clone(),
            source,
        })?;

        let index = build_index(
            kind,
            &paginated.pages,
            self.key_fn.as_ref(),
            &paginated.stats,
            pagination.page_size,
        );
        let meta = KindMetadata::for_kind(
            kind,
            &self.config.reference.version,
            &self.config.reference.base_url,
            self.config.site_url.as_deref(),
        );
        let files = emit_kind(
            store,
            output_dir,
            kind,
            &meta,
            &paginated.pages,
            &index,
            pagination.page_size,
        )?;

        info!(kind = %kind.label, stats = %paginated.stats, "[EXPORT] Kind statistics");
        Ok(KindReport {
            label: kind.label.clone(),
            content_type: kind.content_type.clone(),
            files,
            index,
            stats: paginated.stats,
        })
    }

    /// Build the archive in the temp directory and move it into the output directory.
    fn package(
        &self,
        store: &dyn FileStore,
        output_dir: &Path,
        temp_dir: &Path,
    ) -> Result<PathBuf, ExportError> {
        let file_name = self.config.archive_file_name();
        let temp_zip = temp_dir.join(&file_name);

        if let Err(e) = self
            .archiver
            .pack(output_dir, &self.config.archive.exclude, &temp_zip)
        {
            error!(error = ?e, path = %temp_zip.display(), "[EXPORT][ERROR] Archive generation failed");
            return Err(ExportError::ArchiveGenerationFailed {
                path: temp_zip,
                reason: e.to_string(),
            });
        }
        if !store.exists(&temp_zip) {
            error!(path = %temp_zip.display(), "[EXPORT][ERROR] Archive file missing after packing");
            return Err(ExportError::ArchiveGenerationFailed {
                path: temp_zip,
                reason: "archive file was not created".to_string(),
            });
        }

        let archive = output_dir.join(&file_name);
        store.rename(&temp_zip, &archive).map_err(|e| {
            error!(error = ?e, from = %temp_zip.display(), to = %archive.display(), "[EXPORT][ERROR] Unable to move archive");
            ExportError::ArchiveGenerationFailed {
                path: temp_zip.clone(),
                reason: format!("unable to move file: {e}"),
            }
        })?;
        Ok(archive)
    }
}

/// Export `kinds` with the default projector and lookup key.
pub async fn export<S, A, G>(
    config: &ExportConfig,
    source: &S,
    archiver: &A,
    gate: &G,
    kinds: &[Kind],
) -> Result<ExportReport, ExportError>
where
    S: RecordSource + ?Sized,
    A: ArchiveWriter + ?Sized,
    G: CredentialGate + ?Sized,
{
    Exporter::new(config, source, archiver).run(gate, kinds).await
}

/// Delete `dir` if present and create it empty.
fn reset_dir(store: &dyn FileStore, dir: &Path) -> Result<(), ExportError> {
    if store.exists(dir) {
        store.rmdir(dir).map_err(|source| {
            error!(error = ?source, path = %dir.display(), "[EXPORT][ERROR] Unable to delete directory");
            ExportError::DirectoryOperationFailed {
                action: "delete",
                path: dir.to_path_buf(),
                source,
            }
        })?;
    }
    store.mkdir(dir).map_err(|source| {
        error!(error = ?source, path = %dir.display(), "[EXPORT][ERROR] Unable to create directory");
        ExportError::DirectoryOperationFailed {
            action: "create",
            path: dir.to_path_buf(),
            source,
        }
    })
}

fn discard_temp(store: &dyn FileStore, temp_dir: &Path) {
    if !store.exists(temp_dir) {
        return;
    }
    match store.rmdir(temp_dir) {
        Ok(()) => info!(path = %temp_dir.display(), "[EXPORT] Removed temp directory"),
        Err(e) => warn!(error = ?e, path = %temp_dir.display(), "[EXPORT] Unable to delete temp directory"),
    }
}
