//! Local filesystem store and the gate that hands it out.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::contract::{CredentialGate, FileStore, Session};

/// [`FileStore`] on the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStore;

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn put_contents(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Grants a [`LocalFileStore`] session when the output location is writable.
///
/// The check looks at the closest existing ancestor of the output directory and
/// never creates anything.
#[derive(Debug, Clone)]
pub struct LocalGate {
    output_dir: PathBuf,
}

impl LocalGate {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn writable_anchor(&self) -> Option<&Path> {
        let mut current = Some(self.output_dir.as_path());
        while let Some(path) = current {
            let candidate = if path.as_os_str().is_empty() {
                Path::new(".")
            } else {
                path
            };
            if candidate.exists() {
                return Some(candidate);
            }
            current = path.parent();
        }
        None
    }
}

impl CredentialGate for LocalGate {
    fn acquire(&self) -> Option<Session> {
        let Some(anchor) = self.writable_anchor() else {
            error!(output_dir = %self.output_dir.display(), "No existing ancestor for output directory");
            return None;
        };
        match fs::metadata(anchor) {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => {
                info!(anchor = %anchor.display(), "Filesystem access granted");
                Some(Session::new(LocalFileStore))
            }
            Ok(meta) => {
                debug!(anchor = %anchor.display(), is_dir = meta.is_dir(), "Output location not writable");
                error!(anchor = %anchor.display(), "Filesystem access denied");
                None
            }
            Err(e) => {
                error!(error = ?e, anchor = %anchor.display(), "Failed to inspect output location");
                None
            }
        }
    }
}
