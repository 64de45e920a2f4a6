use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{names, ContentError};

/// Attempts at finding a free suffixed name before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Directory holding every summary's backing file under a flat stored name.
pub struct ContentRoot {
    base_path: PathBuf,
}

impl ContentRoot {
    /// Open the content root, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(base_path.as_ref())?;
        // Canonical so that containment checks compare like with like.
        let base_path = std::fs::canonicalize(base_path.as_ref())?;
        Ok(Self { base_path })
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Write `data` under a safe name derived from `hint` and return the name used.
    ///
    /// Never overwrites: if the sanitized name is taken, a short random suffix is
    /// inserted before the extension.
    pub async fn store(&self, hint: &str, data: Bytes) -> Result<String, ContentError> {
        let name = names::sanitize(hint)?;
        let mut candidate = name.clone();

        for _ in 0..MAX_NAME_ATTEMPTS {
            match self.create_new(&candidate, &data).await {
                Ok(()) => {
                    tracing::debug!(stored_name = %candidate, bytes = data.len(), "Stored file");
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = names::with_suffix(&name, &short_suffix());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ContentError::NameExhausted(name))
    }

    /// Store the replacement for `old`. The old file stays in place until the
    /// returned guard is finished, so a failed record update can be undone.
    pub async fn replace(
        &self,
        old: &str,
        hint: &str,
        data: Bytes,
    ) -> Result<Replacement<'_>, ContentError> {
        let new = self.store(hint, data).await?;
        Ok(Replacement {
            root: self,
            old: old.to_string(),
            new,
        })
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, name: &str) -> Result<(), ContentError> {
        names::validate_stored(name)?;
        match tokio::fs::remove_file(self.base_path.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Absolute path of a stored file, for streaming it back out.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, ContentError> {
        names::validate_stored(name)?;
        let path = match tokio::fs::canonicalize(self.base_path.join(name)).await {
            Ok(path) => path,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ContentError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        // A symlink planted in the root must not lead outside it.
        if !path.starts_with(&self.base_path) {
            return Err(ContentError::InvalidName(name.to_string()));
        }
        if !path.is_file() {
            return Err(ContentError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    pub async fn exists(&self, name: &str) -> bool {
        self.resolve(name).await.is_ok()
    }

    async fn create_new(&self, name: &str, data: &[u8]) -> Result<(), std::io::Error> {
        let path = self.base_path.join(name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Don't leave a truncated file claiming the name
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }
        Ok(())
    }
}

/// A stored replacement file whose predecessor has not been removed yet.
#[must_use = "a replacement must be finished or aborted"]
pub struct Replacement<'a> {
    root: &'a ContentRoot,
    old: String,
    new: String,
}

impl Replacement<'_> {
    pub fn stored_name(&self) -> &str {
        &self.new
    }

    /// Keep the new file and remove the old one (best-effort).
    pub async fn finish(self) -> String {
        if let Err(e) = self.root.remove(&self.old).await {
            tracing::warn!(stored_name = %self.old, error = %e, "Failed to remove replaced file");
        }
        self.new
    }

    /// Drop the new file and keep the old one.
    pub async fn abort(self) {
        if let Err(e) = self.root.remove(&self.new).await {
            tracing::warn!(stored_name = %self.new, error = %e, "Failed to remove aborted replacement");
        }
    }
}

fn short_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
