//! Output artifact lifecycle: create → open → rename → move.

use std::io::{self, Read, Seek, SeekFrom, Write};

use sha2::{Digest, Sha256};

use crate::models::error::StorageError;
use crate::naming::redactor::Redact;
use crate::traits::storage::{Artifact, DirectoryRef, OpenMode, SeekableFile, Storage};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Creates, renames and relocates session artifacts. Every identifier that
/// reaches the log goes through `redact`.
pub struct OutputManager<'a> {
    storage: &'a dyn Storage,
    redact: &'a dyn Redact,
}

impl<'a> OutputManager<'a> {
    pub fn new(storage: &'a dyn Storage, redact: &'a dyn Redact) -> Self {
        Self { storage, redact }
    }

    /// Redact `text` with the session's identity values.
    pub fn redact(&self, text: &str) -> String {
        self.redact.redact(text)
    }

    pub fn create_in_default_dir(&self, name: &str, mime_type: &str) -> Result<Artifact, StorageError> {
        let dir = self.storage.default_directory();
        let artifact = self.storage.create_file(&dir, mime_type, name)?;
        log::debug!("Created {}", self.redact.redact(&artifact.uri));
        Ok(artifact)
    }

    pub fn open_for_read_write(
        &self,
        artifact: &Artifact,
        truncate: bool,
    ) -> Result<Box<dyn SeekableFile>, StorageError> {
        let mode = if truncate {
            OpenMode::ReadWriteTruncate
        } else {
            OpenMode::ReadWrite
        };
        self.storage.open(artifact, mode)
    }

    /// Delete an artifact that turned out to be unusable.
    pub fn discard(&self, artifact: &Artifact) {
        log::debug!("Discarding {}", self.redact.redact(&artifact.uri));
        if let Err(e) = self.storage.delete(artifact) {
            log::warn!(
                "Failed to delete {}: {}",
                self.redact.redact(&artifact.uri),
                self.redact.redact(&e.to_string())
            );
        }
    }

    /// Rename `artifact` from `created_name` to `final_name` when they
    /// differ. A failed rename keeps the original artifact.
    pub fn rename_if_changed(&self, artifact: Artifact, created_name: &str, final_name: &str) -> Artifact {
        if created_name == final_name {
            return artifact;
        }
        log::info!(
            "Renaming {} to {}",
            self.redact.redact(&artifact.uri),
            self.redact.redact(final_name)
        );
        match self.storage.rename(&artifact, final_name) {
            Ok(renamed) => renamed,
            Err(e) => {
                log::warn!(
                    "Failed to rename {}: {}",
                    self.redact.redact(&artifact.uri),
                    self.redact.redact(&e.to_string())
                );
                artifact
            }
        }
    }

    /// Move `artifact` into the user directory under `name`.
    ///
    /// Returns `Ok(None)` when no user directory is configured. On error the
    /// source is untouched and no destination entry remains.
    pub fn move_to_user_dir(&self, artifact: &Artifact, name: &str) -> Result<Option<Artifact>, StorageError> {
        let Some(user_dir) = self.storage.user_directory() else {
            return Ok(None);
        };
        if user_dir == self.storage.default_directory() {
            return Ok(None);
        }
        self.move_to(artifact, &user_dir, name).map(Some)
    }

    /// Best-effort variant of [`Self::move_to_user_dir`]: returns the final
    /// location, which is the source when the move did not happen.
    pub fn relocate(&self, artifact: Artifact, name: &str) -> Artifact {
        match self.move_to_user_dir(&artifact, name) {
            Ok(Some(moved)) => moved,
            Ok(None) => artifact,
            Err(e) => {
                log::warn!(
                    "Failed to move {} to output directory: {}",
                    self.redact.redact(&artifact.uri),
                    self.redact.redact(&e.to_string())
                );
                artifact
            }
        }
    }

    fn move_to(&self, source: &Artifact, dir: &DirectoryRef, name: &str) -> Result<Artifact, StorageError> {
        let target = self.storage.create_file(dir, &source.mime_type, name)?;
        log::info!(
            "Moving {} to {}",
            self.redact.redact(&source.uri),
            self.redact.redact(&target.uri)
        );

        let result = self.copy_verified(source, &target).and_then(|()| {
            log::debug!("Deleting source {}", self.redact.redact(&source.uri));
            self.storage.delete(source)
        });

        match result {
            Ok(()) => Ok(target),
            Err(e) => {
                log::debug!("Rolling back {}", self.redact.redact(&target.uri));
                if let Err(del) = self.storage.delete(&target) {
                    log::warn!(
                        "Failed to delete partial copy {}: {}",
                        self.redact.redact(&target.uri),
                        self.redact.redact(&del.to_string())
                    );
                }
                Err(e)
            }
        }
    }

    fn copy_verified(&self, source: &Artifact, target: &Artifact) -> Result<(), StorageError> {
        let mut src = self.storage.open(source, OpenMode::Read)?;
        let mut dst = self.storage.open(target, OpenMode::ReadWriteTruncate)?;

        let expected = src.seek(SeekFrom::End(0))?;
        src.seek(SeekFrom::Start(0))?;

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut remaining = expected;
        while remaining > 0 {
            let want = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
            let n = src.read(&mut buf[..want])?;
            if n == 0 {
                return Err(StorageError::ShortTransfer {
                    copied: expected - remaining,
                    expected,
                });
            }
            dst.write_all(&buf[..n])?;
            hasher.update(&buf[..n]);
            remaining -= n as u64;
        }
        dst.flush()?;
        dst.sync_all()?;

        let source_digest = hex_encode(&hasher.finalize());
        dst.seek(SeekFrom::Start(0))?;
        let (copied, target_digest) = sha256_reader(&mut dst)?;
        if copied != expected || source_digest != target_digest {
            log::error!(
                "Copy of {} does not match: {} bytes {} vs {} bytes {}",
                self.redact.redact(&source.uri),
                expected,
                source_digest,
                copied,
                target_digest
            );
            return Err(StorageError::VerificationFailed);
        }
        log::debug!("Copied {} bytes, sha256 {}", expected, source_digest);
        Ok(())
    }
}

/// Length and SHA-256 hex digest of everything left in `reader`.
fn sha256_reader(reader: &mut dyn Read) -> io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((total, hex_encode(&hasher.finalize())))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
