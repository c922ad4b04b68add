use std::fs::File;
use std::io::{self, Read, Seek, Write};

use crate::models::error::StorageError;

/// Reference to a storage directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryRef {
    pub uri: String,
}

impl DirectoryRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// A file entry in a storage directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub uri: String,
    /// Display name, including the extension.
    pub name: String,
    pub mime_type: String,
}

/// How an artifact is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// "rw"
    ReadWrite,
    /// "rwt"
    ReadWriteTruncate,
}

/// Seekable handle to an open artifact.
pub trait SeekableFile: Read + Write + Seek + Send {
    /// Force written data to durable storage.
    fn sync_all(&mut self) -> io::Result<()>;
}

impl SeekableFile for File {
    fn sync_all(&mut self) -> io::Result<()> {
        File::sync_all(self)
    }
}

/// Storage abstraction with an always-writable default directory and an
/// optional user-chosen directory.
pub trait Storage: Send + Sync {
    fn default_directory(&self) -> DirectoryRef;

    /// `None` when the user has not chosen a directory or it is unavailable.
    fn user_directory(&self) -> Option<DirectoryRef>;

    /// Create a new file named `name` (without extension) in `dir`.
    fn create_file(
        &self,
        dir: &DirectoryRef,
        mime_type: &str,
        name: &str,
    ) -> Result<Artifact, StorageError>;

    fn open(&self, artifact: &Artifact, mode: OpenMode)
        -> Result<Box<dyn SeekableFile>, StorageError>;

    /// Rename in place, keeping the extension. Returns the renamed entry.
    fn rename(&self, artifact: &Artifact, new_name: &str) -> Result<Artifact, StorageError>;

    fn delete(&self, artifact: &Artifact) -> Result<(), StorageError>;

    fn list_files(&self, dir: &DirectoryRef) -> Result<Vec<Artifact>, StorageError>;
}
