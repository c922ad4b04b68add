use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::config::RecorderConfig;
use crate::models::error::StorageError;
use crate::traits::storage::{Artifact, DirectoryRef, OpenMode, SeekableFile, Storage};

/// Largest " (n)" suffix tried before giving up on a name collision.
const MAX_DUPLICATE_SUFFIX: u32 = 999;

/// MIME type ↔ file extension table.
const EXTENSIONS: &[(&str, &str)] = &[
    ("audio/x-wav", "wav"),
    ("audio/wav", "wav"),
    ("audio/mp4", "m4a"),
    ("audio/ogg", "oga"),
    ("audio/flac", "flac"),
    ("audio/amr-wb", "amr"),
    ("text/plain", "log"),
    ("application/json", "json"),
];

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == mime_type)
        .map_or("bin", |(_, ext)| ext)
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(_, e)| *e == ext)
        .map_or("application/octet-stream", |(mime, _)| mime)
}

/// Local filesystem storage. URIs are plain paths.
#[derive(Debug, Clone)]
pub struct FsStorage {
    default_dir: PathBuf,
    user_dir: Option<PathBuf>,
}

impl FsStorage {
    pub fn new(default_dir: impl Into<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
            user_dir,
        }
    }

    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::new(config.default_directory.clone(), config.output_directory.clone())
    }

    fn artifact_for(path: &Path, mime_type: &str) -> Artifact {
        Artifact {
            uri: path.to_string_lossy().into_owned(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime_type: mime_type.to_string(),
        }
    }

    fn check_name(name: &str) -> Result<(), String> {
        if name.is_empty() {
            return Err("empty file name".into());
        }
        if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
            return Err("file name contains a path separator".into());
        }
        Ok(())
    }
}

impl Storage for FsStorage {
    fn default_directory(&self) -> DirectoryRef {
        DirectoryRef::new(self.default_dir.to_string_lossy())
    }

    fn user_directory(&self) -> Option<DirectoryRef> {
        let dir = self.user_dir.as_ref()?;
        if !dir.is_dir() {
            log::warn!("Output directory is unavailable: {}", dir.display());
            return None;
        }
        Some(DirectoryRef::new(dir.to_string_lossy()))
    }

    fn create_file(
        &self,
        dir: &DirectoryRef,
        mime_type: &str,
        name: &str,
    ) -> Result<Artifact, StorageError> {
        let create_failed = |message: String| StorageError::CreateFailed {
            name: name.to_string(),
            message,
        };
        Self::check_name(name).map_err(create_failed)?;

        let dir_path = Path::new(&dir.uri);
        fs::create_dir_all(dir_path).map_err(|e| create_failed(e.to_string()))?;

        let ext = extension_for_mime(mime_type);
        for n in 0..=MAX_DUPLICATE_SUFFIX {
            let file_name = match n {
                0 => format!("{}.{}", name, ext),
                _ => format!("{} ({}).{}", name, n, ext),
            };
            let path = dir_path.join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self::artifact_for(&path, mime_type)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(create_failed(e.to_string())),
            }
        }
        Err(create_failed("too many files with the same name".into()))
    }

    fn open(
        &self,
        artifact: &Artifact,
        mode: OpenMode,
    ) -> Result<Box<dyn SeekableFile>, StorageError> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::ReadWrite => options.read(true).write(true),
            OpenMode::ReadWriteTruncate => options.read(true).write(true).truncate(true),
        };
        let file = options
            .open(&artifact.uri)
            .map_err(|e| StorageError::OpenFailed {
                uri: artifact.uri.clone(),
                message: e.to_string(),
            })?;
        Ok(Box::new(file))
    }

    fn rename(&self, artifact: &Artifact, new_name: &str) -> Result<Artifact, StorageError> {
        let rename_failed = |message: String| StorageError::RenameFailed {
            uri: artifact.uri.clone(),
            message,
        };
        Self::check_name(new_name).map_err(rename_failed)?;

        let source = Path::new(&artifact.uri);
        let parent = source
            .parent()
            .ok_or_else(|| rename_failed("artifact has no parent directory".into()))?;
        let target = parent.join(format!(
            "{}.{}",
            new_name,
            extension_for_mime(&artifact.mime_type)
        ));
        if target.exists() {
            return Err(rename_failed("target already exists".into()));
        }
        fs::rename(source, &target).map_err(|e| rename_failed(e.to_string()))?;
        Ok(Self::artifact_for(&target, &artifact.mime_type))
    }

    fn delete(&self, artifact: &Artifact) -> Result<(), StorageError> {
        fs::remove_file(&artifact.uri).map_err(|e| StorageError::DeleteFailed {
            uri: artifact.uri.clone(),
            message: e.to_string(),
        })
    }

    fn list_files(&self, dir: &DirectoryRef) -> Result<Vec<Artifact>, StorageError> {
        let list_failed = |e: std::io::Error| StorageError::ListFailed {
            uri: dir.uri.clone(),
            message: e.to_string(),
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&dir.uri).map_err(list_failed)? {
            let entry = entry.map_err(list_failed)?;
            if !entry.file_type().map_err(list_failed)?.is_file() {
                continue;
            }
            let path = entry.path();
            let mime = path
                .extension()
                .map_or("application/octet-stream", |ext| {
                    mime_for_extension(&ext.to_string_lossy())
                });
            files.push(Self::artifact_for(&path, mime));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
