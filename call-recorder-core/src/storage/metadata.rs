use std::io::{BufReader, Write};

use crate::models::error::StorageError;
use crate::models::recording_result::RecordingMetadata;
use crate::naming::redactor::Redact;
use crate::traits::storage::{Artifact, DirectoryRef, OpenMode, Storage};

pub const METADATA_MIME_TYPE: &str = "application/json";

/// Write recording metadata as a JSON sidecar named `name` in `dir`.
///
/// The sidecar is removed again if writing fails.
pub fn write_metadata(
    storage: &dyn Storage,
    dir: &DirectoryRef,
    name: &str,
    metadata: &RecordingMetadata,
    redact: &dyn Redact,
) -> Result<Artifact, StorageError> {
    let artifact = storage.create_file(dir, METADATA_MIME_TYPE, name)?;
    let result = storage
        .open(&artifact, OpenMode::ReadWriteTruncate)
        .and_then(|mut file| {
            serde_json::to_writer_pretty(&mut file, metadata)
                .map_err(|e| StorageError::Io(format!("failed to serialize metadata: {}", e)))?;
            file.flush()?;
            file.sync_all()?;
            Ok(())
        });
    if let Err(e) = result {
        if let Err(del) = storage.delete(&artifact) {
            log::warn!(
                "Failed to remove incomplete metadata file: {}",
                redact.redact(&del.to_string())
            );
        }
        return Err(e);
    }
    Ok(artifact)
}

/// Read recording metadata from a JSON sidecar.
pub fn read_metadata(storage: &dyn Storage, artifact: &Artifact) -> Result<RecordingMetadata, StorageError> {
    let file = storage.open(artifact, OpenMode::Read)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| StorageError::Io(format!("failed to parse metadata: {}", e)))
}
