use crate::models::error::StorageError;
use crate::traits::storage::SeekableFile;

/// Collects diagnostic output into a side file for the session's lifetime.
pub trait LogCapture: Send + Sync {
    fn start(&self, sink: Box<dyn SeekableFile>) -> Result<(), StorageError>;

    /// Stop collecting and close the sink.
    fn stop(&self);
}
