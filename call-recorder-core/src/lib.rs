//! # call-recorder-core
//!
//! Call recording pipeline: captures the voice-call audio stream, encodes it
//! into a file named from call metadata, moves the finished file to the
//! user's output directory and prunes old recordings.
//!
//! Platform services (capture device, storage, log capture) implement the
//! traits in [`traits`] and plug into [`RecordingSession`].
//!
//! ## Architecture
//!
//! ```text
//! call-recorder-core (this crate)
//! ├── traits/       ← CaptureBackend, CodecFactory, Storage, Clock, LogCapture, RecordingListener
//! ├── models/       ← errors, CallMetadata, RecorderConfig, SessionState, RecordingResult
//! ├── naming/       ← filename template, timestamp codec, redaction
//! ├── capture/      ← capture device acquisition with retry
//! ├── processing/   ← encode loop, resource guards, WAV container
//! ├── storage/      ← filesystem storage, rename/move lifecycle, retention, metadata sidecar
//! └── session/      ← RecordingSession (thread body orchestrating the stages)
//! ```

pub mod capture;
pub mod models;
pub mod naming;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::call::{CallDirection, CallMetadata, DeviceContext};
pub use models::config::{AudioFormat, FormatParam, RecorderConfig, RetentionPolicy};
pub use models::error::{CaptureError, ConfigError, EncodeError, SessionError, StorageError, TemplateError};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::SessionState;
pub use naming::redactor::{Redact, Redactor};
pub use naming::template::Template;
pub use naming::timestamp::TimestampCodec;
pub use processing::wav_codec::WavCodec;
pub use session::recorder::{Collaborators, RecordingSession};
pub use storage::fs_storage::FsStorage;
pub use traits::capture_source::{CaptureBackend, CaptureParams, CaptureStream};
pub use traits::clock::{Clock, SystemClock};
pub use traits::codec::{CodecFactory, Container, Encoder, MediaFormat};
pub use traits::log_capture::LogCapture;
pub use traits::recording_listener::RecordingListener;
pub use traits::storage::{Artifact, DirectoryRef, OpenMode, SeekableFile, Storage};
