use thiserror::Error;

/// Errors raised while acquiring or reading the capture device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("failed to query minimum buffer size: {0}")]
    BufferSizeQuery(String),

    #[error("capture initialization failed after {attempts} attempts: {message}")]
    InitFailed { attempts: u32, message: String },

    #[error("capture read failed: {0}")]
    ReadFailed(String),

    #[error("capture device not available")]
    DeviceNotAvailable,

    #[error("capture stream error: {0}")]
    Stream(String),
}

/// Errors raised by the storage collaborator and the output lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("failed to create {name}: {message}")]
    CreateFailed { name: String, message: String },

    #[error("failed to open {uri}: {message}")]
    OpenFailed { uri: String, message: String },

    #[error("failed to rename {uri}: {message}")]
    RenameFailed { uri: String, message: String },

    #[error("failed to delete {uri}: {message}")]
    DeleteFailed { uri: String, message: String },

    #[error("failed to list {uri}: {message}")]
    ListFailed { uri: String, message: String },

    #[error("unexpected end of data after {copied} of {expected} bytes")]
    ShortTransfer { copied: u64, expected: u64 },

    #[error("copy verification failed")]
    VerificationFailed,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors raised by the encoder and container collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("container error: {0}")]
    Container(String),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors raised while parsing a filename template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown template variable: {0}")]
    UnknownVariable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Terminal error of a recording session, carried by the failure callback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("recording cancelled before it began")]
    CancelledBeforeStart,

    #[error("capture device stopped delivering audio")]
    CaptureInterrupted,

    #[error("recording thread panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<TemplateError> for SessionError {
    fn from(e: TemplateError) -> Self {
        Self::Config(ConfigError::Template(e))
    }
}
