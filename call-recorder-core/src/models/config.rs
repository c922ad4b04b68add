use std::fs;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::naming::template::Template;

/// Default filename template: timestamp followed by every optional call detail.
pub const DEFAULT_FILENAME_TEMPLATE: &str =
    "{date}[_{direction}][_sim{sim_slot}][_{phone_number}][_{caller_name}][_{contact_name}]";

/// Output audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/x-wav",
        }
    }

    /// Whether the format takes a tuning parameter.
    pub fn accepts_param(&self, param: &FormatParam) -> bool {
        match (self, param) {
            (Self::Wav, _) => false,
        }
    }
}

/// Format-specific tuning parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatParam {
    Bitrate(u32),
    CompressionLevel(u8),
}

/// How long previous recordings are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    KeepForever,
    Keep(TimeDelta),
}

impl RetentionPolicy {
    pub fn from_days(days: Option<u32>) -> Self {
        match days {
            None => Self::KeepForever,
            Some(d) => TimeDelta::try_days(i64::from(d)).map_or(Self::KeepForever, Self::Keep),
        }
    }
}

/// Configuration snapshot for one recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub format: AudioFormat,

    pub format_param: Option<FormatParam>,

    /// Capture sample rate in Hz (default: 16000).
    pub sample_rate: u32,

    /// Age after which old recordings are pruned (None = keep forever).
    pub retention_days: Option<u32>,

    /// Capture a diagnostic log next to each recording.
    pub debug_mode: bool,

    /// Write a JSON sidecar describing the call.
    pub write_metadata: bool,

    pub filename_template: String,

    /// Always-writable directory recordings are created in.
    pub default_directory: PathBuf,

    /// User-chosen directory recordings are moved to when finished.
    pub output_directory: Option<PathBuf>,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample rate must be positive".into()));
        }
        if self.retention_days == Some(0) {
            return Err(ConfigError::Invalid("retention must be at least one day".into()));
        }
        if let Some(param) = &self.format_param {
            if !self.format.accepts_param(param) {
                return Err(ConfigError::Invalid(format!(
                    "{:?} does not accept parameter {:?}",
                    self.format, param
                )));
            }
        }
        self.filename_template.parse::<Template>()?;
        Ok(())
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_days(self.retention_days)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::Wav,
            format_param: None,
            sample_rate: 16000,
            retention_days: None,
            debug_mode: false,
            write_metadata: false,
            filename_template: DEFAULT_FILENAME_TEMPLATE.into(),
            default_directory: PathBuf::from("."),
            output_directory: None,
        }
    }
}
