use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::call::{CallDirection, CallMetadata};
use super::config::AudioFormat;
use crate::traits::storage::Artifact;

/// Result reported when a session records successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    /// Final location of the audio file.
    pub artifact: Artifact,

    /// Side artifacts (diagnostic log, metadata sidecar) at their final location.
    pub additional_artifacts: Vec<Artifact>,

    pub duration_secs: f64,

    pub frames: u64,
}

/// Call description written as a JSON sidecar next to a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub timestamp: DateTime<FixedOffset>,
    pub timestamp_unix_ms: i64,
    pub direction: Option<CallDirection>,
    /// One-based, matching the filename variable.
    pub sim_slot: Option<u32>,
    pub phone_number: Option<String>,
    pub caller_name: Option<String>,
    pub contact_name: Option<String>,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

impl RecordingMetadata {
    pub fn from_call(
        call: &CallMetadata,
        format: AudioFormat,
        sample_rate: u32,
        duration_secs: f64,
    ) -> Self {
        Self {
            timestamp: call.timestamp,
            timestamp_unix_ms: call.timestamp.timestamp_millis(),
            direction: call.direction,
            sim_slot: call.sim_slot.map(|s| s + 1),
            phone_number: call.phone_number.clone(),
            caller_name: call.caller_name.clone(),
            contact_name: call.contact_name.clone(),
            format,
            sample_rate,
            duration_secs,
        }
    }
}
