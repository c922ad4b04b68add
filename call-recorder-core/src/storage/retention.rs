use chrono::{DateTime, FixedOffset};

use crate::models::config::RetentionPolicy;
use crate::models::error::StorageError;
use crate::naming::redactor::Redact;
use crate::naming::timestamp::TimestampCodec;
use crate::traits::storage::{DirectoryRef, Storage};

/// Outcome counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub kept: usize,
    /// Names without a recognizable timestamp.
    pub skipped: usize,
    pub failed: usize,
}

/// Delete artifacts in `dir` whose embedded timestamp is further than the
/// retention window from `reference`.
///
/// Files are kept when the distance is exactly the window. Names the codec
/// cannot parse are never deleted. Per-file failures are logged and counted;
/// only a failure to list the directory is returned.
pub fn sweep(
    storage: &dyn Storage,
    dir: &DirectoryRef,
    policy: RetentionPolicy,
    reference: DateTime<FixedOffset>,
    codec: &TimestampCodec,
    redact: &dyn Redact,
) -> Result<SweepReport, StorageError> {
    let window = match policy {
        RetentionPolicy::KeepForever => return Ok(SweepReport::default()),
        RetentionPolicy::Keep(window) => window,
    };

    let mut report = SweepReport::default();
    for artifact in storage.list_files(dir)? {
        let name = redact.redact(&artifact.name);
        let Some(timestamp) = codec.parse(&artifact.name) else {
            log::warn!("Ignoring unrecognized file: {}", name);
            report.skipped += 1;
            continue;
        };

        let age = (timestamp - reference).abs();
        if age <= window {
            report.kept += 1;
            continue;
        }

        log::info!("Deleting {} ({} days old)", name, age.num_days());
        match storage.delete(&artifact) {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                log::warn!("Failed to delete {}: {}", name, redact.redact(&e.to_string()));
                report.failed += 1;
            }
        }
    }

    log::debug!("Retention sweep: {:?}", report);
    Ok(report)
}
