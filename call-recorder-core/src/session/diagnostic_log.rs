use std::sync::Arc;

use crate::storage::lifecycle::OutputManager;
use crate::traits::log_capture::LogCapture;
use crate::traits::storage::Artifact;

pub const LOG_MIME_TYPE: &str = "text/plain";

/// Diagnostic log artifact fed by a [`LogCapture`] for the session's lifetime.
///
/// Capture is stopped on drop if [`DiagnosticLog::finish`] was never reached.
pub struct DiagnosticLog {
    capture: Arc<dyn LogCapture>,
    artifact: Artifact,
    active: bool,
}

impl DiagnosticLog {
    /// Create `<name>.log` in the default directory and start capturing into
    /// it. Failures are logged and yield `None`.
    pub fn start(capture: Arc<dyn LogCapture>, output: &OutputManager<'_>, name: &str) -> Option<Self> {
        let artifact = match output.create_in_default_dir(name, LOG_MIME_TYPE) {
            Ok(artifact) => artifact,
            Err(e) => {
                log::warn!("Failed to create diagnostic log: {}", output.redact(&e.to_string()));
                return None;
            }
        };

        let started = output
            .open_for_read_write(&artifact, true)
            .and_then(|sink| capture.start(sink));
        if let Err(e) = started {
            log::warn!("Failed to start diagnostic log: {}", output.redact(&e.to_string()));
            output.discard(&artifact);
            return None;
        }

        Some(Self {
            capture,
            artifact,
            active: true,
        })
    }

    /// Stop capturing, then rename and move the log like the recording.
    pub fn finish(mut self, output: &OutputManager<'_>, created_name: &str, final_name: &str) -> Artifact {
        self.stop();
        let artifact = output.rename_if_changed(self.artifact.clone(), created_name, final_name);
        output.relocate(artifact, final_name)
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.capture.stop();
        }
    }
}

impl Drop for DiagnosticLog {
    fn drop(&mut self) {
        self.stop();
    }
}
