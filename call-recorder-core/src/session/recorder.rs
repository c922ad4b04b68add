use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::capture::source::{open_capture, CaptureGuard};
use crate::models::call::{CallMetadata, DeviceContext};
use crate::models::config::RecorderConfig;
use crate::models::error::{ConfigError, SessionError};
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::SessionState;
use crate::naming::filename::OutputNaming;
use crate::naming::redactor::Redact;
use crate::naming::template::Template;
use crate::processing::encode_loop::{EncodeLoop, LoopStats};
use crate::processing::guards::{ContainerGuard, EncoderGuard};
use crate::processing::wav_codec::WavCodec;
use crate::session::diagnostic_log::DiagnosticLog;
use crate::storage::lifecycle::OutputManager;
use crate::storage::{metadata, retention};
use crate::traits::capture_source::{CaptureBackend, CaptureParams};
use crate::traits::clock::{Clock, SystemClock};
use crate::traits::codec::CodecFactory;
use crate::traits::log_capture::LogCapture;
use crate::traits::recording_listener::RecordingListener;
use crate::traits::storage::{Artifact, Storage};

/// External systems a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn CaptureBackend>,
    pub storage: Arc<dyn Storage>,
    /// Encoder and container for the configured format.
    pub codecs: Arc<dyn CodecFactory>,
    pub clock: Arc<dyn Clock>,
    pub log_capture: Option<Arc<dyn LogCapture>>,
}

impl Collaborators {
    /// WAV output on the system clock, without diagnostic log capture.
    pub fn new(capture: Arc<dyn CaptureBackend>, storage: Arc<dyn Storage>) -> Self {
        Self {
            capture,
            storage,
            codecs: Arc::new(WavCodec),
            clock: Arc::new(SystemClock::new()),
            log_capture: None,
        }
    }

    pub fn with_codecs(mut self, codecs: Arc<dyn CodecFactory>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_log_capture(mut self, log_capture: Arc<dyn LogCapture>) -> Self {
        self.log_capture = Some(log_capture);
        self
    }
}

/// Failure of the capture stage. `started` is set once audio may have
/// reached the output file.
struct StageError {
    error: SessionError,
    started: bool,
}

impl StageError {
    fn setup(error: impl Into<SessionError>) -> Self {
        Self {
            error: error.into(),
            started: false,
        }
    }

    fn streaming(error: impl Into<SessionError>) -> Self {
        Self {
            error: error.into(),
            started: true,
        }
    }
}

/// Terminal failure with the best known location of recorded audio.
struct Failure {
    error: SessionError,
    artifact: Option<Artifact>,
}

impl Failure {
    fn without_output(error: impl Into<SessionError>) -> Self {
        Self {
            error: error.into(),
            artifact: None,
        }
    }
}

/// Audio artifact the session currently owns. `streaming` is set once audio
/// may have reached it.
struct OwnedOutput {
    artifact: Artifact,
    streaming: bool,
}

/// Records one call to a file.
///
/// Created when the call begins; [`RecordingSession::start`] runs the whole
/// pipeline on a dedicated thread:
/// ```text
/// [Capture] → [EncodeLoop] → [Encoder] → [Container] → default dir
///                                                          ↓ rename / move
///                                                      user dir → retention sweep
/// ```
/// Exactly one of [`RecordingListener::on_completed`] and
/// [`RecordingListener::on_failed`] is invoked per session.
pub struct RecordingSession {
    config: RecorderConfig,
    naming: OutputNaming,
    collaborators: Collaborators,
    listener: Arc<dyn RecordingListener>,
    state: Mutex<SessionState>,
    output: Mutex<Option<OwnedOutput>>,
    cancelled: AtomicBool,
    capture_failed: AtomicBool,
    reported: AtomicBool,
}

impl RecordingSession {
    pub fn new(
        config: RecorderConfig,
        metadata: CallMetadata,
        device: DeviceContext,
        collaborators: Collaborators,
        listener: Arc<dyn RecordingListener>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            naming: OutputNaming::new(metadata, device),
            collaborators,
            listener,
            state: Mutex::new(SessionState::Init),
            output: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            capture_failed: AtomicBool::new(false),
            reported: AtomicBool::new(false),
        })
    }

    /// Spawn the recording thread.
    pub fn start(self: &Arc<Self>) -> io::Result<thread::JoinHandle<()>> {
        let session = Arc::clone(self);
        thread::Builder::new()
            .name("call-recorder".into())
            .spawn(move || session.run())
    }

    /// Request the recording to stop. Safe to call from any thread, any
    /// number of times.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            log::debug!("Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Current output filename, without extension. `None` until the template
    /// has been loaded.
    pub fn filename(&self) -> Option<String> {
        self.naming.current()
    }

    /// Notification from the telephony layer that call details changed.
    pub fn on_metadata_changed(&self, metadata: CallMetadata, device: DeviceContext) {
        match self.naming.update(metadata, device) {
            Some(name) => log::debug!("Updated filename: {}", self.naming.redact(&name)),
            None => log::debug!("Deferring metadata change until the template is loaded"),
        }
    }

    /// Thread body. Always ends with exactly one listener callback.
    pub fn run(&self) {
        log::info!("Recording session started");
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_stages())) {
            Ok(Ok(result)) => self.report_completed(&result),
            Ok(Err(failure)) => self.report_failed(&failure.error, failure.artifact.as_ref()),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Recording thread panicked: {}", self.naming.redact(&message));
                let artifact = self.salvage_output();
                self.report_failed(&SessionError::Panicked(message), artifact.as_ref());
            }
        }
    }

    fn run_stages(&self) -> Result<RecordingResult, Failure> {
        self.set_state(SessionState::AwaitingFilename);
        let template = self
            .config
            .filename_template
            .parse::<Template>()
            .map_err(Failure::without_output)?;
        let initial_name = self.naming.load_template(template);

        if self.is_cancelled() {
            log::info!("Recording cancelled before it began");
            return Err(Failure::without_output(SessionError::CancelledBeforeStart));
        }

        let output = OutputManager::new(self.collaborators.storage.as_ref(), &self.naming);
        let diagnostics = match (&self.collaborators.log_capture, self.config.debug_mode) {
            (Some(capture), true) => DiagnosticLog::start(Arc::clone(capture), &output, &initial_name),
            (None, true) => {
                log::debug!("Debug mode is enabled but no log capture is available");
                None
            }
            (_, false) => None,
        };

        let mut outcome = self.record_and_finalize(&output, &initial_name);

        if let Some(diagnostic) = diagnostics {
            let final_name = self.current_name(&initial_name);
            let artifact = diagnostic.finish(&output, &initial_name, &final_name);
            if let Ok(result) = &mut outcome {
                result.additional_artifacts.push(artifact);
            }
        }

        self.set_state(SessionState::Reporting);
        outcome
    }

    fn record_and_finalize(&self, output: &OutputManager<'_>, initial_name: &str) -> Result<RecordingResult, Failure> {
        self.set_state(SessionState::OpeningOutput);
        let artifact = output
            .create_in_default_dir(initial_name, self.config.format.mime_type())
            .map_err(Failure::without_output)?;
        self.own_output(Some(artifact.clone()));

        let (stats, error) = match self.record(output, &artifact) {
            Ok(stats) if self.capture_failed.load(Ordering::Acquire) => {
                (stats, Some(SessionError::CaptureInterrupted))
            }
            Ok(stats) => (stats, None),
            Err(StageError { error, started: false }) => {
                log::error!("Failed to start recording: {}", self.naming.redact(&error.to_string()));
                output.discard(&artifact);
                self.own_output(None);
                return Err(Failure::without_output(error));
            }
            Err(StageError { error, started: true }) => {
                log::error!("Recording failed: {}", self.naming.redact(&error.to_string()));
                (LoopStats::default(), Some(error))
            }
        };

        self.set_state(SessionState::Finalizing);
        let final_name = self.current_name(initial_name);
        let artifact = output.rename_if_changed(artifact, initial_name, &final_name);
        self.own_output(Some(artifact.clone()));

        self.set_state(SessionState::Moving);
        let artifact = output.relocate(artifact, &final_name);
        self.own_output(Some(artifact.clone()));

        let duration_secs = stats.duration_secs(self.config.sample_rate);
        let mut additional_artifacts = Vec::new();
        if self.config.write_metadata {
            additional_artifacts.extend(self.write_sidecar(output, &final_name, duration_secs));
        }

        if let Some(error) = error {
            return Err(Failure {
                error,
                artifact: Some(artifact),
            });
        }

        self.set_state(SessionState::RetentionSweep);
        self.sweep_retention();

        Ok(RecordingResult {
            artifact,
            additional_artifacts,
            duration_secs,
            frames: stats.frames,
        })
    }

    /// Capture into `artifact` until cancelled.
    ///
    /// Resources are released in reverse order of acquisition: encoder,
    /// container, capture stream, file.
    fn record(&self, output: &OutputManager<'_>, artifact: &Artifact) -> Result<LoopStats, StageError> {
        let codecs = self.collaborators.codecs.as_ref();
        let clock = self.collaborators.clock.as_ref();
        let params = CaptureParams::voice_call(self.config.sample_rate);

        let mut file = output
            .open_for_read_write(artifact, true)
            .map_err(StageError::setup)?;
        let (stream, read_size) = open_capture(self.collaborators.capture.as_ref(), clock, &params)
            .map_err(StageError::setup)?;
        let mut capture = CaptureGuard::new(stream);

        let format = codecs
            .build_media_format(&params, self.config.format_param)
            .map_err(StageError::setup)?;
        let mut container = ContainerGuard::new(codecs.open_container(file.as_mut()).map_err(StageError::setup)?);
        let mut encoder = EncoderGuard::new(codecs.build_encoder(&format).map_err(StageError::setup)?);

        if self.is_cancelled() {
            return Err(StageError::setup(SessionError::CancelledBeforeStart));
        }

        encoder.start().map_err(StageError::setup)?;
        capture.start().map_err(StageError::setup)?;

        self.set_state(SessionState::Recording);
        if let Some(owned) = self.output.lock().as_mut() {
            owned.streaming = true;
        }
        log::info!(
            "Recording {} Hz {} to {}",
            params.sample_rate,
            format.mime_type,
            self.naming.redact(&artifact.name)
        );

        let stats = EncodeLoop::new(clock, &self.cancelled, &self.capture_failed, params)
            .run(capture.stream(), encoder.encoder(), container.container(), read_size)
            .map_err(StageError::streaming)?;

        encoder.finish().map_err(StageError::streaming)?;
        container.finish().map_err(StageError::streaming)?;
        if let Err(e) = capture.stop() {
            log::warn!("Failed to stop capture: {}", e);
        }

        log::info!(
            "Captured {} frames ({:.1}s)",
            stats.frames,
            stats.duration_secs(self.config.sample_rate)
        );
        Ok(stats)
    }

    fn write_sidecar(&self, output: &OutputManager<'_>, name: &str, duration_secs: f64) -> Option<Artifact> {
        let storage = self.collaborators.storage.as_ref();
        let sidecar = RecordingMetadata::from_call(
            &self.naming.metadata(),
            self.config.format,
            self.config.sample_rate,
            duration_secs,
        );
        match metadata::write_metadata(storage, &storage.default_directory(), name, &sidecar, &self.naming) {
            Ok(artifact) => Some(output.relocate(artifact, name)),
            Err(e) => {
                log::warn!("Failed to write metadata: {}", self.naming.redact(&e.to_string()));
                None
            }
        }
    }

    fn sweep_retention(&self) {
        let storage = self.collaborators.storage.as_ref();
        let dir = storage
            .user_directory()
            .unwrap_or_else(|| storage.default_directory());
        let result = retention::sweep(
            storage,
            &dir,
            self.config.retention(),
            self.naming.call_timestamp(),
            &self.naming.timestamp_codec(),
            &self.naming,
        );
        if let Err(e) = result {
            log::warn!("Retention sweep failed: {}", self.naming.redact(&e.to_string()));
        }
    }

    /// Track the audio artifact, keeping the streaming flag of the current one.
    fn own_output(&self, artifact: Option<Artifact>) {
        let mut output = self.output.lock();
        let streaming = output.as_ref().map_or(false, |o| o.streaming);
        *output = artifact.map(|artifact| OwnedOutput { artifact, streaming });
    }

    /// Best known audio artifact after a panic. Output that never received
    /// audio is deleted, like any other failure before streaming.
    fn salvage_output(&self) -> Option<Artifact> {
        let owned = self.output.lock().take()?;
        if owned.streaming {
            return Some(owned.artifact);
        }
        OutputManager::new(self.collaborators.storage.as_ref(), &self.naming).discard(&owned.artifact);
        None
    }

    fn current_name(&self, fallback: &str) -> String {
        self.naming.current().unwrap_or_else(|| fallback.to_string())
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
        log::debug!("Session state: {:?}", state);
        self.listener.on_state_changed(state);
    }

    fn report_completed(&self, result: &RecordingResult) {
        if self.reported.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("Recording completed: {}", self.naming.redact(&result.artifact.uri));
        self.set_state(SessionState::Completed);
        self.listener.on_completed(result);
    }

    fn report_failed(&self, error: &SessionError, artifact: Option<&Artifact>) {
        if self.reported.swap(true, Ordering::AcqRel) {
            return;
        }
        match artifact {
            Some(a) => log::warn!(
                "Recording failed with partial output {}: {}",
                self.naming.redact(&a.uri),
                self.naming.redact(&error.to_string())
            ),
            None => log::warn!("Recording failed: {}", self.naming.redact(&error.to_string())),
        }
        self.set_state(SessionState::Failed);
        self.listener.on_failed(error, artifact);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
