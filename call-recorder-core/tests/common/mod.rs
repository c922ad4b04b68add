//! Collaborator fakes shared by the integration tests. They drive whole
//! sessions through the public API; per-module fakes live in the crate's
//! `test_support`.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use call_recorder_core::{
    Artifact, CallDirection, CallMetadata, CaptureBackend, CaptureError, CaptureParams, CaptureStream, Clock,
    Collaborators, DeviceContext, DirectoryRef, FsStorage, LogCapture, OpenMode, RecorderConfig,
    RecordingListener, RecordingResult, RecordingSession, SeekableFile, SessionError, SessionState, Storage,
    StorageError,
};
use chrono::{DateTime, FixedOffset, TimeZone};
use parking_lot::Mutex;

pub const READ_SIZE: usize = 640;

pub fn call_timestamp() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 1, 10, 20, 30)
        .unwrap()
}

pub fn incoming_call() -> CallMetadata {
    CallMetadata {
        direction: Some(CallDirection::In),
        phone_number: Some("+15551234567".into()),
        ..CallMetadata::new(call_timestamp())
    }
}

/// Time stands still; sleeping returns immediately.
#[derive(Default)]
pub struct InstantClock;

impl Clock for InstantClock {
    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn sleep(&self, _duration: Duration) {
        thread::yield_now();
    }
}

/// What the capture stream does once its chunks run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// Run the exhaustion hook, then deliver silence (zero-byte reads).
    Hook,
    /// Fail every further read.
    ReadError,
}

type Hook = Box<dyn FnOnce() + Send>;

struct CaptureShared {
    chunks: Mutex<VecDeque<Vec<u8>>>,
    ending: Ending,
    hook: Mutex<Option<Hook>>,
    released: AtomicBool,
}

/// Capture backend delivering fixed PCM chunks.
pub struct ScriptedCapture {
    shared: Arc<CaptureShared>,
    failing_opens: u32,
    opens: AtomicU32,
}

impl ScriptedCapture {
    pub fn new(chunks: usize, ending: Ending) -> Arc<Self> {
        let data: VecDeque<Vec<u8>> = (0..chunks)
            .map(|i| (0..READ_SIZE).map(|b| (b + i) as u8).collect::<Vec<u8>>())
            .collect();
        Arc::new(Self::with(data, ending, 0))
    }

    pub fn failing(failing_opens: u32) -> Arc<Self> {
        Arc::new(Self::with(VecDeque::new(), Ending::Hook, failing_opens))
    }

    fn with(chunks: VecDeque<Vec<u8>>, ending: Ending, failing_opens: u32) -> Self {
        Self {
            shared: Arc::new(CaptureShared {
                chunks: Mutex::new(chunks),
                ending,
                hook: Mutex::new(None),
                released: AtomicBool::new(false),
            }),
            failing_opens,
            opens: AtomicU32::new(0),
        }
    }

    pub fn on_exhausted(&self, hook: impl FnOnce() + Send + 'static) {
        *self.shared.hook.lock() = Some(Box::new(hook));
    }

    /// Cancel `session` once every chunk has been read.
    pub fn cancel_when_done(&self, session: &Arc<RecordingSession>) {
        let session: Weak<RecordingSession> = Arc::downgrade(session);
        self.on_exhausted(move || {
            if let Some(session) = session.upgrade() {
                session.cancel();
            }
        });
    }

    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.shared.released.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for ScriptedCapture {
    fn min_buffer_size(&self, _params: &CaptureParams) -> Result<usize, CaptureError> {
        Ok(READ_SIZE)
    }

    fn open(&self, _params: &CaptureParams, _buffer_size: usize) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failing_opens {
            return Err(CaptureError::DeviceNotAvailable);
        }
        Ok(Box::new(ScriptedStream {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ScriptedStream {
    shared: Arc<CaptureShared>,
}

impl CaptureStream for ScriptedStream {
    fn start(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        if let Some(chunk) = self.shared.chunks.lock().pop_front() {
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            return Ok(n);
        }
        match self.shared.ending {
            Ending::ReadError => Err(CaptureError::ReadFailed("device lost".into())),
            Ending::Hook => {
                let hook = self.shared.hook.lock().take();
                if let Some(hook) = hook {
                    hook();
                }
                Ok(0)
            }
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.shared.released.store(true, Ordering::SeqCst);
    }
}

/// Capture backend that panics when queried.
pub struct PanickingCapture;

impl CaptureBackend for PanickingCapture {
    fn min_buffer_size(&self, _params: &CaptureParams) -> Result<usize, CaptureError> {
        panic!("audio service died");
    }

    fn open(&self, _params: &CaptureParams, _buffer_size: usize) -> Result<Box<dyn CaptureStream>, CaptureError> {
        Err(CaptureError::DeviceNotAvailable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(RecordingResult),
    Failed(SessionError, Option<Artifact>),
}

/// Listener recording every notification.
#[derive(Default)]
pub struct EventLog {
    pub states: Mutex<Vec<SessionState>>,
    pub outcomes: Mutex<Vec<Outcome>>,
    pub threads: Mutex<Vec<Option<String>>>,
}

impl EventLog {
    pub fn outcome(&self) -> Outcome {
        let outcomes = self.outcomes.lock();
        assert_eq!(outcomes.len(), 1, "expected exactly one terminal callback");
        outcomes[0].clone()
    }

    pub fn completed(&self) -> RecordingResult {
        match self.outcome() {
            Outcome::Completed(result) => result,
            other => panic!("expected success, got {:?}", other),
        }
    }

    pub fn failed(&self) -> (SessionError, Option<Artifact>) {
        match self.outcome() {
            Outcome::Failed(error, artifact) => (error, artifact),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().clone()
    }

    fn record_thread(&self) {
        self.threads
            .lock()
            .push(thread::current().name().map(str::to_string));
    }
}

impl RecordingListener for EventLog {
    fn on_state_changed(&self, state: SessionState) {
        self.states.lock().push(state);
    }

    fn on_completed(&self, result: &RecordingResult) {
        self.record_thread();
        self.outcomes.lock().push(Outcome::Completed(result.clone()));
    }

    fn on_failed(&self, error: &SessionError, artifact: Option<&Artifact>) {
        self.record_thread();
        self.outcomes
            .lock()
            .push(Outcome::Failed(error.clone(), artifact.cloned()));
    }
}

/// Log capture writing start/stop markers into its sink.
#[derive(Default)]
pub struct MarkerLogCapture {
    sink: Mutex<Option<Box<dyn SeekableFile>>>,
    pub stops: AtomicU32,
}

impl LogCapture for MarkerLogCapture {
    fn start(&self, mut sink: Box<dyn SeekableFile>) -> Result<(), StorageError> {
        writeln!(sink, "log started")?;
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if let Some(mut sink) = self.sink.lock().take() {
            let _ = writeln!(sink, "log stopped");
            let _ = sink.sync_all();
        }
    }
}

/// [`FsStorage`] with injectable faults.
pub struct FaultyStorage {
    inner: FsStorage,
    /// Reads of opened artifacts stop after this many bytes.
    pub short_reads: Option<u64>,
    pub fail_create: bool,
}

impl FaultyStorage {
    pub fn new(inner: FsStorage) -> Self {
        Self {
            inner,
            short_reads: None,
            fail_create: false,
        }
    }
}

struct ShortReader {
    file: Box<dyn SeekableFile>,
    remaining: u64,
}

impl Read for ShortReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = buf.len().min(self.remaining as usize);
        let n = self.file.read(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl Write for ShortReader {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for ShortReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl SeekableFile for ShortReader {
    fn sync_all(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

impl Storage for FaultyStorage {
    fn default_directory(&self) -> DirectoryRef {
        self.inner.default_directory()
    }

    fn user_directory(&self) -> Option<DirectoryRef> {
        self.inner.user_directory()
    }

    fn create_file(&self, dir: &DirectoryRef, mime_type: &str, name: &str) -> Result<Artifact, StorageError> {
        if self.fail_create {
            return Err(StorageError::CreateFailed {
                name: name.to_string(),
                message: "read-only file system".into(),
            });
        }
        self.inner.create_file(dir, mime_type, name)
    }

    fn open(&self, artifact: &Artifact, mode: OpenMode) -> Result<Box<dyn SeekableFile>, StorageError> {
        let file = self.inner.open(artifact, mode)?;
        match (mode, self.short_reads) {
            (OpenMode::Read, Some(limit)) => Ok(Box::new(ShortReader { file, remaining: limit })),
            _ => Ok(file),
        }
    }

    fn rename(&self, artifact: &Artifact, new_name: &str) -> Result<Artifact, StorageError> {
        self.inner.rename(artifact, new_name)
    }

    fn delete(&self, artifact: &Artifact) -> Result<(), StorageError> {
        self.inner.delete(artifact)
    }

    fn list_files(&self, dir: &DirectoryRef) -> Result<Vec<Artifact>, StorageError> {
        self.inner.list_files(dir)
    }
}

/// Scratch default and user directories.
pub struct Dirs {
    _tmp: tempfile::TempDir,
    pub default_dir: PathBuf,
    pub user_dir: PathBuf,
}

impl Dirs {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let default_dir = tmp.path().join("default");
        let user_dir = tmp.path().join("user");
        fs::create_dir(&user_dir).unwrap();
        Self {
            _tmp: tmp,
            default_dir,
            user_dir,
        }
    }

    pub fn config(&self, with_user_dir: bool) -> RecorderConfig {
        RecorderConfig {
            default_directory: self.default_dir.clone(),
            output_directory: with_user_dir.then(|| self.user_dir.clone()),
            ..RecorderConfig::default()
        }
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub struct Setup {
    pub capture: Arc<ScriptedCapture>,
    pub listener: Arc<EventLog>,
    pub session: Arc<RecordingSession>,
}

/// Session over [`FsStorage`] whose capture cancels once its chunks are read.
pub fn session(config: RecorderConfig, metadata: CallMetadata, device: DeviceContext, capture: Arc<ScriptedCapture>) -> Setup {
    let storage = Arc::new(FsStorage::from_config(&config));
    session_with(config, metadata, device, capture, storage, None)
}

pub fn session_with(
    config: RecorderConfig,
    metadata: CallMetadata,
    device: DeviceContext,
    capture: Arc<ScriptedCapture>,
    storage: Arc<dyn Storage>,
    log_capture: Option<Arc<dyn LogCapture>>,
) -> Setup {
    let listener = Arc::new(EventLog::default());
    let mut collaborators = Collaborators::new(capture.clone(), storage).with_clock(Arc::new(InstantClock));
    if let Some(log_capture) = log_capture {
        collaborators = collaborators.with_log_capture(log_capture);
    }
    let session = Arc::new(
        RecordingSession::new(config, metadata, device, collaborators, listener.clone()).unwrap(),
    );
    capture.cancel_when_done(&session);
    Setup {
        capture,
        listener,
        session,
    }
}
