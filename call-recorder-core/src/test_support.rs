//! Fakes for collaborator traits used by unit tests. Scripts work at the
//! level of single reads and encoder calls; `tests/common` has the
//! session-level fakes.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::{CaptureError, EncodeError};
use crate::traits::capture_source::{CaptureBackend, CaptureParams, CaptureStream};
use crate::traits::clock::Clock;
use crate::traits::codec::{Container, Encoder, MediaFormat};
use crate::traits::storage::SeekableFile;

/// Simulated clock: `sleep` advances time instantly.
#[derive(Default)]
pub struct FakeClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
    cancel_at: Option<(Duration, Arc<AtomicBool>)>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `flag` once simulated time reaches `at`.
    pub fn cancelling_at(at: Duration, flag: Arc<AtomicBool>) -> Self {
        Self {
            cancel_at: Some((at, flag)),
            ..Self::default()
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        let now = {
            let mut now = self.now.lock();
            *now += duration;
            *now
        };
        if let Some((at, flag)) = &self.cancel_at {
            if now >= *at {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReadStep {
    Data(Vec<u8>),
    /// Deliver data, then request cancellation.
    DataThenCancel(Vec<u8>),
    Empty,
    Error,
}

#[derive(Debug, Default, Clone)]
pub struct CaptureLog {
    pub open_attempts: u32,
    pub opened_with: Vec<usize>,
    pub reads: usize,
    pub events: Vec<&'static str>,
}

/// Capture backend replaying a fixed script of read results.
pub struct ScriptedBackend {
    min_size: usize,
    fail_min_buffer_size: bool,
    failing_opens: u32,
    script: Mutex<VecDeque<ReadStep>>,
    cancel: Option<Arc<AtomicBool>>,
    log: Arc<Mutex<CaptureLog>>,
}

impl ScriptedBackend {
    pub fn new(min_size: usize, script: Vec<ReadStep>) -> Self {
        Self {
            min_size,
            fail_min_buffer_size: false,
            failing_opens: 0,
            script: Mutex::new(script.into()),
            cancel: None,
            log: Arc::new(Mutex::new(CaptureLog::default())),
        }
    }

    pub fn failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = count;
        self
    }

    pub fn failing_min_buffer_size(mut self) -> Self {
        self.fail_min_buffer_size = true;
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn log(&self) -> CaptureLog {
        self.log.lock().clone()
    }
}

impl CaptureBackend for ScriptedBackend {
    fn min_buffer_size(&self, _params: &CaptureParams) -> Result<usize, CaptureError> {
        if self.fail_min_buffer_size {
            return Err(CaptureError::BufferSizeQuery("unsupported parameters".into()));
        }
        Ok(self.min_size)
    }

    fn open(
        &self,
        _params: &CaptureParams,
        buffer_size: usize,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let attempt = {
            let mut log = self.log.lock();
            log.open_attempts += 1;
            log.open_attempts
        };
        if attempt <= self.failing_opens {
            return Err(CaptureError::Stream(format!("open failure {}", attempt)));
        }
        self.log.lock().opened_with.push(buffer_size);
        Ok(Box::new(ScriptedStream {
            script: std::mem::take(&mut *self.script.lock()),
            cancel: self.cancel.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct ScriptedStream {
    script: VecDeque<ReadStep>,
    cancel: Option<Arc<AtomicBool>>,
    log: Arc<Mutex<CaptureLog>>,
}

impl ScriptedStream {
    fn copy_out(data: &[u8], buf: &mut [u8]) -> usize {
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        n
    }
}

impl CaptureStream for ScriptedStream {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.log.lock().events.push("start");
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        self.log.lock().reads += 1;
        match self.script.pop_front() {
            Some(ReadStep::Data(data)) => Ok(Self::copy_out(&data, buf)),
            Some(ReadStep::DataThenCancel(data)) => {
                if let Some(flag) = &self.cancel {
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(Self::copy_out(&data, buf))
            }
            Some(ReadStep::Empty) | None => Ok(0),
            Some(ReadStep::Error) => Err(CaptureError::ReadFailed("dead object".into())),
        }
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.log.lock().events.push("stop");
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.log.lock().events.push("release");
    }
}

#[derive(Debug, Default, Clone)]
pub struct EncoderLog {
    pub chunks: Vec<Vec<u8>>,
    pub end_of_stream: u32,
    pub events: Vec<&'static str>,
}

/// Encoder recording every call; writes PCM straight through.
pub struct RecordingEncoder {
    pub log: Arc<Mutex<EncoderLog>>,
    pub fail_on_chunk: Option<usize>,
    track: Option<usize>,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EncoderLog::default())),
            fail_on_chunk: None,
            track: None,
        }
    }
}

impl Encoder for RecordingEncoder {
    fn start(&mut self) -> Result<(), EncodeError> {
        self.log.lock().events.push("start");
        Ok(())
    }

    fn encode(
        &mut self,
        container: &mut dyn Container,
        pcm: &[u8],
        end_of_stream: bool,
    ) -> Result<(), EncodeError> {
        let mut log = self.log.lock();
        if end_of_stream {
            log.end_of_stream += 1;
        } else {
            if self.fail_on_chunk == Some(log.chunks.len()) {
                return Err(EncodeError::Encoder("codec crashed".into()));
            }
            log.chunks.push(pcm.to_vec());
        }
        let track = match self.track {
            Some(t) => t,
            None => {
                let t = container.add_track(&test_format())?;
                container.start()?;
                self.track = Some(t);
                t
            }
        };
        if !pcm.is_empty() {
            container.write_samples(track, pcm)?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncodeError> {
        self.log.lock().events.push("stop");
        Ok(())
    }
}

impl Drop for RecordingEncoder {
    fn drop(&mut self) {
        self.log.lock().events.push("release");
    }
}

pub fn test_format() -> MediaFormat {
    MediaFormat {
        mime_type: "audio/x-wav".into(),
        sample_rate: 16000,
        channels: 1,
        bits_per_sample: 16,
        param: None,
    }
}

/// Container collecting written samples in memory.
#[derive(Default)]
pub struct MemoryContainer {
    pub data: Vec<u8>,
    pub started: bool,
    pub stopped: bool,
}

impl Container for MemoryContainer {
    fn start(&mut self) -> Result<(), EncodeError> {
        self.started = true;
        Ok(())
    }

    fn add_track(&mut self, _format: &MediaFormat) -> Result<usize, EncodeError> {
        Ok(0)
    }

    fn write_samples(&mut self, _track: usize, data: &[u8]) -> Result<(), EncodeError> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncodeError> {
        self.stopped = true;
        Ok(())
    }
}

/// In-memory seekable file.
#[derive(Default)]
pub struct MemoryFile {
    pub cursor: Cursor<Vec<u8>>,
    pub syncs: u32,
}

impl MemoryFile {
    pub fn bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl SeekableFile for MemoryFile {
    fn sync_all(&mut self) -> io::Result<()> {
        self.syncs += 1;
        Ok(())
    }
}
