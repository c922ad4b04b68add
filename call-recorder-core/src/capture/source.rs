//! Capture device acquisition.

use std::time::Duration;

use crate::models::error::CaptureError;
use crate::traits::capture_source::{CaptureBackend, CaptureParams, CaptureStream};
use crate::traits::clock::Clock;

/// Number of times device initialization is attempted.
pub const INIT_ATTEMPTS: u32 = 5;

/// Delay between initialization attempts.
pub const INIT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Internal device buffer size as a multiple of the minimum, to absorb jitter.
pub const BUFFER_SIZE_FACTOR: usize = 6;

/// Open the capture device, retrying initialization.
///
/// Returns the stream and the minimum buffer size, which is the unit each
/// read is performed in.
pub fn open_capture(
    backend: &dyn CaptureBackend,
    clock: &dyn Clock,
    params: &CaptureParams,
) -> Result<(Box<dyn CaptureStream>, usize), CaptureError> {
    let min_size = match backend.min_buffer_size(params) {
        Ok(0) => {
            return Err(CaptureError::BufferSizeQuery(
                "device reported a zero buffer size".into(),
            ))
        }
        Ok(size) => size,
        Err(CaptureError::BufferSizeQuery(msg)) => return Err(CaptureError::BufferSizeQuery(msg)),
        Err(e) => return Err(CaptureError::BufferSizeQuery(e.to_string())),
    };
    let buffer_size = min_size
        .checked_mul(BUFFER_SIZE_FACTOR)
        .ok_or_else(|| CaptureError::BufferSizeQuery(format!("buffer size overflow: {}", min_size)))?;

    log::debug!(
        "Capture buffer: min {} bytes, device {} bytes",
        min_size,
        buffer_size
    );

    let mut last_error = None;
    for attempt in 1..=INIT_ATTEMPTS {
        match backend.open(params, buffer_size) {
            Ok(stream) => {
                log::info!(
                    "Capture initialized on attempt {}/{}",
                    attempt,
                    INIT_ATTEMPTS
                );
                return Ok((stream, min_size));
            }
            Err(e) => {
                log::warn!(
                    "Capture initialization attempt {}/{} failed: {}",
                    attempt,
                    INIT_ATTEMPTS,
                    e
                );
                last_error = Some(e);
                if attempt < INIT_ATTEMPTS {
                    clock.sleep(INIT_RETRY_DELAY);
                }
            }
        }
    }

    Err(CaptureError::InitFailed {
        attempts: INIT_ATTEMPTS,
        message: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Owns a capture stream and stops it on drop if it is still running.
///
/// Dropping the inner stream afterwards releases the device.
pub struct CaptureGuard {
    stream: Box<dyn CaptureStream>,
    running: bool,
}

impl CaptureGuard {
    pub fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self {
            stream,
            running: false,
        }
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.stream.start()?;
        self.running = true;
        Ok(())
    }

    pub fn stream(&mut self) -> &mut dyn CaptureStream {
        self.stream.as_mut()
    }

    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.stream.stop()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Failed to stop capture: {}", e);
        }
    }
}
