//! Real-time capture → encoder loop.
//!
//! ```text
//! STREAMING ──(cancel requested / read error)──→ DRAINING ──→ DONE
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::error::EncodeError;
use crate::traits::capture_source::{CaptureParams, CaptureStream};
use crate::traits::clock::Clock;
use crate::traits::codec::{Container, Encoder};

/// Counters collected while streaming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub reads: u64,
    pub empty_reads: u64,
    pub overruns: u64,
}

impl LoopStats {
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.frames as f64 / f64::from(sample_rate)
    }
}

/// Nominal playback duration of `read_size` bytes of PCM.
pub fn buffer_duration(read_size: usize, params: &CaptureParams) -> Duration {
    let frames = (read_size / params.bytes_per_frame().max(1)) as u64;
    Duration::from_nanos(frames * 1_000_000_000 / u64::from(params.sample_rate.max(1)))
}

pub struct EncodeLoop<'a> {
    clock: &'a dyn Clock,
    cancelled: &'a AtomicBool,
    capture_failed: &'a AtomicBool,
    params: CaptureParams,
}

impl<'a> EncodeLoop<'a> {
    pub fn new(
        clock: &'a dyn Clock,
        cancelled: &'a AtomicBool,
        capture_failed: &'a AtomicBool,
        params: CaptureParams,
    ) -> Self {
        Self {
            clock,
            cancelled,
            capture_failed,
            params,
        }
    }

    /// Stream until cancelled, then send the end-of-stream marker.
    ///
    /// A capture read error sets both the capture-failure and cancellation
    /// flags and drains like a normal cancellation. Encoder errors are
    /// returned without draining.
    pub fn run(
        &self,
        capture: &mut dyn CaptureStream,
        encoder: &mut dyn Encoder,
        container: &mut dyn Container,
        read_size: usize,
    ) -> Result<LoopStats, EncodeError> {
        let frame_bytes = self.params.bytes_per_frame().max(1);
        let buffer_duration = buffer_duration(read_size, &self.params);
        let mut buffer = vec![0u8; read_size];
        let mut stats = LoopStats::default();

        log::info!(
            "Streaming {} byte buffers ({:?} per buffer)",
            read_size,
            buffer_duration
        );

        while !self.cancelled.load(Ordering::Acquire) {
            let begin = self.clock.now();
            let n = match capture.read(&mut buffer) {
                Ok(n) => n.min(buffer.len()),
                Err(e) => {
                    log::error!("Capture read failed, stopping: {}", e);
                    self.capture_failed.store(true, Ordering::Release);
                    self.cancelled.store(true, Ordering::Release);
                    break;
                }
            };
            stats.reads += 1;

            if n == 0 {
                // Nothing buffered yet; some devices also stop producing
                // data without reporting an error.
                stats.empty_reads += 1;
                self.clock.sleep(buffer_duration / 2);
                continue;
            }

            let read_done = self.clock.now();
            encoder.encode(container, &buffer[..n], false)?;
            let encode_done = self.clock.now();

            let stream_time = Duration::from_secs_f64(stats.duration_secs(self.params.sample_rate));
            stats.frames += (n / frame_bytes) as u64;

            let read_elapsed = read_done.saturating_sub(begin);
            let encode_elapsed = encode_done.saturating_sub(read_done);
            if encode_elapsed > buffer_duration {
                stats.overruns += 1;
                log::warn!(
                    "Encoding may be falling behind at {:?}: buffer={:?}, total={:?}, read={:?}, encode={:?}",
                    stream_time,
                    buffer_duration,
                    encode_done.saturating_sub(begin),
                    read_elapsed,
                    encode_elapsed
                );
            }
        }

        log::info!(
            "Draining encoder after {} frames ({} reads, {} empty)",
            stats.frames,
            stats.reads,
            stats.empty_reads
        );
        encoder.encode(container, &[], true)?;

        Ok(stats)
    }
}
