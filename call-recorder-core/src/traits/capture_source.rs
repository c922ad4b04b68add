use crate::models::error::CaptureError;

/// Audio source the capture device records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSourceKind {
    VoiceCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelConfig {
    Mono,
}

impl ChannelConfig {
    pub fn channel_count(&self) -> u16 {
        match self {
            Self::Mono => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmEncoding {
    Pcm16,
}

impl PcmEncoding {
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            Self::Pcm16 => 16,
        }
    }
}

/// Parameters the capture device is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureParams {
    pub source: CaptureSourceKind,
    pub sample_rate: u32,
    pub channels: ChannelConfig,
    pub encoding: PcmEncoding,
}

impl CaptureParams {
    /// Mono 16-bit voice call capture at `sample_rate`.
    pub fn voice_call(sample_rate: u32) -> Self {
        Self {
            source: CaptureSourceKind::VoiceCall,
            sample_rate,
            channels: ChannelConfig::Mono,
            encoding: PcmEncoding::Pcm16,
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        usize::from(self.channels.channel_count()) * usize::from(self.encoding.bits_per_sample()) / 8
    }
}

/// Device-level capture API.
///
/// Implemented by the platform audio driver binding.
pub trait CaptureBackend: Send + Sync {
    /// Smallest buffer size in bytes the device accepts for `params`.
    fn min_buffer_size(&self, params: &CaptureParams) -> Result<usize, CaptureError>;

    /// Initialize a capture stream with an internal buffer of `buffer_size` bytes.
    fn open(
        &self,
        params: &CaptureParams,
        buffer_size: usize,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// An initialized capture stream. Dropping the stream releases the device.
pub trait CaptureStream {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Non-blocking read into `buf`.
    ///
    /// Returns `Ok(0)` when no data is currently available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    fn stop(&mut self) -> Result<(), CaptureError>;
}
