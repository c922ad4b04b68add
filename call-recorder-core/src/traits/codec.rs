use crate::models::config::FormatParam;
use crate::models::error::EncodeError;
use crate::traits::capture_source::CaptureParams;
use crate::traits::storage::SeekableFile;

/// Description of the encoded stream handed to the container.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFormat {
    pub mime_type: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub param: Option<FormatParam>,
}

/// Output file format multiplexing encoded frames. Dropping releases it.
pub trait Container {
    fn start(&mut self) -> Result<(), EncodeError>;

    /// Register a track and return its index.
    fn add_track(&mut self, format: &MediaFormat) -> Result<usize, EncodeError>;

    fn write_samples(&mut self, track: usize, data: &[u8]) -> Result<(), EncodeError>;

    fn stop(&mut self) -> Result<(), EncodeError>;
}

/// Streaming encoder. Dropping releases it.
pub trait Encoder {
    fn start(&mut self) -> Result<(), EncodeError>;

    /// Encode a chunk of raw PCM and write any output into `container`.
    ///
    /// The final call passes an empty buffer with `end_of_stream` set.
    fn encode(
        &mut self,
        container: &mut dyn Container,
        pcm: &[u8],
        end_of_stream: bool,
    ) -> Result<(), EncodeError>;

    fn stop(&mut self) -> Result<(), EncodeError>;
}

/// Builds the encoder and container for one output format.
pub trait CodecFactory: Send + Sync {
    fn build_media_format(
        &self,
        capture: &CaptureParams,
        param: Option<FormatParam>,
    ) -> Result<MediaFormat, EncodeError>;

    fn open_container<'a>(
        &self,
        file: &'a mut dyn SeekableFile,
    ) -> Result<Box<dyn Container + 'a>, EncodeError>;

    fn build_encoder(&self, format: &MediaFormat) -> Result<Box<dyn Encoder>, EncodeError>;
}
