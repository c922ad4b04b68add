//! Built-in codec for the WAV format: a passthrough PCM encoder writing into
//! a RIFF/WAV container.

use std::io::{Seek, SeekFrom, Write};

use crate::models::config::FormatParam;
use crate::models::error::EncodeError;
use crate::processing::wav_format;
use crate::traits::capture_source::CaptureParams;
use crate::traits::codec::{CodecFactory, Container, Encoder, MediaFormat};
use crate::traits::storage::SeekableFile;

pub const WAV_MIME_TYPE: &str = "audio/x-wav";

/// Single-track WAV container writing to an open file.
///
/// The header is written with a zero data size on start and patched on stop.
pub struct WavContainer<'a> {
    file: &'a mut dyn SeekableFile,
    format: Option<MediaFormat>,
    started: bool,
    data_bytes: u64,
}

impl<'a> WavContainer<'a> {
    pub fn new(file: &'a mut dyn SeekableFile) -> Self {
        Self {
            file,
            format: None,
            started: false,
            data_bytes: 0,
        }
    }

    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }
}

impl Container for WavContainer<'_> {
    fn start(&mut self) -> Result<(), EncodeError> {
        if self.started {
            return Err(EncodeError::Container("container already started".into()));
        }
        let format = self
            .format
            .as_ref()
            .ok_or_else(|| EncodeError::Container("no track added".into()))?;

        let header = wav_format::header(format, 0);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header)?;
        self.started = true;
        Ok(())
    }

    fn add_track(&mut self, format: &MediaFormat) -> Result<usize, EncodeError> {
        if self.format.is_some() {
            return Err(EncodeError::Container("WAV supports a single track".into()));
        }
        if self.started {
            return Err(EncodeError::Container("cannot add a track after start".into()));
        }
        self.format = Some(format.clone());
        Ok(0)
    }

    fn write_samples(&mut self, track: usize, data: &[u8]) -> Result<(), EncodeError> {
        if !self.started {
            return Err(EncodeError::Container("container not started".into()));
        }
        if track != 0 {
            return Err(EncodeError::Container(format!("invalid track {}", track)));
        }
        self.file.write_all(data)?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncodeError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;

        wav_format::patch_sizes(&mut *self.file, self.data_bytes)?;
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

/// Encoder that writes raw PCM through unchanged.
pub struct PassthroughEncoder {
    format: MediaFormat,
    track: Option<usize>,
    started: bool,
}

impl PassthroughEncoder {
    pub fn new(format: MediaFormat) -> Self {
        Self {
            format,
            track: None,
            started: false,
        }
    }
}

impl Encoder for PassthroughEncoder {
    fn start(&mut self) -> Result<(), EncodeError> {
        self.started = true;
        Ok(())
    }

    fn encode(
        &mut self,
        container: &mut dyn Container,
        pcm: &[u8],
        end_of_stream: bool,
    ) -> Result<(), EncodeError> {
        if !self.started {
            return Err(EncodeError::Encoder("encoder not started".into()));
        }

        // The container starts once the output format is known, which for
        // passthrough is the first buffer.
        let track = match self.track {
            Some(track) => track,
            None => {
                let track = container.add_track(&self.format)?;
                container.start()?;
                self.track = Some(track);
                track
            }
        };

        if !pcm.is_empty() {
            container.write_samples(track, pcm)?;
        }
        if end_of_stream {
            log::debug!("Passthrough encoder reached end of stream");
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EncodeError> {
        self.started = false;
        Ok(())
    }
}

/// Codec factory for [`AudioFormat::Wav`](crate::models::config::AudioFormat::Wav).
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl CodecFactory for WavCodec {
    fn build_media_format(
        &self,
        capture: &CaptureParams,
        param: Option<FormatParam>,
    ) -> Result<MediaFormat, EncodeError> {
        if let Some(param) = param {
            return Err(EncodeError::Encoder(format!(
                "WAV does not accept parameter {:?}",
                param
            )));
        }
        Ok(MediaFormat {
            mime_type: WAV_MIME_TYPE.into(),
            sample_rate: capture.sample_rate,
            channels: capture.channels.channel_count(),
            bits_per_sample: capture.encoding.bits_per_sample(),
            param: None,
        })
    }

    fn open_container<'a>(
        &self,
        file: &'a mut dyn SeekableFile,
    ) -> Result<Box<dyn Container + 'a>, EncodeError> {
        Ok(Box::new(WavContainer::new(file)))
    }

    fn build_encoder(&self, format: &MediaFormat) -> Result<Box<dyn Encoder>, EncodeError> {
        Ok(Box::new(PassthroughEncoder::new(format.clone())))
    }
}
