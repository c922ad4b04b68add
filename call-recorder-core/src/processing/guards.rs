//! Scoped ownership of the encoder and container.
//!
//! Each guard stops its resource on drop if the happy path did not, and the
//! boxed resource is released right after. Declaring the container guard
//! before the encoder guard makes teardown run encoder first.

use crate::models::error::EncodeError;
use crate::traits::codec::{Container, Encoder};

pub struct EncoderGuard {
    encoder: Box<dyn Encoder>,
    running: bool,
}

impl EncoderGuard {
    pub fn new(encoder: Box<dyn Encoder>) -> Self {
        Self {
            encoder,
            running: false,
        }
    }

    pub fn start(&mut self) -> Result<(), EncodeError> {
        self.encoder.start()?;
        self.running = true;
        Ok(())
    }

    pub fn encoder(&mut self) -> &mut dyn Encoder {
        self.encoder.as_mut()
    }

    pub fn finish(&mut self) -> Result<(), EncodeError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.encoder.stop()
    }
}

impl Drop for EncoderGuard {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("Failed to stop encoder: {}", e);
        }
    }
}

pub struct ContainerGuard<'a> {
    container: Box<dyn Container + 'a>,
    stopped: bool,
}

impl<'a> ContainerGuard<'a> {
    pub fn new(container: Box<dyn Container + 'a>) -> Self {
        Self {
            container,
            stopped: false,
        }
    }

    pub fn container(&mut self) -> &mut dyn Container {
        self.container.as_mut()
    }

    pub fn finish(&mut self) -> Result<(), EncodeError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.container.stop()
    }
}

impl Drop for ContainerGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("Failed to stop container: {}", e);
        }
    }
}
