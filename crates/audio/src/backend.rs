//! Produktiv-Backend: cpal-Geraete + Opus-Codec

use std::time::Duration;

use echomesh_protocol::codec::OpusConfig;
use tracing::info;

use crate::capture::{CaptureConfig, CpalCapture};
use crate::codec::{OpusDecoder, OpusEncoder, SpeechDecoder, SpeechEncoder};
use crate::device::{load_cpal_input_device, load_cpal_output_device, FrameSink, FrameSource};
use crate::error::AudioResult;
use crate::pipeline::AudioBackend;
use crate::playback::{CpalPlayback, PlaybackConfig};

/// Backend fuer echte Hardware
///
/// Geraete werden beim Oeffnen per Namens-Teilstring aufgeloest,
/// `None` waehlt das Standardgeraet.
#[derive(Debug, Clone)]
pub struct CpalOpusBackend {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub opus: OpusConfig,
    /// Wartezeit auf einen vollstaendigen Mikrofon-Frame
    pub capture_timeout: Duration,
}

impl Default for CpalOpusBackend {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            opus: OpusConfig::default(),
            capture_timeout: CaptureConfig::default().frame_timeout,
        }
    }
}

impl CpalOpusBackend {
    pub fn new(opus: OpusConfig) -> Self {
        Self {
            opus,
            ..Self::default()
        }
    }

    pub fn mit_capture_timeout(mut self, timeout: Duration) -> Self {
        self.capture_timeout = timeout;
        self
    }

    fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            frame_timeout: self.capture_timeout,
            ..CaptureConfig::default()
        }
    }

    pub fn mit_geraeten(mut self, input: Option<String>, output: Option<String>) -> Self {
        self.input_device = input;
        self.output_device = output;
        self
    }
}

impl AudioBackend for CpalOpusBackend {
    fn open_capture(&self) -> AudioResult<Box<dyn FrameSource>> {
        let device = load_cpal_input_device(self.input_device.as_deref())?;
        let capture = CpalCapture::oeffnen(&device, self.capture_config())?;
        info!(geraet = ?self.input_device, "Mikrofon geoeffnet");
        Ok(Box::new(capture))
    }

    fn open_playback(&self) -> AudioResult<Box<dyn FrameSink>> {
        let device = load_cpal_output_device(self.output_device.as_deref())?;
        let playback = CpalPlayback::oeffnen(&device, PlaybackConfig::default())?;
        info!(geraet = ?self.output_device, "Lautsprecher geoeffnet");
        Ok(Box::new(playback))
    }

    fn create_encoder(&self) -> AudioResult<Box<dyn SpeechEncoder>> {
        Ok(Box::new(OpusEncoder::new(self.opus.clone())?))
    }

    fn create_decoder(&self) -> AudioResult<Box<dyn SpeechDecoder>> {
        Ok(Box::new(OpusDecoder::new()?))
    }
}
