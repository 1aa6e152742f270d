//! Audio-Playback via cpal
//!
//! Oeffnet einen cpal OutputStream und liest Samples aus einem
//! lock-free Ring-Buffer. `write_frame` blockiert nicht: ist der
//! Puffer voll, wird der Rest des Frames verworfen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use echomesh_protocol::codec::{CHANNELS, SAMPLE_RATE};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapProd, HeapRb};
use tracing::{debug, trace};

use crate::capture::fehler_callback;
use crate::device::FrameSink;
use crate::error::{AudioError, AudioResult};

/// Konfiguration fuer den Audio-Playback
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Ring-Buffer Kapazitaet in Samples
    pub buffer_size: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_size: SAMPLE_RATE as usize / 2, // 500 ms
        }
    }
}

/// Lautsprecher als `FrameSink`
pub struct CpalPlayback {
    _stream: Stream,
    producer: HeapProd<i16>,
    stream_gestoert: Arc<AtomicBool>,
}

impl CpalPlayback {
    /// Oeffnet einen Mono-Playback-Stream mit 48 kHz auf dem gegebenen Geraet
    pub fn oeffnen(device: &Device, config: PlaybackConfig) -> AudioResult<Self> {
        let stream_config = StreamConfig {
            channels: CHANNELS,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let rb = HeapRb::<i16>::new(config.buffer_size);
        let (producer, mut consumer) = rb.split();
        let stream_gestoert = Arc::new(AtomicBool::new(false));

        let sample_format = device
            .supported_output_configs()
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?
            .find(|c| {
                c.min_sample_rate().0 <= SAMPLE_RATE
                    && c.max_sample_rate().0 >= SAMPLE_RATE
                    && c.channels() >= CHANNELS
            })
            .map(|c| c.sample_format())
            .unwrap_or(SampleFormat::F32);

        let stream = match sample_format {
            SampleFormat::I16 => device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _| {
                        let read = consumer.pop_slice(data);
                        // Stille fuer fehlende Samples
                        if read < data.len() {
                            data[read..].fill(0);
                        }
                    },
                    fehler_callback("Playback", Arc::clone(&stream_gestoert)),
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
            SampleFormat::F32 => device
                .build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _| {
                        for out in data.iter_mut() {
                            *out = consumer
                                .try_pop()
                                .map(|s| s as f32 / i16::MAX as f32)
                                .unwrap_or(0.0);
                        }
                    },
                    fehler_callback("Playback", Arc::clone(&stream_gestoert)),
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
            _ => {
                return Err(AudioError::StreamFehler(format!(
                    "Nicht unterstuetztes Sample-Format: {:?}",
                    sample_format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

        debug!(
            format = ?sample_format,
            "Playback-Stream geoeffnet: {}Hz {}ch",
            SAMPLE_RATE, CHANNELS
        );

        Ok(Self {
            _stream: stream,
            producer,
            stream_gestoert,
        })
    }
}

impl FrameSink for CpalPlayback {
    fn write_frame(&mut self, frame: &[i16]) -> AudioResult<()> {
        if self.stream_gestoert.load(Ordering::Acquire) {
            return Err(AudioError::StreamFehler("Playback-Stream gestoert".into()));
        }

        let written = self.producer.push_slice(frame);
        if written < frame.len() {
            trace!("Playback Ring-Buffer voll, {} Samples verworfen", frame.len() - written);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::load_cpal_output_device;
    use echomesh_protocol::codec::FRAME_SAMPLES;

    #[test]
    fn playback_config_default() {
        let config = PlaybackConfig::default();
        assert!(config.buffer_size >= FRAME_SAMPLES);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn playback_nimmt_frame_an() {
        let device = load_cpal_output_device(None).unwrap();
        let mut playback = CpalPlayback::oeffnen(&device, PlaybackConfig::default()).unwrap();
        playback.write_frame(&[0i16; FRAME_SAMPLES]).unwrap();
    }
}
