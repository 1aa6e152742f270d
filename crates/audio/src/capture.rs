//! Mikrofon-Capture via cpal
//!
//! Oeffnet einen cpal InputStream und schreibt i16-Samples in einen
//! lock-free Ring-Buffer. `CpalCapture::read_frame` entnimmt daraus
//! blockierend genau einen Frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use echomesh_protocol::codec::{CHANNELS, SAMPLE_RATE};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use tracing::{debug, error, trace};

use crate::device::FrameSource;
use crate::error::{AudioError, AudioResult};

/// Poll-Intervall beim Warten auf Samples
const POLL_INTERVALL: Duration = Duration::from_millis(2);

/// Konfiguration fuer den Audio-Capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Ring-Buffer Kapazitaet in Samples
    pub buffer_size: usize,
    /// Wie lange `read_frame` auf einen vollstaendigen Frame wartet
    pub frame_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_size: SAMPLE_RATE as usize, // 1 Sekunde Puffer
            frame_timeout: Duration::from_millis(500),
        }
    }
}

/// Mikrofon als `FrameSource`
///
/// Haelt den cpal-Stream am Leben; Drop stoppt die Aufnahme.
pub struct CpalCapture {
    _stream: Stream,
    consumer: HeapCons<i16>,
    stream_gestoert: Arc<AtomicBool>,
    frame_timeout: Duration,
}

impl CpalCapture {
    /// Oeffnet einen Mono-Capture-Stream mit 48 kHz auf dem gegebenen Geraet
    pub fn oeffnen(device: &Device, config: CaptureConfig) -> AudioResult<Self> {
        let stream_config = StreamConfig {
            channels: CHANNELS,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let rb = HeapRb::<i16>::new(config.buffer_size);
        let (mut producer, consumer) = rb.split();
        let stream_gestoert = Arc::new(AtomicBool::new(false));

        let sample_format = device
            .supported_input_configs()
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
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _| {
                        let written = producer.push_slice(data);
                        if written < data.len() {
                            trace!("Capture Ring-Buffer voll, {} Samples verworfen", data.len() - written);
                        }
                    },
                    fehler_callback("Capture", Arc::clone(&stream_gestoert)),
                    None,
                )
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
            SampleFormat::F32 => device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _| {
                        let written = producer.push_iter(data.iter().map(|&s| f32_zu_i16(s)));
                        if written < data.len() {
                            trace!("Capture Ring-Buffer voll, {} Samples verworfen", data.len() - written);
                        }
                    },
                    fehler_callback("Capture", Arc::clone(&stream_gestoert)),
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
            "Capture-Stream geoeffnet: {}Hz {}ch",
            SAMPLE_RATE, CHANNELS
        );

        Ok(Self {
            _stream: stream,
            consumer,
            stream_gestoert,
            frame_timeout: config.frame_timeout,
        })
    }
}

impl FrameSource for CpalCapture {
    fn read_frame(&mut self, frame: &mut [i16]) -> AudioResult<()> {
        let frist = Instant::now() + self.frame_timeout;
        let mut gefuellt = 0;

        while gefuellt < frame.len() {
            if self.stream_gestoert.load(Ordering::Acquire) {
                return Err(AudioError::StreamFehler("Capture-Stream gestoert".into()));
            }

            gefuellt += self.consumer.pop_slice(&mut frame[gefuellt..]);
            if gefuellt == frame.len() {
                break;
            }

            if Instant::now() >= frist {
                return Err(AudioError::UnvollstaendigerFrame {
                    erwartet: frame.len(),
                    erhalten: gefuellt,
                });
            }
            std::thread::sleep(POLL_INTERVALL);
        }

        Ok(())
    }
}

/// Erzeugt den cpal-Fehler-Callback; markiert den Stream als gestoert
pub(crate) fn fehler_callback(
    richtung: &'static str,
    flag: Arc<AtomicBool>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        error!("{}-Fehler: {}", richtung, err);
        flag.store(true, Ordering::Release);
    }
}

/// Normalisiertes f32-Sample -> i16 (mit Clipping)
pub(crate) fn f32_zu_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
