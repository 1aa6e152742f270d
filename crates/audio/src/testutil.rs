//! Audio-Backend ohne Hardware fuer Tests
//!
//! Nur mit Feature `test-util` (oder in den eigenen Tests) verfuegbar.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::codec::{SpeechDecoder, SpeechEncoder};
use crate::device::{FrameSink, FrameSource};
use crate::error::{AudioError, AudioResult};
use crate::pipeline::AudioBackend;

/// Abgespielte Frames in Reihenfolge
pub type Abgespielt = Arc<Mutex<Vec<Vec<i16>>>>;

/// Liefert konstante Frames (Sample-Wert 1000) im eingestellten Takt
///
/// Kodiert wird jeder Frame als sein erstes Sample (2 Bytes big-endian);
/// andere Paketlaengen kann der Decoder nicht lesen.
pub struct TestBackend {
    frames: Option<usize>,
    frame_dauer: Duration,
    geraete: bool,
    abgespielt: Abgespielt,
}

impl TestBackend {
    /// Liefert `anzahl` Frames ohne Wartezeit, danach Geraetefehler
    pub fn mit_frames(anzahl: usize) -> Self {
        Self {
            frames: Some(anzahl),
            frame_dauer: Duration::ZERO,
            geraete: true,
            abgespielt: Arc::default(),
        }
    }

    /// Liefert alle 20 ms einen Frame
    pub fn endlos() -> Self {
        Self {
            frames: None,
            frame_dauer: Duration::from_millis(20),
            ..Self::mit_frames(0)
        }
    }

    /// Jeder Frame blockiert `dauer` lang
    pub fn haengend(dauer: Duration) -> Self {
        Self {
            frame_dauer: dauer,
            ..Self::endlos()
        }
    }

    /// Mikrofon und Lautsprecher fehlen
    pub fn ohne_geraete() -> Self {
        Self {
            geraete: false,
            ..Self::endlos()
        }
    }

    pub fn abgespielt(&self) -> Abgespielt {
        Arc::clone(&self.abgespielt)
    }
}

struct Quelle {
    verbleibend: Option<usize>,
    frame_dauer: Duration,
}

impl FrameSource for Quelle {
    fn read_frame(&mut self, frame: &mut [i16]) -> AudioResult<()> {
        if let Some(n) = self.verbleibend.as_mut() {
            if *n == 0 {
                return Err(AudioError::UnvollstaendigerFrame {
                    erwartet: frame.len(),
                    erhalten: 0,
                });
            }
            *n -= 1;
        }
        if !self.frame_dauer.is_zero() {
            std::thread::sleep(self.frame_dauer);
        }
        frame.fill(1000);
        Ok(())
    }
}

struct Senke(Abgespielt);

impl FrameSink for Senke {
    fn write_frame(&mut self, frame: &[i16]) -> AudioResult<()> {
        self.0
            .lock()
            .map_err(|_| AudioError::StreamFehler("Testsenke vergiftet".into()))?
            .push(frame.to_vec());
        Ok(())
    }
}

struct Codec;

impl SpeechEncoder for Codec {
    fn encode(&mut self, pcm: &[i16]) -> AudioResult<Vec<u8>> {
        let erstes = pcm.first().copied().unwrap_or_default();
        Ok(erstes.to_be_bytes().to_vec())
    }
}

impl SpeechDecoder for Codec {
    fn decode(&mut self, paket: &[u8]) -> AudioResult<Vec<i16>> {
        match paket {
            [a, b] => Ok(vec![i16::from_be_bytes([*a, *b])]),
            _ => Err(AudioError::CodecFehler("ungueltig".into())),
        }
    }
}

impl AudioBackend for TestBackend {
    fn open_capture(&self) -> AudioResult<Box<dyn FrameSource>> {
        if !self.geraete {
            return Err(AudioError::KeinStandardEingabegeraet);
        }
        Ok(Box::new(Quelle {
            verbleibend: self.frames,
            frame_dauer: self.frame_dauer,
        }))
    }

    fn open_playback(&self) -> AudioResult<Box<dyn FrameSink>> {
        if !self.geraete {
            return Err(AudioError::KeinStandardAusgabegeraet);
        }
        Ok(Box::new(Senke(Arc::clone(&self.abgespielt))))
    }

    fn create_encoder(&self) -> AudioResult<Box<dyn SpeechEncoder>> {
        Ok(Box::new(Codec))
    }

    fn create_decoder(&self) -> AudioResult<Box<dyn SpeechDecoder>> {
        Ok(Box::new(Codec))
    }
}
