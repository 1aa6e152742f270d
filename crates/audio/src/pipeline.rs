//! Gerichtete Audio-Pipelines
//!
//! Trennung zwischen Capture-Pipeline (Mikrofon -> Encode) und
//! Playback-Pipeline (Decode -> Lautsprecher). Jede Pipeline besitzt
//! ihr Geraet und ihren Codec exklusiv und gehoert genau einer
//! Aktivitaet; erzeugt wird sie im Thread dieser Aktivitaet.

use echomesh_protocol::codec::FRAME_SAMPLES;
use tracing::trace;

use crate::codec::{SpeechDecoder, SpeechEncoder};
use crate::device::{FrameSink, FrameSource};
use crate::error::AudioResult;

/// Fabrik fuer Geraete und Codecs
///
/// Wird zwischen Aktivitaeten geteilt; die erzeugten Objekte selbst
/// verlassen ihren Thread nicht.
pub trait AudioBackend: Send + Sync {
    fn open_capture(&self) -> AudioResult<Box<dyn FrameSource>>;
    fn open_playback(&self) -> AudioResult<Box<dyn FrameSink>>;
    fn create_encoder(&self) -> AudioResult<Box<dyn SpeechEncoder>>;
    fn create_decoder(&self) -> AudioResult<Box<dyn SpeechDecoder>>;
}

/// Mikrofon + Encoder
pub struct CapturePipeline {
    source: Box<dyn FrameSource>,
    encoder: Box<dyn SpeechEncoder>,
    frame: Vec<i16>,
}

impl CapturePipeline {
    pub fn new(source: Box<dyn FrameSource>, encoder: Box<dyn SpeechEncoder>) -> Self {
        Self {
            source,
            encoder,
            frame: vec![0; FRAME_SAMPLES],
        }
    }

    /// Oeffnet Eingabegeraet und Encoder des Backends
    pub fn oeffnen(backend: &dyn AudioBackend) -> AudioResult<Self> {
        Ok(Self::new(backend.open_capture()?, backend.create_encoder()?))
    }

    /// Blockiert bis ein Frame aufgenommen ist und gibt ihn kodiert zurueck
    ///
    /// # Fehler
    /// - Geraetefehler wenn kein vollstaendiger Frame geliefert wurde
    /// - `CodecFehler` wenn der Encoder scheitert
    pub fn capture_and_encode(&mut self) -> AudioResult<Vec<u8>> {
        self.source.read_frame(&mut self.frame)?;
        self.encoder.encode(&self.frame)
    }
}

/// Ergebnis von `PlaybackPipeline::decode_and_play`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wiedergabe {
    /// Frame wurde an das Geraet uebergeben
    Abgespielt,
    /// Leere Nutzdaten (Registrierung), nichts zu tun
    Leer,
    /// Paket nicht dekodierbar, Frame uebersprungen
    Verworfen,
}

/// Decoder + Lautsprecher
pub struct PlaybackPipeline {
    sink: Box<dyn FrameSink>,
    decoder: Box<dyn SpeechDecoder>,
}

impl PlaybackPipeline {
    pub fn new(sink: Box<dyn FrameSink>, decoder: Box<dyn SpeechDecoder>) -> Self {
        Self { sink, decoder }
    }

    /// Oeffnet Ausgabegeraet und Decoder des Backends
    pub fn oeffnen(backend: &dyn AudioBackend) -> AudioResult<Self> {
        Ok(Self::new(backend.open_playback()?, backend.create_decoder()?))
    }

    /// Dekodiert ein Paket und spielt den Frame ab
    ///
    /// Codec-Fehler beenden die Wiedergabe nicht; nur Geraetefehler
    /// werden zurueckgegeben.
    pub fn decode_and_play(&mut self, paket: &[u8]) -> AudioResult<Wiedergabe> {
        if paket.is_empty() {
            return Ok(Wiedergabe::Leer);
        }

        let mut pcm = match self.decoder.decode(paket) {
            Ok(pcm) => pcm,
            Err(e) => {
                trace!("Paket nicht dekodierbar ({} Bytes): {}", paket.len(), e);
                return Ok(Wiedergabe::Verworfen);
            }
        };

        // Das Geraet erwartet immer einen vollen Frame
        pcm.resize(FRAME_SAMPLES, 0);
        self.sink.write_frame(&pcm)?;
        Ok(Wiedergabe::Abgespielt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use std::sync::{Arc, Mutex};

    /// Liefert eine feste Anzahl Frames, danach Geraetefehler
    struct TestQuelle {
        verbleibend: usize,
        wert: i16,
    }

    impl FrameSource for TestQuelle {
        fn read_frame(&mut self, frame: &mut [i16]) -> AudioResult<()> {
            if self.verbleibend == 0 {
                return Err(AudioError::UnvollstaendigerFrame {
                    erwartet: frame.len(),
                    erhalten: 0,
                });
            }
            self.verbleibend -= 1;
            frame.fill(self.wert);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct TestSenke {
        frames: Arc<Mutex<Vec<Vec<i16>>>>,
        defekt: bool,
    }

    impl FrameSink for TestSenke {
        fn write_frame(&mut self, frame: &[i16]) -> AudioResult<()> {
            if self.defekt {
                return Err(AudioError::StreamFehler("getrennt".into()));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    /// "Kodiert" einen Frame als sein erstes Sample (2 Bytes)
    struct TestCodec;

    impl SpeechEncoder for TestCodec {
        fn encode(&mut self, pcm: &[i16]) -> AudioResult<Vec<u8>> {
            Ok(pcm[0].to_be_bytes().to_vec())
        }
    }

    impl SpeechDecoder for TestCodec {
        fn decode(&mut self, paket: &[u8]) -> AudioResult<Vec<i16>> {
            match paket {
                [a, b] => Ok(vec![i16::from_be_bytes([*a, *b]); 10]),
                _ => Err(AudioError::CodecFehler("ungueltig".into())),
            }
        }
    }

    #[test]
    fn capture_kodiert_jeden_frame() {
        let mut pipeline = CapturePipeline::new(
            Box::new(TestQuelle {
                verbleibend: 2,
                wert: 0x0102,
            }),
            Box::new(TestCodec),
        );
        assert_eq!(pipeline.capture_and_encode().unwrap(), vec![0x01, 0x02]);
        assert_eq!(pipeline.capture_and_encode().unwrap(), vec![0x01, 0x02]);

        let err = pipeline.capture_and_encode().unwrap_err();
        assert!(err.ist_geraetefehler());
    }

    #[test]
    fn playback_spielt_vollen_frame_ab() {
        let senke = TestSenke::default();
        let mut pipeline = PlaybackPipeline::new(Box::new(senke.clone()), Box::new(TestCodec));

        assert_eq!(pipeline.decode_and_play(&[0, 7]).unwrap(), Wiedergabe::Abgespielt);

        let frames = senke.frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), FRAME_SAMPLES);
        assert_eq!(frames[0][0], 7);
        assert_eq!(frames[0][FRAME_SAMPLES - 1], 0);
    }

    #[test]
    fn leere_nutzdaten_beruehren_das_geraet_nicht() {
        let senke = TestSenke::default();
        let mut pipeline = PlaybackPipeline::new(Box::new(senke.clone()), Box::new(TestCodec));

        assert_eq!(pipeline.decode_and_play(&[]).unwrap(), Wiedergabe::Leer);
        assert!(senke.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn kaputtes_paket_wird_uebersprungen() {
        let senke = TestSenke::default();
        let mut pipeline = PlaybackPipeline::new(Box::new(senke.clone()), Box::new(TestCodec));

        assert_eq!(pipeline.decode_and_play(&[1, 2, 3]).unwrap(), Wiedergabe::Verworfen);
        assert!(senke.frames.lock().unwrap().is_empty());

        // Nachfolgende Pakete werden normal abgespielt
        assert_eq!(pipeline.decode_and_play(&[0, 1]).unwrap(), Wiedergabe::Abgespielt);
    }

    #[test]
    fn geraetefehler_beim_abspielen_wird_gemeldet() {
        let senke = TestSenke {
            defekt: true,
            ..TestSenke::default()
        };
        let mut pipeline = PlaybackPipeline::new(Box::new(senke), Box::new(TestCodec));

        let err = pipeline.decode_and_play(&[0, 1]).unwrap_err();
        assert!(err.ist_geraetefehler());
    }
}
