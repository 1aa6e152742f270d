//! Sprach-Codec: Traits und Opus-Implementierung
//!
//! Ein Aufruf von `encode` verarbeitet genau einen 20ms-Frame
//! (960 Samples i16, Mono, 48 kHz); `decode` liefert genau einen zurueck.

use audiopus::{
    coder::{Decoder, Encoder},
    Application, Bitrate, Channels, SampleRate,
};
use echomesh_protocol::codec::{OpusApplication, OpusConfig, CHANNELS, FRAME_SAMPLES};
use tracing::debug;

use crate::error::{AudioError, AudioResult};

/// Obergrenze fuer ein kodiertes Opus-Paket
const MAX_PAKET_BYTES: usize = 4000;

/// Kodiert einen PCM-Frame in ein komprimiertes Paket
pub trait SpeechEncoder {
    fn encode(&mut self, pcm: &[i16]) -> AudioResult<Vec<u8>>;
}

/// Dekodiert ein komprimiertes Paket in einen PCM-Frame
pub trait SpeechDecoder {
    fn decode(&mut self, paket: &[u8]) -> AudioResult<Vec<i16>>;
}

/// Opus-Encoder: kodiert i16-PCM zu Opus-Bytes
pub struct OpusEncoder {
    encoder: Encoder,
    config: OpusConfig,
}

impl OpusEncoder {
    /// Erstellt einen neuen Encoder mit der gegebenen Konfiguration
    pub fn new(config: OpusConfig) -> AudioResult<Self> {
        config.validieren().map_err(AudioError::Konfiguration)?;

        let mut encoder = Encoder::new(
            SampleRate::Hz48000,
            Channels::Mono,
            protocol_app_to_audiopus(config.application),
        )
        .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        encoder
            .set_bitrate(Bitrate::BitsPerSecond(config.bitrate_bps()))
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        debug!(
            "OpusEncoder erstellt: {}kbps, {:?}",
            config.bitrate_kbps, config.application
        );

        Ok(Self { encoder, config })
    }

    pub fn config(&self) -> &OpusConfig {
        &self.config
    }
}

impl SpeechEncoder for OpusEncoder {
    /// Die Eingabe muss exakt `FRAME_SAMPLES` Samples lang sein
    fn encode(&mut self, pcm: &[i16]) -> AudioResult<Vec<u8>> {
        if pcm.len() != FRAME_SAMPLES {
            return Err(AudioError::Konfiguration(format!(
                "PCM-Frame muss {} Samples lang sein, war {}",
                FRAME_SAMPLES,
                pcm.len()
            )));
        }

        let mut output = vec![0u8; MAX_PAKET_BYTES];
        let written = self
            .encoder
            .encode(pcm, &mut output)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        output.truncate(written);
        Ok(output)
    }
}

/// Opus-Decoder: dekodiert Opus-Bytes zu i16-PCM
pub struct OpusDecoder {
    decoder: Decoder,
}

impl OpusDecoder {
    pub fn new() -> AudioResult<Self> {
        let decoder = Decoder::new(SampleRate::Hz48000, Channels::Mono)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;
        debug!("OpusDecoder erstellt: 48kHz Mono, frame_size={}", FRAME_SAMPLES);
        Ok(Self { decoder })
    }
}

impl SpeechDecoder for OpusDecoder {
    fn decode(&mut self, paket: &[u8]) -> AudioResult<Vec<i16>> {
        let mut output = vec![0i16; FRAME_SAMPLES * CHANNELS as usize];
        let decoded = self
            .decoder
            .decode(Some(paket), &mut output, false)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        output.truncate(decoded * CHANNELS as usize);
        Ok(output)
    }
}

fn protocol_app_to_audiopus(app: OpusApplication) -> Application {
    match app {
        OpusApplication::Voip => Application::Voip,
        OpusApplication::Audio => Application::Audio,
        OpusApplication::RestrictedLowdelay => Application::LowDelay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sinus_frame() -> Vec<i16> {
        (0..FRAME_SAMPLES)
            .map(|i| ((i as f32 * 440.0 * std::f32::consts::TAU / 48_000.0).sin() * 8000.0) as i16)
            .collect()
    }

    #[test]
    fn encoder_standard_konfiguration() {
        let enc = OpusEncoder::new(OpusConfig::default()).unwrap();
        assert_eq!(enc.config().bitrate_kbps, 64);
    }

    #[test]
    fn encoder_ungueltige_bitrate() {
        let result = OpusEncoder::new(OpusConfig::mit_bitrate(5));
        assert!(matches!(result, Err(AudioError::Konfiguration(_))));
    }

    #[test]
    fn encoder_falscher_frame_size_fehler() {
        let mut enc = OpusEncoder::new(OpusConfig::default()).unwrap();
        assert!(enc.encode(&[0i16; 100]).is_err());
    }

    #[test]
    fn encoder_decoder_roundtrip() {
        let mut enc = OpusEncoder::new(OpusConfig::default()).unwrap();
        let mut dec = OpusDecoder::new().unwrap();

        let encoded = enc.encode(&sinus_frame()).expect("Encoding sollte funktionieren");
        assert!(!encoded.is_empty());
        assert!(encoded.len() < FRAME_SAMPLES * 2);

        let decoded = dec.decode(&encoded).expect("Decoding sollte funktionieren");
        assert_eq!(decoded.len(), FRAME_SAMPLES);
    }

    #[test]
    fn decoder_leeres_paket_ist_fehler() {
        let mut dec = OpusDecoder::new().unwrap();
        assert!(matches!(dec.decode(&[]), Err(AudioError::CodecFehler(_))));
    }
}
