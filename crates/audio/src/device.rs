//! Audio-Geraete: Frame-Schnittstellen und Auswahl
//!
//! `FrameSource` und `FrameSink` sind die Naht zwischen Pipeline und
//! Hardware. Geschlossen wird ein Geraet durch Drop.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use tracing::debug;

use crate::error::{AudioError, AudioResult};

/// Quelle fuer PCM-Frames (Mikrofon)
pub trait FrameSource {
    /// Fuellt `frame` vollstaendig oder meldet einen Geraetefehler
    fn read_frame(&mut self, frame: &mut [i16]) -> AudioResult<()>;
}

/// Senke fuer PCM-Frames (Lautsprecher)
pub trait FrameSink {
    fn write_frame(&mut self, frame: &[i16]) -> AudioResult<()>;
}

/// Laedt ein cpal-Device fuer Eingabe
///
/// `None` waehlt das Standardgeraet, sonst das erste Geraet dessen
/// Name den Suchbegriff enthaelt.
pub fn load_cpal_input_device(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or(AudioError::KeinStandardEingabegeraet),
        Some(n) => {
            let devices = host
                .input_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            finde_nach_name(devices, n)
        }
    }
}

/// Laedt ein cpal-Device fuer Ausgabe
pub fn load_cpal_output_device(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or(AudioError::KeinStandardAusgabegeraet),
        Some(n) => {
            let devices = host
                .output_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            finde_nach_name(devices, n)
        }
    }
}

fn finde_nach_name(devices: impl Iterator<Item = Device>, suchbegriff: &str) -> AudioResult<Device> {
    for device in devices {
        if let Ok(dev_name) = device.name() {
            if name_passt(&dev_name, suchbegriff) {
                debug!(geraet = %dev_name, "Audio-Geraet gewaehlt");
                return Ok(device);
            }
        }
    }
    Err(AudioError::GeraetNichtGefunden(suchbegriff.to_string()))
}

/// Teilstring-Vergleich ohne Beachtung der Gross-/Kleinschreibung
fn name_passt(geraetename: &str, suchbegriff: &str) -> bool {
    geraetename
        .to_lowercase()
        .contains(&suchbegriff.to_lowercase())
}
