//! Umwandlung von Rohereignissen in kalibrierte Werte

use tracing::debug;

use crate::device::{Category, RawAxes, RawEvent};
use crate::normalize::calibration::{
    AccelCalibration, AccelMode, CalibrationProfile, IrCalibration, PointerCalibration,
};
use crate::protocol::button::ButtonEvent;

/// Normalisierte Bewegungsdaten
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedSample {
    /// Legacy-Zeigerposition (x, y)
    Pointer([f32; 2]),

    /// IR-Position (x, y, Tiefe)
    Ir([f32; 3]),

    /// Beschleunigung (x, y, z)
    Accel([f32; 3]),
}

impl NormalizedSample {
    pub fn category(&self) -> Category {
        match self {
            NormalizedSample::Pointer(_) | NormalizedSample::Accel(_) => Category::Accel,
            NormalizedSample::Ir(_) => Category::Ir,
        }
    }

    pub fn values(&self) -> &[f32] {
        match self {
            NormalizedSample::Pointer(values) => values.as_slice(),
            NormalizedSample::Ir(values) | NormalizedSample::Accel(values) => values.as_slice(),
        }
    }
}

/// Ausgabe der Normalisierung, bereit für den Encoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedEvent {
    Sample(NormalizedSample),
    Button(ButtonEvent),
}

/// Beschleunigungsachse: `(raw - offset) / scale`, optional geclampt
pub fn normalize_accel_axis(raw: Option<i32>, calibration: &AccelCalibration) -> f32 {
    let Some(raw) = raw else {
        return calibration.center;
    };
    let value = (raw as f32 - calibration.offset) / calibration.scale;
    if calibration.clamp {
        value.clamp(calibration.clamp_min, calibration.clamp_max)
    } else {
        value
    }
}

/// IR-Achse: `1 - raw / axis_max`, bewusst ohne Clamping
pub fn normalize_ir_axis(raw: Option<i32>, axis_max: f32, center: f32) -> f32 {
    match raw {
        Some(raw) => 1.0 - (raw as f32 / axis_max),
        None => center,
    }
}

/// Legacy-Zeigerachse mit getrennten Divisoren für positive und negative Werte
pub fn normalize_pointer_axis(raw: Option<i32>, calibration: &PointerCalibration) -> f32 {
    match raw {
        Some(raw) if raw >= 0 => raw as f32 / calibration.max_positive,
        Some(raw) => raw as f32 / calibration.max_negative,
        None => calibration.center,
    }
}

pub fn normalize_accel(axes: &RawAxes, calibration: &AccelCalibration) -> [f32; 3] {
    axes.map(|raw| normalize_accel_axis(raw, calibration))
}

pub fn normalize_ir(axes: &RawAxes, calibration: &IrCalibration) -> [f32; 3] {
    [0, 1, 2].map(|i| normalize_ir_axis(axes[i], calibration.axis_max[i], calibration.center))
}

pub fn normalize_pointer(axes: &RawAxes, calibration: &PointerCalibration) -> [f32; 2] {
    [0, 1].map(|i| normalize_pointer_axis(axes[i], calibration))
}

/// Normalisiert Rohereignisse anhand eines festen Profils
///
/// Hält keinen Zustand außer dem Profil: gleiche Eingaben ergeben immer
/// die gleiche Ausgabe.
#[derive(Debug, Clone)]
pub struct Normalizer {
    profile: CalibrationProfile,
}

impl Normalizer {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self { profile }
    }

    /// Liefert `None` nur für Tasten außerhalb der Wiimote-Belegung
    pub fn normalize(&self, event: &RawEvent) -> Option<NormalizedEvent> {
        match event {
            RawEvent::Accel { channel, axes } => {
                let sample = match self.profile.accel.mode {
                    AccelMode::Triple => {
                        NormalizedSample::Accel(normalize_accel(axes, &self.profile.accel))
                    }
                    AccelMode::Pointer => {
                        NormalizedSample::Pointer(normalize_pointer(axes, &self.profile.pointer))
                    }
                };
                debug!(
                    "Normalized accelerometer channel {}: {:?} -> {:?}",
                    channel, axes, sample
                );
                Some(NormalizedEvent::Sample(sample))
            }
            RawEvent::Ir { channel, axes } => {
                let sample = NormalizedSample::Ir(normalize_ir(axes, &self.profile.ir));
                debug!("Normalized IR channel {}: {:?} -> {:?}", channel, axes, sample);
                Some(NormalizedEvent::Sample(sample))
            }
            RawEvent::Key { code, state } => {
                ButtonEvent::from_raw(*code, *state).map(NormalizedEvent::Button)
            }
        }
    }
}
