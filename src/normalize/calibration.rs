//! Kalibrierungsprofile für die Normalisierung von Sensorwerten

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fehler bei der Validierung eines Kalibrierungsprofils
#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    /// Divisor ist null oder nicht endlich
    #[error("Invalid divisor for {field}: {value}")]
    InvalidDivisor { field: &'static str, value: f32 },

    /// Divisor hat das falsche Vorzeichen
    #[error("{field} must be {expected}, got {value}")]
    WrongSign {
        field: &'static str,
        expected: &'static str,
        value: f32,
    },

    /// Wert ist NaN oder unendlich
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    /// Ungültiger Clamp-Bereich
    #[error("Clamp range is empty: [{min}, {max}]")]
    EmptyClampRange { min: f32, max: f32 },
}

/// Ausgabeform der Beschleunigungsdaten
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccelMode {
    /// Drei kalibrierte Achsen, Paket-Tag 0x03
    #[default]
    Triple,

    /// Legacy-Zeigermodus: x/y über die Zeigerformel, Paket-Tag 0x01
    Pointer,
}

/// Kalibrierung des Beschleunigungssensors: `(raw - offset) / scale`
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AccelCalibration {
    pub mode: AccelMode,
    pub offset: f32,
    pub scale: f32,
    pub clamp: bool,
    pub clamp_min: f32,
    pub clamp_max: f32,
    /// Wert für Achsen, die das Gerät noch nicht gemeldet hat
    pub center: f32,
}

/// Kalibrierung des IR-Sensors: `1 - raw / axis_max`
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct IrCalibration {
    /// Auflösung je Achse (horizontal, vertikal, Tiefe)
    pub axis_max: [f32; 3],
    pub center: f32,
}

/// Legacy-Zeigerkalibrierung: `raw / max_positive` bzw. `raw / max_negative`
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PointerCalibration {
    pub max_positive: f32,
    /// Negativer Divisor für negative Rohwerte
    pub max_negative: f32,
    pub center: f32,
}

/// Vollständiges Kalibrierungsprofil, für die gesamte Laufzeit fest
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CalibrationProfile {
    pub accel: AccelCalibration,
    pub ir: IrCalibration,
    pub pointer: PointerCalibration,
}

impl CalibrationProfile {
    /// Profil, das die Formeln des Emulator-Clients nachbildet
    ///
    /// Beschleunigung: `raw + 512` (offset -512, scale 1, kein Clamping).
    /// IR: Auflösung 1023 x 767 x 1023. Zeiger: Divisoren 103 / -105.
    pub fn emulator() -> Self {
        Self {
            accel: AccelCalibration {
                mode: AccelMode::Triple,
                offset: -512.0,
                scale: 1.0,
                clamp: false,
                clamp_min: 0.0,
                clamp_max: 1023.0,
                center: 512.0,
            },
            ir: IrCalibration {
                axis_max: [1023.0, 767.0, 1023.0],
                center: 0.5,
            },
            pointer: PointerCalibration {
                max_positive: 103.0,
                max_negative: -105.0,
                center: 0.5,
            },
        }
    }

    /// Prüft alle Divisoren, damit die Normalisierung nie durch null teilt,
    /// und alle übrigen Werte auf Endlichkeit
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (field, value) in [
            ("accel.offset", self.accel.offset),
            ("accel.clamp_min", self.accel.clamp_min),
            ("accel.clamp_max", self.accel.clamp_max),
            ("accel.center", self.accel.center),
            ("ir.center", self.ir.center),
            ("pointer.center", self.pointer.center),
        ] {
            check_finite(field, value)?;
        }

        check_divisor("accel.scale", self.accel.scale)?;
        for (field, value) in [
            ("ir.axis_max[0]", self.ir.axis_max[0]),
            ("ir.axis_max[1]", self.ir.axis_max[1]),
            ("ir.axis_max[2]", self.ir.axis_max[2]),
        ] {
            check_divisor(field, value)?;
        }
        check_divisor("pointer.max_positive", self.pointer.max_positive)?;
        check_divisor("pointer.max_negative", self.pointer.max_negative)?;

        if self.pointer.max_positive < 0.0 {
            return Err(CalibrationError::WrongSign {
                field: "pointer.max_positive",
                expected: "positive",
                value: self.pointer.max_positive,
            });
        }
        if self.pointer.max_negative > 0.0 {
            return Err(CalibrationError::WrongSign {
                field: "pointer.max_negative",
                expected: "negative",
                value: self.pointer.max_negative,
            });
        }

        if self.accel.clamp && self.accel.clamp_min > self.accel.clamp_max {
            return Err(CalibrationError::EmptyClampRange {
                min: self.accel.clamp_min,
                max: self.accel.clamp_max,
            });
        }

        Ok(())
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::emulator()
    }
}

impl Default for AccelCalibration {
    fn default() -> Self {
        CalibrationProfile::emulator().accel
    }
}

impl Default for IrCalibration {
    fn default() -> Self {
        CalibrationProfile::emulator().ir
    }
}

impl Default for PointerCalibration {
    fn default() -> Self {
        CalibrationProfile::emulator().pointer
    }
}

fn check_finite(field: &'static str, value: f32) -> Result<(), CalibrationError> {
    if !value.is_finite() {
        return Err(CalibrationError::NonFinite { field, value });
    }
    Ok(())
}

fn check_divisor(field: &'static str, value: f32) -> Result<(), CalibrationError> {
    if value == 0.0 || !value.is_finite() {
        return Err(CalibrationError::InvalidDivisor { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulator_profile_is_valid() {
        assert_eq!(CalibrationProfile::emulator().validate(), Ok(()));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut profile = CalibrationProfile::emulator();
        profile.accel.scale = 0.0;
        assert_eq!(
            profile.validate(),
            Err(CalibrationError::InvalidDivisor {
                field: "accel.scale",
                value: 0.0
            })
        );
    }

    #[test]
    fn zero_ir_resolution_is_rejected() {
        let mut profile = CalibrationProfile::emulator();
        profile.ir.axis_max[1] = 0.0;
        assert!(matches!(
            profile.validate(),
            Err(CalibrationError::InvalidDivisor {
                field: "ir.axis_max[1]",
                ..
            })
        ));
    }

    #[test]
    fn pointer_divisors_must_have_their_sign() {
        let mut profile = CalibrationProfile::emulator();
        profile.pointer.max_negative = 105.0;
        assert!(matches!(
            profile.validate(),
            Err(CalibrationError::WrongSign {
                field: "pointer.max_negative",
                ..
            })
        ));
    }

    #[test]
    fn inverted_clamp_range_is_rejected_only_when_clamping() {
        let mut profile = CalibrationProfile::emulator();
        profile.accel.clamp_min = 10.0;
        profile.accel.clamp_max = -10.0;
        assert_eq!(profile.validate(), Ok(()));

        profile.accel.clamp = true;
        assert!(matches!(
            profile.validate(),
            Err(CalibrationError::EmptyClampRange { .. })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut profile = CalibrationProfile::emulator();
        profile.accel.clamp = true;
        profile.accel.clamp_min = f32::NAN;
        assert!(matches!(
            profile.validate(),
            Err(CalibrationError::NonFinite {
                field: "accel.clamp_min",
                ..
            })
        ));

        let mut profile = CalibrationProfile::emulator();
        profile.accel.offset = f32::NAN;
        assert!(matches!(
            profile.validate(),
            Err(CalibrationError::NonFinite {
                field: "accel.offset",
                ..
            })
        ));

        let mut profile = CalibrationProfile::emulator();
        profile.ir.center = f32::INFINITY;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn defaults_are_the_emulator_profile() {
        assert_eq!(CalibrationProfile::default(), CalibrationProfile::emulator());
        assert_eq!(
            AccelCalibration::default(),
            CalibrationProfile::emulator().accel
        );
    }
}
