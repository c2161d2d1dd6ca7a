//! Modul für die Normalisierung von Rohereignissen.
//!
//! Rohwerte der Sensoren werden anhand eines [`CalibrationProfile`] in feste
//! Wertebereiche überführt. Das Profil wird beim Start geladen und validiert und
//! bleibt für die gesamte Laufzeit unverändert.

pub mod calibration;
pub mod normalizer;

// Re-exports für einfacheren Zugriff
pub use calibration::{
    AccelCalibration, AccelMode, CalibrationError, CalibrationProfile, IrCalibration,
    PointerCalibration,
};
pub use normalizer::{NormalizedEvent, NormalizedSample, Normalizer};
