//! Device input for the streamer
//!
//! - [`event_source`] - Raw event types and the [`EventSource`] seam the dispatcher pulls from
//! - [`wiimote`] - evdev backed Wii Remote source with per-frame axis assembly
//!
//! # Architecture
//!
//! ```text
//! evdev nodes ──► FrameAssembler ──► RawEvent ──► Dispatcher
//! (buttons, accelerometer, IR)
//! ```

pub mod event_source;
pub mod wiimote;

pub use event_source::{Category, EventSource, RawAxes, RawEvent, SourceError, SourceFuture};
pub use wiimote::{DeviceError, WiimoteSource};
