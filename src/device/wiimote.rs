use std::fmt;
use std::io;

use evdev::{EventStream, EventType, InputEvent};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::device::event_source::{EventSource, RawAxes, RawEvent, SourceError, SourceFuture};

// Linux input event codes used by the kernel Wii Remote driver
const SYN_REPORT: u16 = 0x00;
const ABS_RX: u16 = 0x03;
const ABS_RY: u16 = 0x04;
const ABS_RZ: u16 = 0x05;
const ABS_HAT0X: u16 = 0x10;
const ABS_HAT0Y: u16 = 0x11;

// errno for a vanished device node
const ENODEV: i32 = 19;

// The driver registers one input device per sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    Buttons,
    Accelerometer,
    Ir,
}

impl DeviceRole {
    fn from_name(name: &str, base: &str) -> Option<Self> {
        match name.strip_prefix(base)? {
            "" => Some(DeviceRole::Buttons),
            " Accelerometer" => Some(DeviceRole::Accelerometer),
            " IR" => Some(DeviceRole::Ir),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRole::Buttons => write!(f, "buttons"),
            DeviceRole::Accelerometer => write!(f, "accelerometer"),
            DeviceRole::Ir => write!(f, "IR"),
        }
    }
}

// Device discovery errors
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No device matching '{0}' found")]
    NotFound(String),

    #[error("Failed to open {role} device: {reason}")]
    OpenError { role: DeviceRole, reason: String },
}

#[derive(Debug, Default)]
struct PendingFrame {
    axes: RawAxes,
    dirty: bool,
}

impl PendingFrame {
    fn set(&mut self, index: usize, value: i32) {
        self.axes[index] = Some(value);
        self.dirty = true;
    }

    fn flush(&mut self) -> Option<RawAxes> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.axes)
    }
}

/// Folds evdev's per-axis updates into whole motion frames.
///
/// The kernel only reports axes that changed, so the last seen value of every
/// axis is kept between frames. A frame is emitted on `SYN_REPORT`.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    accel: PendingFrame,
    ir: PendingFrame,
}

impl FrameAssembler {
    pub fn push(
        &mut self,
        role: DeviceRole,
        event_type: EventType,
        code: u16,
        value: i32,
    ) -> Option<RawEvent> {
        if event_type == EventType::KEY {
            return Some(RawEvent::Key { code, state: value });
        }

        if event_type == EventType::ABSOLUTE {
            match (role, code) {
                (DeviceRole::Accelerometer, ABS_RX) => self.accel.set(0, value),
                (DeviceRole::Accelerometer, ABS_RY) => self.accel.set(1, value),
                (DeviceRole::Accelerometer, ABS_RZ) => self.accel.set(2, value),
                (DeviceRole::Ir, ABS_HAT0X) => self.ir.set(0, value),
                (DeviceRole::Ir, ABS_HAT0Y) => self.ir.set(1, value),
                _ => debug!("Ignoring axis 0x{:02x} from {} device", code, role),
            }
            return None;
        }

        if event_type == EventType::SYNCHRONIZATION && code == SYN_REPORT {
            return match role {
                DeviceRole::Accelerometer => self
                    .accel
                    .flush()
                    .map(|axes| RawEvent::Accel { channel: 0, axes }),
                DeviceRole::Ir => self.ir.flush().map(|axes| RawEvent::Ir { channel: 0, axes }),
                DeviceRole::Buttons => None,
            };
        }

        None
    }
}

/// Wii Remote event source backed by the kernel's evdev nodes.
pub struct WiimoteSource {
    name: String,
    buttons: Option<EventStream>,
    accel: Option<EventStream>,
    ir: Option<EventStream>,
    assembler: FrameAssembler,
}

impl WiimoteSource {
    // Find the driver's input devices by name and open them for async reads
    pub fn open(config: &DeviceConfig) -> Result<Self, DeviceError> {
        info!("Searching for input devices named '{}'", config.name);

        let mut source = Self {
            name: config.name.clone(),
            buttons: None,
            accel: None,
            ir: None,
            assembler: FrameAssembler::default(),
        };

        for (path, device) in evdev::enumerate() {
            let Some(name) = device.name().map(str::to_owned) else {
                continue;
            };
            let Some(role) = DeviceRole::from_name(&name, &config.name) else {
                continue;
            };

            let slot = match role {
                DeviceRole::Buttons => &mut source.buttons,
                DeviceRole::Accelerometer => &mut source.accel,
                DeviceRole::Ir => &mut source.ir,
            };
            if slot.is_some() {
                warn!("Ignoring additional {} device at {}", role, path.display());
                continue;
            }

            info!("Found {} device '{}' at {}", role, name, path.display());
            let stream = device
                .into_event_stream()
                .map_err(|e| DeviceError::OpenError {
                    role,
                    reason: format!("{}: {}", path.display(), e),
                })?;
            *slot = Some(stream);
        }

        if source.buttons.is_none() && source.accel.is_none() && source.ir.is_none() {
            return Err(DeviceError::NotFound(config.name.clone()));
        }

        for (role, present) in [
            (DeviceRole::Buttons, source.buttons.is_some()),
            (DeviceRole::Accelerometer, source.accel.is_some()),
            (DeviceRole::Ir, source.ir.is_some()),
        ] {
            if !present {
                warn!("No {} device found, its events will not be streamed", role);
            }
        }

        Ok(source)
    }

    async fn next_input(&mut self) -> Result<(DeviceRole, InputEvent), SourceError> {
        let Self {
            buttons, accel, ir, ..
        } = self;

        let result = tokio::select! {
            res = next_from(buttons.as_mut()) => res.map(|ev| (DeviceRole::Buttons, ev)),
            res = next_from(accel.as_mut()) => res.map(|ev| (DeviceRole::Accelerometer, ev)),
            res = next_from(ir.as_mut()) => res.map(|ev| (DeviceRole::Ir, ev)),
        };

        result.map_err(classify_io_error)
    }
}

impl EventSource for WiimoteSource {
    fn next_event(&mut self) -> SourceFuture<'_> {
        Box::pin(async move {
            loop {
                let (role, event) = self.next_input().await?;
                if let Some(raw) =
                    self.assembler
                        .push(role, event.event_type(), event.code(), event.value())
                {
                    return Ok(raw);
                }
            }
        })
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

async fn next_from(stream: Option<&mut EventStream>) -> io::Result<InputEvent> {
    match stream {
        Some(stream) => stream.next_event().await,
        None => std::future::pending().await,
    }
}

fn classify_io_error(e: io::Error) -> SourceError {
    if e.kind() == io::ErrorKind::WouldBlock {
        SourceError::WouldBlock
    } else if e.raw_os_error() == Some(ENODEV) {
        SourceError::Disconnected(e.to_string())
    } else {
        SourceError::ReadError(e.to_string())
    }
}
