use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

// Event category, also the key for latency statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Accel,
    Ir,
    Key,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Accel, Category::Ir, Category::Key];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Accel => write!(f, "ACCEL"),
            Category::Ir => write!(f, "IR"),
            Category::Key => write!(f, "KEY"),
        }
    }
}

/// Raw axis readings of one motion frame.
///
/// An axis is `None` when the device has not reported it yet.
pub type RawAxes = [Option<i32>; 3];

// Raw device event, exactly as the source produced it
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Accel { channel: u8, axes: RawAxes },
    Ir { channel: u8, axes: RawAxes },
    Key { code: u16, state: i32 },
}

impl RawEvent {
    pub fn category(&self) -> Category {
        match self {
            RawEvent::Accel { .. } => Category::Accel,
            RawEvent::Ir { .. } => Category::Ir,
            RawEvent::Key { .. } => Category::Key,
        }
    }
}

// Event source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Event source would block")]
    WouldBlock,

    #[error("Event source disconnected: {0}")]
    Disconnected(String),

    #[error("Failed to read event: {0}")]
    ReadError(String),
}

impl SourceError {
    /// Whether the dispatcher has to stop pulling from this source.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Disconnected(_))
    }
}

pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<RawEvent, SourceError>> + Send + 'a>>;

/// Anything that can yield raw motion-controller events.
///
/// `next_event` resolves once one complete event is available. The dispatcher
/// bounds the wait with its poll timeout and may drop the future on timeout, so
/// implementations must keep partially assembled state in `self`, not in the
/// future.
pub trait EventSource: Send {
    fn next_event(&mut self) -> SourceFuture<'_>;

    // Human readable name for logging
    fn describe(&self) -> String {
        "event source".to_string()
    }
}
