use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::{NormalizedEvent, NormalizedSample};
use crate::protocol::button::ButtonEvent;

/// Wire protocol revision described by [`Tag`]
pub const PROTOCOL_VERSION: u8 = 1;

const FLOAT_SIZE: usize = 4;

/// Packet tags, protocol version 1
///
/// | Tag    | Meaning                     | Payload              | Length |
/// |--------|-----------------------------|----------------------|--------|
/// | `0x01` | legacy pointer (x, y)       | 2 x f32              | 9      |
/// | `0x02` | IR position (x, y, z)       | 3 x f32              | 13     |
/// | `0x03` | accelerometer (x, y, z)     | 3 x f32              | 13     |
/// | `0x10` | button, tagged framing only | u8 button, u8 state  | 3      |
///
/// All floats are big-endian IEEE-754 single precision. The tag alone
/// determines the datagram length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Pointer = 0x01,
    Ir = 0x02,
    Accel = 0x03,
    Button = 0x10,
}

impl Tag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Tag::Pointer),
            0x02 => Some(Tag::Ir),
            0x03 => Some(Tag::Accel),
            0x10 => Some(Tag::Button),
            _ => None,
        }
    }

    pub fn payload_len(&self) -> usize {
        match self {
            Tag::Pointer => 2 * FLOAT_SIZE,
            Tag::Ir | Tag::Accel => 3 * FLOAT_SIZE,
            Tag::Button => 2,
        }
    }

    // Full datagram length including the tag byte
    pub fn packet_len(&self) -> usize {
        1 + self.payload_len()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", *self as u8)
    }
}

/// Fixed-layout binary packet, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    tag: Tag,
    bytes: Vec<u8>,
}

impl Packet {
    fn from_floats(tag: Tag, values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(tag.packet_len());
        bytes.push(tag as u8);
        for value in values {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        debug_assert_eq!(bytes.len(), tag.packet_len());
        Self { tag, bytes }
    }

    fn from_button(event: &ButtonEvent) -> Self {
        Self {
            tag: Tag::Button,
            bytes: vec![Tag::Button as u8, event.button as u8, event.state.as_u8()],
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// How button transitions are framed on the socket
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// ASCII command next to binary packets, what the emulator consumes
    #[default]
    Legacy,

    /// Every datagram starts with a tag byte, buttons use tag 0x10
    Tagged,
}

/// One encoded datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    Packet(Packet),
    Command(String),
}

impl Datagram {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Datagram::Packet(packet) => packet.as_bytes(),
            Datagram::Command(command) => command.as_bytes(),
        }
    }
}

impl fmt::Display for Datagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datagram::Packet(packet) => {
                write!(f, "packet {} ({} bytes)", packet.tag(), packet.as_bytes().len())
            }
            Datagram::Command(command) => write!(f, "command '{}'", command),
        }
    }
}

// Encoder for normalized events
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    framing: Framing,
}

impl Encoder {
    pub fn new(framing: Framing) -> Self {
        Self { framing }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn encode_sample(&self, sample: &NormalizedSample) -> Packet {
        match sample {
            NormalizedSample::Pointer(values) => Packet::from_floats(Tag::Pointer, values),
            NormalizedSample::Ir(values) => Packet::from_floats(Tag::Ir, values),
            NormalizedSample::Accel(values) => Packet::from_floats(Tag::Accel, values),
        }
    }

    pub fn encode_button(&self, event: &ButtonEvent) -> Datagram {
        match self.framing {
            Framing::Legacy => Datagram::Command(event.command()),
            Framing::Tagged => Datagram::Packet(Packet::from_button(event)),
        }
    }

    pub fn encode(&self, event: &NormalizedEvent) -> Datagram {
        let datagram = match event {
            NormalizedEvent::Sample(sample) => Datagram::Packet(self.encode_sample(sample)),
            NormalizedEvent::Button(button) => self.encode_button(button),
        };
        debug!("Encoded {}", datagram);
        datagram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::button::{ButtonState, WiimoteButton};

    #[test]
    fn tag_determines_length() {
        let encoder = Encoder::default();
        for sample in [
            NormalizedSample::Pointer([0.25, 0.75]),
            NormalizedSample::Ir([0.0, 0.5, 1.0]),
            NormalizedSample::Accel([512.0, 0.0, -3.5]),
        ] {
            let packet = encoder.encode_sample(&sample);
            assert_eq!(packet.as_bytes().len(), packet.tag().packet_len());
            assert_eq!(packet.as_bytes()[0], packet.tag() as u8);
        }
    }

    #[test]
    fn floats_are_big_endian() {
        let packet = Encoder::default().encode_sample(&NormalizedSample::Pointer([1.0, -2.0]));
        assert_eq!(
            packet.as_bytes(),
            &[0x01, 0x3f, 0x80, 0x00, 0x00, 0xc0, 0x00, 0x00, 0x00]
        );
        assert_eq!(packet.payload().len(), 8);
    }

    #[test]
    fn accel_and_ir_use_distinct_tags() {
        let encoder = Encoder::default();
        let ir = encoder.encode_sample(&NormalizedSample::Ir([0.1, 0.2, 0.3]));
        let accel = encoder.encode_sample(&NormalizedSample::Accel([0.1, 0.2, 0.3]));
        assert_eq!(ir.tag(), Tag::Ir);
        assert_eq!(accel.tag(), Tag::Accel);
        assert_eq!(ir.payload(), accel.payload());
    }

    #[test]
    fn legacy_framing_sends_text() {
        let event = ButtonEvent {
            button: WiimoteButton::Plus,
            state: ButtonState::Pressed,
        };
        let datagram = Encoder::new(Framing::Legacy).encode(&NormalizedEvent::Button(event));
        assert_eq!(datagram.as_bytes(), b"button 1 WIIMOTE_PLUS");
    }

    #[test]
    fn tagged_framing_sends_fixed_button_packet() {
        let event = ButtonEvent {
            button: WiimoteButton::Two,
            state: ButtonState::Released,
        };
        let datagram = Encoder::new(Framing::Tagged).encode(&NormalizedEvent::Button(event));
        assert_eq!(datagram.as_bytes(), &[0x10, 10, 0]);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_eq!(Tag::from_u8(0x00), None);
        assert_eq!(Tag::from_u8(b'b'), None);
        assert_eq!(Tag::from_u8(0x03), Some(Tag::Accel));
    }
}
