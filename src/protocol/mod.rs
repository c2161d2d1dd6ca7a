//! # Wire Protocol
//!
//! Encodes normalized events into UDP datagrams for the emulator and decodes them
//! again on the consumer side.
//!
//! ```text
//! protocol/
//! ├── button.rs  - Closed Wii Remote button set and the text command format
//! ├── packet.rs  - Tag table, fixed-layout packets and the encoder
//! ├── decode.rs  - Datagram decoder for both framings
//! └── error.rs   - Decode errors
//! ```
//!
//! Binary packets start with a tag byte that fixes their length. In legacy
//! framing, button transitions travel as ASCII (`"button 1 WIIMOTE_A"`) on the
//! same socket; consumers tell the two apart by the first byte. Tagged framing
//! replaces the text with a 3 byte packet so every datagram is self-describing.

pub mod button;
pub mod decode;
pub mod error;
pub mod packet;

pub use button::{ButtonEvent, ButtonState, WiimoteButton};
pub use decode::{decode, Frame};
pub use error::DecodeError;
pub use packet::{Datagram, Encoder, Framing, Packet, Tag, PROTOCOL_VERSION};
