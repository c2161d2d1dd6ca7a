use crate::protocol::button::{ButtonEvent, ButtonState, WiimoteButton};
use crate::protocol::error::DecodeError;
use crate::protocol::packet::Tag;

const COMMAND_PREFIX: &str = "button ";

/// Decoded datagram as a consumer sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Pointer([f32; 2]),
    Ir([f32; 3]),
    Accel([f32; 3]),
    Button(ButtonEvent),
}

/// Decodes one datagram of either framing.
///
/// A datagram starting with the literal `button ` prefix is parsed as a
/// legacy text command; anything else must start with a known tag byte.
pub fn decode(datagram: &[u8]) -> Result<Frame, DecodeError> {
    let Some(&first) = datagram.first() else {
        return Err(DecodeError::Empty);
    };

    if datagram.starts_with(COMMAND_PREFIX.as_bytes()) {
        return decode_command(datagram);
    }

    let tag = Tag::from_u8(first).ok_or(DecodeError::UnknownTag(first))?;
    if datagram.len() != tag.packet_len() {
        return Err(DecodeError::LengthMismatch {
            tag: first,
            expected: tag.packet_len(),
            actual: datagram.len(),
        });
    }

    let payload = &datagram[1..];
    let frame = match tag {
        Tag::Pointer => Frame::Pointer(read_floats(payload)),
        Tag::Ir => Frame::Ir(read_floats(payload)),
        Tag::Accel => Frame::Accel(read_floats(payload)),
        Tag::Button => {
            let button = WiimoteButton::from_id(payload[0])
                .ok_or_else(|| DecodeError::UnknownButton(format!("id {}", payload[0])))?;
            let state = ButtonState::from_value(payload[1] as i32)
                .ok_or(DecodeError::InvalidState(payload[1]))?;
            Frame::Button(ButtonEvent { button, state })
        }
    };
    Ok(frame)
}

fn read_floats<const N: usize>(payload: &[u8]) -> [f32; N] {
    let mut values = [0.0; N];
    for (value, chunk) in values.iter_mut().zip(payload.chunks_exact(4)) {
        *value = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    values
}

fn decode_command(datagram: &[u8]) -> Result<Frame, DecodeError> {
    let text = std::str::from_utf8(datagram)
        .map_err(|e| DecodeError::MalformedCommand(e.to_string()))?;

    let mut parts = text.split(' ');
    let (Some("button"), Some(state), Some(name), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::MalformedCommand(text.to_string()));
    };

    let state = match state {
        "0" => ButtonState::Released,
        "1" => ButtonState::Pressed,
        _ => return Err(DecodeError::MalformedCommand(text.to_string())),
    };
    let button =
        WiimoteButton::from_name(name).ok_or_else(|| DecodeError::UnknownButton(name.to_string()))?;

    Ok(Frame::Button(ButtonEvent { button, state }))
}
