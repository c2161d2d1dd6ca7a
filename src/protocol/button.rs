use std::fmt;

use tracing::debug;

// Linux input event codes emitted by the kernel Wii Remote driver
pub mod codes {
    pub const KEY_UP: u16 = 103;
    pub const KEY_LEFT: u16 = 105;
    pub const KEY_RIGHT: u16 = 106;
    pub const KEY_DOWN: u16 = 108;
    pub const KEY_NEXT: u16 = 407;
    pub const KEY_PREVIOUS: u16 = 412;
    pub const BTN_1: u16 = 0x101;
    pub const BTN_2: u16 = 0x102;
    pub const BTN_A: u16 = 0x130;
    pub const BTN_B: u16 = 0x131;
    pub const BTN_MODE: u16 = 0x13c;
}

// Wii Remote buttons; the set is closed, there is no "unknown" variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WiimoteButton {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    A = 4,
    B = 5,
    Plus = 6,
    Minus = 7,
    Home = 8,
    One = 9,
    Two = 10,
}

impl WiimoteButton {
    pub const ALL: [WiimoteButton; 11] = [
        WiimoteButton::Up,
        WiimoteButton::Down,
        WiimoteButton::Left,
        WiimoteButton::Right,
        WiimoteButton::A,
        WiimoteButton::B,
        WiimoteButton::Plus,
        WiimoteButton::Minus,
        WiimoteButton::Home,
        WiimoteButton::One,
        WiimoteButton::Two,
    ];

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            codes::KEY_UP => Some(WiimoteButton::Up),
            codes::KEY_DOWN => Some(WiimoteButton::Down),
            codes::KEY_LEFT => Some(WiimoteButton::Left),
            codes::KEY_RIGHT => Some(WiimoteButton::Right),
            codes::BTN_A => Some(WiimoteButton::A),
            codes::BTN_B => Some(WiimoteButton::B),
            codes::KEY_NEXT => Some(WiimoteButton::Plus),
            codes::KEY_PREVIOUS => Some(WiimoteButton::Minus),
            codes::BTN_MODE => Some(WiimoteButton::Home),
            codes::BTN_1 => Some(WiimoteButton::One),
            codes::BTN_2 => Some(WiimoteButton::Two),
            _ => None,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|button| *button as u8 == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|button| button.name() == name)
    }

    // Name as the emulator's text command expects it
    pub fn name(&self) -> &'static str {
        match self {
            WiimoteButton::Up => "WIIMOTE_UP",
            WiimoteButton::Down => "WIIMOTE_DOWN",
            WiimoteButton::Left => "WIIMOTE_LEFT",
            WiimoteButton::Right => "WIIMOTE_RIGHT",
            WiimoteButton::A => "WIIMOTE_A",
            WiimoteButton::B => "WIIMOTE_B",
            WiimoteButton::Plus => "WIIMOTE_PLUS",
            WiimoteButton::Minus => "WIIMOTE_MINUS",
            WiimoteButton::Home => "HOME",
            WiimoteButton::One => "WIIMOTE_1",
            WiimoteButton::Two => "WIIMOTE_2",
        }
    }
}

impl fmt::Display for WiimoteButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released = 0,
    Pressed = 1,
}

impl ButtonState {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(ButtonState::Released),
            1 => Some(ButtonState::Pressed),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

// Discrete button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: WiimoteButton,
    pub state: ButtonState,
}

impl ButtonEvent {
    /// Maps a raw key event. Unmapped codes and auto-repeat yield `None`.
    pub fn from_raw(code: u16, value: i32) -> Option<Self> {
        let Some(button) = WiimoteButton::from_code(code) else {
            debug!("Dropping unmapped key code {}", code);
            return None;
        };
        let Some(state) = ButtonState::from_value(value) else {
            debug!("Dropping {} with state {}", button, value);
            return None;
        };
        Some(Self { button, state })
    }

    // Legacy text command, e.g. "button 1 WIIMOTE_A"
    pub fn command(&self) -> String {
        format!("button {} {}", self.state.as_u8(), self.button.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_of_a() {
        let press = ButtonEvent::from_raw(codes::BTN_A, 1).unwrap();
        let release = ButtonEvent::from_raw(codes::BTN_A, 0).unwrap();

        assert_eq!(press.command(), "button 1 WIIMOTE_A");
        assert_eq!(release.command(), "button 0 WIIMOTE_A");
    }

    #[test]
    fn home_has_no_prefix() {
        let event = ButtonEvent::from_raw(codes::BTN_MODE, 1).unwrap();
        assert_eq!(event.command(), "button 1 HOME");
    }

    #[test]
    fn unmapped_codes_are_dropped() {
        // BTN_C exists on the Nunchuk, not on the remote itself
        assert_eq!(ButtonEvent::from_raw(0x132, 1), None);
        assert_eq!(ButtonEvent::from_raw(0, 0), None);
    }

    #[test]
    fn autorepeat_is_dropped() {
        assert_eq!(ButtonEvent::from_raw(codes::BTN_B, 2), None);
    }

    #[test]
    fn every_button_resolves_back_from_its_id_and_name() {
        for button in WiimoteButton::ALL {
            assert_eq!(WiimoteButton::from_id(button as u8), Some(button));
            assert_eq!(WiimoteButton::from_name(button.name()), Some(button));
        }
        assert_eq!(WiimoteButton::from_id(11), None);
    }
}
