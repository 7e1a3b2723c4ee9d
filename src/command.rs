//! Explicit rider requests: voice recognizer codes and handlebar buttons

use crate::types::{Override, RiderState};

/// Code the recognizer reports when nothing was heard
pub const VOICE_NO_DATA: u8 = 0xFF;

/// Phrases of the recognizer's built-in vocabulary that mean something here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VoiceCommand {
    /// "Left", code 0x10
    Left,
    /// "Right", code 0x11
    Right,
    /// "Stop", code 0x12
    Stop,
    /// "Start", code 0x13
    Start,
}

impl VoiceCommand {
    /// Decode a recognizer result byte
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x10 => Some(VoiceCommand::Left),
            0x11 => Some(VoiceCommand::Right),
            0x12 => Some(VoiceCommand::Stop),
            0x13 => Some(VoiceCommand::Start),
            _ => None,
        }
    }

    /// Word the rider says
    pub fn phrase(&self) -> &'static str {
        match self {
            VoiceCommand::Left => "Left",
            VoiceCommand::Right => "Right",
            VoiceCommand::Stop => "Stop",
            VoiceCommand::Start => "Start",
        }
    }

    /// "Stop" asks for the brake light, "Start" cancels any request
    pub fn requested_state(&self) -> RiderState {
        match self {
            VoiceCommand::Left => RiderState::Left,
            VoiceCommand::Right => RiderState::Right,
            VoiceCommand::Stop => RiderState::Brake,
            VoiceCommand::Start => RiderState::Idle,
        }
    }
}

/// Override for a recognizer result; unknown codes and no-data yield none
///
/// # Example
/// ```
/// use lean_signal::{Override, RiderState};
/// use lean_signal::command::{VOICE_NO_DATA, voice_override};
///
/// assert_eq!(voice_override(0x12), Override::voice(RiderState::Brake));
/// assert_eq!(voice_override(VOICE_NO_DATA), Override::NONE);
/// ```
pub fn voice_override(code: u8) -> Override {
    VoiceCommand::from_code(code)
        .map(|command| Override::voice(command.requested_state()))
        .unwrap_or(Override::NONE)
}

/// State selected by each of the four handlebar buttons, by index
pub const BUTTON_STATES: [RiderState; 4] = [
    RiderState::Idle,
    RiderState::Left,
    RiderState::Right,
    RiderState::Brake,
];

/// Override for a pressed button; out-of-range indices yield none
pub fn button_override(index: u8) -> Override {
    BUTTON_STATES
        .get(usize::from(index))
        .map(|state| Override::manual(*state))
        .unwrap_or(Override::NONE)
}
