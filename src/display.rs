//! Output side: state notifications, dashboard text and LED strip frames

use crate::types::{RiderState, Telemetry};

/// Interval between two LED animation frames, milliseconds
pub const FRAME_PERIOD_MS: u32 = 250;

/// Receives everything the decision core wants to show the rider
///
/// Implementations drive the LED strip, the dashboard or a log. Any
/// `FnMut(RiderState)` closure is a sink that ignores telemetry.
pub trait DisplaySink {
    /// Called once per state change, after the new state is in effect
    fn on_state_changed(&mut self, state: RiderState);

    /// Called with fresh dashboard numbers
    fn on_telemetry(&mut self, _telemetry: &Telemetry) {}
}

impl<F> DisplaySink for F
where
    F: FnMut(RiderState),
{
    fn on_state_changed(&mut self, state: RiderState) {
        self(state)
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn on_state_changed(&mut self, _state: RiderState) {}
}

/// Four-character indicator for a segment display
pub fn indicator_text(state: RiderState) -> &'static str {
    match state {
        RiderState::Left => "A---",
        RiderState::Right => "---A",
        RiderState::Idle | RiderState::Brake => "----",
    }
}

/// 24-bit colour of one strip pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const IDLE_GLOW: Rgb = Rgb::new(48, 12, 0);
    pub const AMBER: Rgb = Rgb::new(255, 128, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Frame generator for the rear LED strip
///
/// Call [`LedPattern::next_frame`] every [`FRAME_PERIOD_MS`]:
/// - Idle: whole strip in a dim glow
/// - Right: sweep growing from the first LED
/// - Left: sweep growing from the last LED
/// - Brake: whole strip flashing red
///
/// # Example
/// ```
/// use lean_signal::{LedPattern, RiderState, Rgb};
///
/// let mut pattern = LedPattern::new();
/// pattern.set_state(RiderState::Right);
///
/// let mut strip = [Rgb::OFF; 4];
/// pattern.next_frame(&mut strip);
/// assert_eq!(strip[0], Rgb::AMBER);
/// assert_eq!(strip[1], Rgb::OFF);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LedPattern {
    state: RiderState,
    iteration: usize,
}

impl LedPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch animation; the new one starts from its first frame
    pub fn set_state(&mut self, state: RiderState) {
        self.state = state;
        self.iteration = 0;
    }

    /// Animation currently playing
    pub fn state(&self) -> RiderState {
        self.state
    }

    /// Render the next frame into `strip`
    pub fn next_frame(&mut self, strip: &mut [Rgb]) {
        strip.fill(Rgb::OFF);
        let len = strip.len();
        if len == 0 {
            return;
        }

        match self.state {
            RiderState::Idle => strip.fill(Rgb::IDLE_GLOW),
            RiderState::Right => {
                let lit = self.iteration % len + 1;
                strip[..lit].fill(Rgb::AMBER);
                self.iteration = lit % len;
            }
            RiderState::Left => {
                let lit = self.iteration % len + 1;
                strip[len - lit..].fill(Rgb::AMBER);
                self.iteration = lit % len;
            }
            RiderState::Brake => {
                if self.iteration % 2 == 0 {
                    strip.fill(Rgb::RED);
                }
                self.iteration = (self.iteration + 1) % 2;
            }
        }
    }
}

impl DisplaySink for LedPattern {
    fn on_state_changed(&mut self, state: RiderState) {
        self.set_state(state);
    }
}
