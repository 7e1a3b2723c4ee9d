//! Turn-signal decision state machine
//!
//! Four states: IDLE, LEFT, RIGHT and BRAKE. Braking always preempts
//! steering. Turns are entered on a sustained lean (or an explicit request)
//! and left once the rider is upright again; a deep lean locks the turn so
//! that a short wobble back through the threshold does not drop it.
//!
//! Explicit rider requests are latched: a request stays in effect across
//! evaluations until a transition consumes it or the rider cancels it by
//! requesting IDLE.

use log::{debug, warn};

use crate::display::DisplaySink;
use crate::error::ConfigError;
use crate::types::{Override, RiderState, SignalSettings};

/// Everything one evaluation looks at
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FsmInputs {
    /// Smoothed roll in degrees, positive when leaning left
    pub smoothed_roll: f32,
    /// Latest window speed minus the weighted earlier windows
    pub speed_delta: f32,
    /// Request received since the previous evaluation
    pub override_request: Override,
    /// Monotonic time in milliseconds
    pub now_ms: u64,
}

/// Rider intent from lean, deceleration and explicit requests
///
/// # Example
/// ```
/// use lean_signal::{FsmInputs, Override, RiderState, TurnSignalFsm};
///
/// let mut fsm = TurnSignalFsm::new();
/// let mut shown = Vec::new();
///
/// let state = fsm.evaluate(
///     FsmInputs {
///         smoothed_roll: 20.0,
///         speed_delta: 0.0,
///         override_request: Override::NONE,
///         now_ms: 250,
///     },
///     &mut |s: RiderState| shown.push(s),
/// );
///
/// assert_eq!(state, RiderState::Left);
/// assert_eq!(shown, [RiderState::Left]);
/// ```
#[derive(Debug, Clone)]
pub struct TurnSignalFsm {
    settings: SignalSettings,
    state: RiderState,
    entered_at_ms: u64,
    turn_locked: bool,
    latched: Option<RiderState>,
}

impl TurnSignalFsm {
    /// IDLE state machine with default thresholds
    pub fn new() -> Self {
        Self::from_valid(SignalSettings::default())
    }

    /// IDLE state machine with custom thresholds
    pub fn with_settings(settings: SignalSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::from_valid(settings))
    }

    fn from_valid(settings: SignalSettings) -> Self {
        Self {
            settings,
            state: RiderState::Idle,
            entered_at_ms: 0,
            turn_locked: false,
            latched: None,
        }
    }

    pub fn settings(&self) -> SignalSettings {
        self.settings
    }

    /// Current state
    pub fn state(&self) -> RiderState {
        self.state
    }

    /// When the current state was entered (or BRAKE last re-armed)
    pub fn entered_at_ms(&self) -> u64 {
        self.entered_at_ms
    }

    /// Whether the current turn is held by a deep lean
    pub fn is_turn_locked(&self) -> bool {
        self.turn_locked
    }

    /// Request still waiting to be consumed
    pub fn latched_override(&self) -> Option<RiderState> {
        self.latched
    }

    /// Run one evaluation cycle and return the resulting state
    ///
    /// `sink` is notified once if, and only if, the state changes.
    pub fn evaluate<S>(&mut self, inputs: FsmInputs, sink: &mut S) -> RiderState
    where
        S: DisplaySink + ?Sized,
    {
        let roll = sanitize("smoothed roll", inputs.smoothed_roll);
        let speed_delta = sanitize("speed delta", inputs.speed_delta);
        let cancelled = self.accept(inputs.override_request);
        let now_ms = inputs.now_ms;

        let next = match self.state {
            RiderState::Idle => self.from_idle(roll, speed_delta),
            RiderState::Brake => self.from_brake(roll, speed_delta, now_ms),
            turn => self.from_turn(turn, roll, speed_delta, cancelled, now_ms),
        };

        if next != self.state {
            self.enter(next, roll, now_ms, sink);
        }
        self.state
    }

    /// Latch an explicit request; returns true when it was a cancel
    fn accept(&mut self, request: Override) -> bool {
        if !request.is_active() {
            return false;
        }
        if request.requested == RiderState::Idle {
            self.latched = None;
            return true;
        }
        self.latched = Some(request.requested);
        false
    }

    fn braking(&self, speed_delta: f32) -> bool {
        speed_delta < self.settings.braking_threshold || self.latched == Some(RiderState::Brake)
    }

    fn from_idle(&self, roll: f32, speed_delta: f32) -> RiderState {
        let threshold = self.settings.turn_threshold;
        if self.braking(speed_delta) {
            RiderState::Brake
        } else if roll > threshold || self.latched == Some(RiderState::Left) {
            RiderState::Left
        } else if roll < -threshold || self.latched == Some(RiderState::Right) {
            RiderState::Right
        } else {
            RiderState::Idle
        }
    }

    fn from_brake(&mut self, roll: f32, speed_delta: f32, now_ms: u64) -> RiderState {
        let held_for = now_ms.saturating_sub(self.entered_at_ms);
        if held_for < u64::from(self.settings.brake_hold_ms) {
            return RiderState::Brake;
        }

        if self.latched == Some(RiderState::Brake)
            || speed_delta < self.settings.deep_braking_threshold
        {
            debug!("brake hold re-armed at {} ms (speed delta {})", now_ms, speed_delta);
            self.entered_at_ms = now_ms;
            self.latched = None;
            return RiderState::Brake;
        }

        let threshold = self.settings.turn_threshold;
        match self.latched {
            Some(turn @ (RiderState::Left | RiderState::Right)) => turn,
            _ if roll < -threshold => RiderState::Right,
            _ if roll > threshold => RiderState::Left,
            _ => RiderState::Idle,
        }
    }

    fn from_turn(
        &mut self,
        turn: RiderState,
        roll: f32,
        speed_delta: f32,
        cancelled: bool,
        now_ms: u64,
    ) -> RiderState {
        if self.braking(speed_delta) {
            return RiderState::Brake;
        }
        if cancelled {
            return RiderState::Idle;
        }
        let opposite = turn.opposite();
        if self.latched == Some(opposite) {
            return opposite;
        }

        let threshold = self.settings.turn_threshold;
        let lean = lean_towards(turn, roll);
        if lean > threshold + self.settings.lock_margin {
            self.turn_locked = true;
        } else if lean < threshold {
            self.turn_locked = false;
        }
        if self.turn_locked {
            return turn;
        }

        if self.latched == Some(turn) {
            let timeout = u64::from(self.settings.turn_timeout_ms);
            let held_for = now_ms.saturating_sub(self.entered_at_ms);
            if timeout != 0 && held_for >= timeout {
                debug!("{} request timed out after {} ms", turn.as_str(), held_for);
                return RiderState::Idle;
            }
            return turn;
        }

        if -lean > threshold {
            opposite
        } else if roll.abs() < self.settings.hysteresis_band {
            RiderState::Idle
        } else {
            turn
        }
    }

    fn enter<S>(&mut self, next: RiderState, roll: f32, now_ms: u64, sink: &mut S)
    where
        S: DisplaySink + ?Sized,
    {
        debug!("{} -> {} at {} ms", self.state.as_str(), next.as_str(), now_ms);

        self.state = next;
        self.entered_at_ms = now_ms;
        self.turn_locked = next.is_turn()
            && lean_towards(next, roll) > self.settings.turn_threshold + self.settings.lock_margin;
        if matches!(next, RiderState::Idle | RiderState::Brake) {
            self.latched = None;
        }

        sink.on_state_changed(next);
    }
}

impl Default for TurnSignalFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Roll measured in the direction of `turn`
fn lean_towards(turn: RiderState, roll: f32) -> f32 {
    match turn {
        RiderState::Right => -roll,
        _ => roll,
    }
}

fn sanitize(name: &str, value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        warn!("non-finite {} ({}) treated as 0", name, value);
        0.0
    }
}
