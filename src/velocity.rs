//! Wheel speed and distance from hall-sensor pulses
//!
//! Each pulse yields an instantaneous speed from the time since the previous
//! pulse. The pulses of one reporting window (250 ms on the reference board)
//! are averaged into a window speed, and the last four window speeds form
//! the history used to detect deceleration.
//!
//! After [`WheelSettings::stop_windows`] empty windows the wheel is treated as
//! stopped and the next pulse only restarts timing. The tick counter wraps
//! silently, so a gap spanning a long stop cannot be measured.

use heapless::Vec;
use log::trace;

use crate::clock::TickClock;
use crate::error::ConfigError;
use crate::types::{ClockSettings, WheelSettings};

/// Maximum instantaneous readings kept per window
pub const WINDOW_CAPACITY: usize = 64;

/// Number of window speeds kept for trend detection
pub const HISTORY_LEN: usize = 4;

/// Weights applied to the three windows before the current one, oldest first
const TREND_WEIGHTS: [f32; HISTORY_LEN - 1] = [0.1, 0.4, 0.5];

/// Speed, trend and odometer for one wheel
///
/// # Example
/// ```
/// use lean_signal::{ClockSettings, VelocityEstimator, WheelSettings};
///
/// let mut wheel =
///     VelocityEstimator::new(WheelSettings::default(), ClockSettings::default()).unwrap();
///
/// for i in 0..10 {
///     wheel.on_pulse(i * 800); // one pulse every ~24 ms
/// }
/// wheel.on_window_tick();
///
/// assert!((wheel.cumulative_distance() - 2.721).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    settings: WheelSettings,
    clock: TickClock,
    last_pulse: Option<u32>,
    pulse_count: u32,
    empty_windows: u16,
    readings: Vec<f32, WINDOW_CAPACITY>,
    history: [f32; HISTORY_LEN],
    distance: f64,
}

impl VelocityEstimator {
    /// Create an estimator with zero history and zero distance
    pub fn new(settings: WheelSettings, clock: ClockSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            clock: TickClock::new(clock)?,
            last_pulse: None,
            pulse_count: 0,
            empty_windows: 0,
            readings: Vec::new(),
            history: [0.0; HISTORY_LEN],
            distance: 0.0,
        })
    }

    /// Wheel settings in use
    pub fn settings(&self) -> WheelSettings {
        self.settings
    }

    /// Record one pulse seen at `now_ticks`
    pub fn on_pulse(&mut self, now_ticks: u32) {
        self.pulse_count = self.pulse_count.saturating_add(1);

        let Some(previous) = self.last_pulse.replace(now_ticks) else {
            return;
        };

        let dt_millis = self.clock.elapsed_millis(now_ticks, previous);
        if dt_millis <= 0.0 {
            trace!("pulse at tick {} has no elapsed time, ignored", now_ticks);
            return;
        }

        let meters_per_second = self.settings.arc_length_per_pulse / (dt_millis * 0.001);
        if !meters_per_second.is_finite() || meters_per_second >= self.settings.speed_ceiling_mps {
            trace!("discarding speed outlier {} m/s at tick {}", meters_per_second, now_ticks);
            return;
        }
        let speed = self.settings.unit.from_meters_per_second(meters_per_second);

        if self.readings.push(speed).is_err() {
            trace!("speed window full, reading {} dropped", speed);
        }
    }

    /// Count pulses whose timestamps were lost
    ///
    /// They still add distance but contribute no speed reading. The gap to the
    /// next timed pulse spans an unknown number of arcs, so timing restarts
    /// there. Call this before feeding the timed pulses that followed them.
    pub fn on_untimed_pulses(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        self.pulse_count = self.pulse_count.saturating_add(count);
        self.last_pulse = None;
    }

    /// Close the current window and return its mean speed
    pub fn on_window_tick(&mut self) -> f32 {
        let speed = if self.readings.is_empty() {
            0.0
        } else {
            let sum: f32 = self.readings.iter().sum();
            sum / self.readings.len() as f32
        };

        self.history.rotate_left(1);
        self.history[HISTORY_LEN - 1] = speed;

        let arc_length = f64::from(self.settings.arc_length_per_pulse);
        self.distance += f64::from(self.pulse_count) * arc_length;

        if self.pulse_count == 0 {
            self.empty_windows = self.empty_windows.saturating_add(1);
            if self.empty_windows >= self.settings.stop_windows && self.last_pulse.is_some() {
                trace!("wheel stopped after {} empty windows", self.empty_windows);
                self.last_pulse = None;
            }
        } else {
            self.empty_windows = 0;
        }

        self.readings.clear();
        self.pulse_count = 0;
        speed
    }

    /// Difference between the latest window and a weighted average of the three before it
    ///
    /// Negative while the bicycle slows down.
    pub fn speed_delta(&self) -> f32 {
        let weighted: f32 = self.history[..HISTORY_LEN - 1]
            .iter()
            .zip(TREND_WEIGHTS)
            .map(|(speed, weight)| speed * weight)
            .sum();
        self.current_speed() - weighted
    }

    /// Speed of the most recently closed window
    pub fn current_speed(&self) -> f32 {
        self.history[HISTORY_LEN - 1]
    }

    /// Window speeds, oldest first
    pub fn history(&self) -> [f32; HISTORY_LEN] {
        self.history
    }

    /// Metres travelled since creation
    pub fn cumulative_distance(&self) -> f64 {
        self.distance
    }

    /// Pulses counted in the open window
    pub fn pending_pulses(&self) -> u32 {
        self.pulse_count
    }
}
