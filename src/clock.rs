//! Hardware tick counter arithmetic
//!
//! Sample and pulse timestamps come from a free-running counter (an RTC on
//! the reference board) that is narrower than 32 bits and wraps silently.
//! Differences are therefore always taken modulo the counter width.

use crate::error::ConfigError;
use crate::types::ClockSettings;

/// Converts counter ticks to milliseconds and keeps a monotonic time base
///
/// # Example
/// ```
/// use lean_signal::{ClockSettings, TickClock};
///
/// let clock = TickClock::new(ClockSettings::default()).unwrap();
///
/// // 24-bit counter wrapped between the two readings
/// let elapsed = clock.elapsed_millis(0x00_0010, 0xFF_FFF0);
/// assert!((elapsed - 32.0 * 1000.0 / 32768.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct TickClock {
    settings: ClockSettings,
    mask: u32,
    millis_per_tick: f64,
    last_ticks: Option<u32>,
    total_ticks: u64,
}

impl TickClock {
    /// Create a clock for the described counter
    pub fn new(settings: ClockSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let mask = if settings.counter_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << settings.counter_bits) - 1
        };
        let millis_per_tick =
            (f64::from(settings.prescaler) + 1.0) * 1000.0 / f64::from(settings.frequency_hz);

        Ok(Self {
            settings,
            mask,
            millis_per_tick,
            last_ticks: None,
            total_ticks: 0,
        })
    }

    /// Counter description this clock was built from
    pub fn settings(&self) -> ClockSettings {
        self.settings
    }

    /// Ticks from `t0` to `t1`, assuming at most one wrap in between
    #[inline]
    pub fn ticks_between(&self, t1: u32, t0: u32) -> u32 {
        t1.wrapping_sub(t0) & self.mask
    }

    /// Milliseconds from `t0` to `t1`
    #[inline]
    pub fn elapsed_millis(&self, t1: u32, t0: u32) -> f32 {
        self.ticks_to_millis(self.ticks_between(t1, t0))
    }

    /// Convert a tick count to milliseconds
    #[inline]
    pub fn ticks_to_millis(&self, ticks: u32) -> f32 {
        (f64::from(ticks) * self.millis_per_tick) as f32
    }

    /// Feed the latest counter reading and return monotonic milliseconds
    ///
    /// Must be called at least once per counter period (512 s for the
    /// default 24-bit counter at 32.768 kHz) or wraps are lost.
    pub fn advance(&mut self, now_ticks: u32) -> u64 {
        let now_ticks = now_ticks & self.mask;
        if let Some(last) = self.last_ticks {
            self.total_ticks += u64::from(self.ticks_between(now_ticks, last));
        }
        self.last_ticks = Some(now_ticks);
        self.now_millis()
    }

    /// Milliseconds accumulated by [`TickClock::advance`]
    pub fn now_millis(&self) -> u64 {
        (self.total_ticks as f64 * self.millis_per_tick) as u64
    }
}
