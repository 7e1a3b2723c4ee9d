//! Fixed-window moving average

use crate::error::ConfigError;

/// Default number of samples averaged for roll and lateral acceleration
pub const DEFAULT_WINDOW: usize = 300;

/// Circular buffer of the last `N` values and their running mean
///
/// Slots that have not been written yet count as zero, so the mean is biased
/// toward zero until `N` values have been pushed. Callers see a short
/// start-up transient; this is intentional and the buffer is never
/// re-scaled by the number of values actually received.
///
/// # Example
/// ```
/// use lean_signal::SlidingSmoother;
///
/// let mut roll = SlidingSmoother::<4>::new().unwrap();
/// assert_eq!(roll.push(8.0), 2.0); // 8 / 4, three empty slots
/// roll.push(8.0);
/// roll.push(8.0);
/// assert_eq!(roll.push(8.0), 8.0);
/// ```
#[derive(Debug, Clone)]
pub struct SlidingSmoother<const N: usize> {
    buffer: [f32; N],
    write_index: usize,
    pushed: usize,
    mean: f32,
}

impl<const N: usize> SlidingSmoother<N> {
    /// Create a zero-filled window; a zero-sized window is rejected
    pub fn new() -> Result<Self, ConfigError> {
        if N == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            buffer: [0.0; N],
            write_index: 0,
            pushed: 0,
            mean: 0.0,
        })
    }

    /// Overwrite the oldest slot and return the mean of all `N` slots
    pub fn push(&mut self, value: f32) -> f32 {
        self.buffer[self.write_index] = value;
        self.write_index = (self.write_index + 1) % N;
        self.pushed = self.pushed.saturating_add(1);

        // f64 accumulation keeps N copies of v averaging back to exactly v
        let sum: f64 = self.buffer.iter().map(|v| f64::from(*v)).sum();
        self.mean = (sum / N as f64) as f32;
        self.mean
    }

    /// Mean returned by the latest push
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Window size
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of slots holding pushed values
    pub fn len(&self) -> usize {
        self.pushed.min(N)
    }

    /// Whether nothing has been pushed since creation or the last reset
    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }

    /// Whether every slot holds a real value
    pub fn is_primed(&self) -> bool {
        self.pushed >= N
    }

    /// Zero every slot
    pub fn reset(&mut self) {
        self.buffer = [0.0; N];
        self.write_index = 0;
        self.pushed = 0;
        self.mean = 0.0;
    }
}
