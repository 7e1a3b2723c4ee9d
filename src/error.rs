//! Configuration errors
//!
//! Every runtime path in this crate is infallible. Mistakes in the tunable
//! constants are caught once, when a component is constructed.

use thiserror::Error;

/// Rejected configuration value
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A smoothing window was declared with zero slots
    #[error("smoothing window capacity must be at least one sample")]
    ZeroCapacity,
    /// Filter gain must be a positive finite number
    #[error("filter gain beta must be positive and finite, got {0}")]
    InvalidBeta(f32),
    /// Distance travelled per wheel pulse must be positive and finite
    #[error("arc length per pulse must be positive and finite, got {0} m")]
    InvalidArcLength(f32),
    /// Speed sanity ceiling must be positive and finite
    #[error("speed ceiling must be positive and finite, got {0} m/s")]
    InvalidSpeedCeiling(f32),
    /// Tick reference clock of zero hertz
    #[error("tick clock frequency must be non-zero")]
    ZeroClockFrequency,
    /// Hardware counter width outside 1..=32 bits
    #[error("counter width must be between 1 and 32 bits, got {0}")]
    InvalidCounterWidth(u8),
    /// Turn threshold does not clear the return-to-centre band
    #[error("turn threshold {threshold} deg must exceed hysteresis band {band} deg")]
    TurnThresholdBelowBand {
        /// Configured lean threshold in degrees
        threshold: f32,
        /// Configured hysteresis band in degrees
        band: f32,
    },
    /// Braking thresholds must be negative with the deep threshold at or below the normal one
    #[error("braking thresholds out of order: braking {braking}, deep braking {deep}")]
    InvalidBrakingThresholds {
        /// Threshold that enters BRAKE
        braking: f32,
        /// Threshold that re-arms BRAKE
        deep: f32,
    },
    /// A timer that must be non-zero was configured as zero
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),
    /// A margin or band that must not be negative
    #[error("{0} must not be negative")]
    Negative(&'static str),
    /// Axis map reads the same sensor axis twice
    #[error("axis map must use each sensor axis exactly once")]
    InvalidAxisMap,
    /// Any other setting that is NaN or infinite
    #[error("{0} must be finite")]
    NonFinite(&'static str),
}
