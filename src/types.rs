//! Core data types and settings for the turn-signal decision core

use nalgebra::Vector3;

use crate::axes::AxisMap;
use crate::error::ConfigError;
use crate::math::DEG_TO_RAD;

/// Metres per second to miles per hour
const MPS_TO_MPH: f32 = 2.236_936;
/// Metres per second to kilometres per hour
const MPS_TO_KPH: f32 = 3.6;

/// One timestamped reading from the inertial sensor
///
/// Produced by the sensor driver whenever the data-ready interrupt fires, so
/// consecutive samples are not evenly spaced. The magnetometer is expected to
/// be already hard/soft-iron corrected (see [`crate::calibration`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Accelerometer reading in g
    pub accelerometer: Vector3<f32>,
    /// Gyroscope reading in degrees per second
    pub gyroscope: Vector3<f32>,
    /// Calibrated magnetometer reading (any consistent unit)
    pub magnetometer: Vector3<f32>,
    /// Hardware counter value when the sample was taken
    pub timestamp: u32,
}

impl SensorSample {
    /// Build a sample from the three sensor triples and a tick timestamp
    pub fn new(
        accelerometer: Vector3<f32>,
        gyroscope: Vector3<f32>,
        magnetometer: Vector3<f32>,
        timestamp: u32,
    ) -> Self {
        Self {
            accelerometer,
            gyroscope,
            magnetometer,
            timestamp,
        }
    }

    /// Whether every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.accelerometer.iter().all(|v| v.is_finite())
            && self.gyroscope.iter().all(|v| v.is_finite())
            && self.magnetometer.iter().all(|v| v.is_finite())
    }
}

/// Orientation expressed as Euler angles plus gravity-free acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    /// Roll in degrees, positive when leaning towards the left signal
    pub roll: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Heading in degrees, declination corrected, in `[0, 360)`
    pub yaw: f32,
    /// Accelerometer reading with the gravity component removed, in g
    pub linear_acceleration: Vector3<f32>,
}

impl Default for EulerAngles {
    fn default() -> Self {
        Self {
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            linear_acceleration: Vector3::zeros(),
        }
    }
}

/// Rider intent shown on the LED strip and dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RiderState {
    /// Riding straight, no signal
    #[default]
    Idle,
    /// Left turn signal
    Left,
    /// Right turn signal
    Right,
    /// Brake light
    Brake,
}

impl RiderState {
    /// Short upper-case name, handy for logs and serial consoles
    pub fn as_str(&self) -> &'static str {
        match self {
            RiderState::Idle => "IDLE",
            RiderState::Left => "LEFT",
            RiderState::Right => "RIGHT",
            RiderState::Brake => "BRAKE",
        }
    }

    /// Whether this is one of the two turn states
    pub fn is_turn(&self) -> bool {
        matches!(self, RiderState::Left | RiderState::Right)
    }

    /// Left for Right and vice versa; Idle and Brake map to themselves
    pub fn opposite(&self) -> RiderState {
        match self {
            RiderState::Left => RiderState::Right,
            RiderState::Right => RiderState::Left,
            other => *other,
        }
    }
}

/// Where a manual request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverrideSource {
    /// No request this cycle
    #[default]
    None,
    /// Voice recognizer
    Voice,
    /// Handlebar button
    Manual,
}

/// Explicit rider request fed into one FSM evaluation
///
/// A request whose source is [`OverrideSource::None`] is ignored regardless
/// of the requested state. Requesting [`RiderState::Idle`] cancels any
/// request the state machine is still holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Override {
    /// Origin of the request
    pub source: OverrideSource,
    /// State the rider asked for
    pub requested: RiderState,
}

impl Override {
    /// No request
    pub const NONE: Override = Override {
        source: OverrideSource::None,
        requested: RiderState::Idle,
    };

    /// Request coming from the voice recognizer
    pub const fn voice(requested: RiderState) -> Self {
        Self {
            source: OverrideSource::Voice,
            requested,
        }
    }

    /// Request coming from a handlebar button
    pub const fn manual(requested: RiderState) -> Self {
        Self {
            source: OverrideSource::Manual,
            requested,
        }
    }

    /// Whether this carries a request at all
    pub fn is_active(&self) -> bool {
        self.source != OverrideSource::None
    }
}

/// Numbers for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Distance ridden since power-up in metres
    pub distance_m: f64,
    /// Latest window speed in the configured unit
    pub speed: f32,
    /// Smoothed roll in degrees
    pub roll: f32,
    /// Current rider state
    pub state: RiderState,
}

/// Attitude filter settings
///
/// # Example
/// ```
/// use lean_signal::{AttitudeSettings, beta_from_gyro_error};
///
/// let settings = AttitudeSettings {
///     beta: beta_from_gyro_error(5.0), // well calibrated gyroscope
/// };
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttitudeSettings {
    /// Gradient-descent gain
    ///
    /// Fixed for the lifetime of the filter. Larger values trust the
    /// accelerometer and magnetometer more and the gyroscope less.
    pub beta: f32,
}

impl Default for AttitudeSettings {
    fn default() -> Self {
        Self {
            beta: beta_from_gyro_error(DEFAULT_GYRO_ERROR_DEG),
        }
    }
}

impl AttitudeSettings {
    /// Reject a non-positive or non-finite gain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(ConfigError::InvalidBeta(self.beta));
        }
        Ok(())
    }
}

/// Assumed gyroscope measurement error used for the default gain, deg/s
pub const DEFAULT_GYRO_ERROR_DEG: f32 = 40.0;

/// Filter gain for a given gyroscope measurement error
///
/// `beta = sqrt(3/4) * error`, with the error converted to rad/s.
pub fn beta_from_gyro_error(error_deg_per_s: f32) -> f32 {
    0.866_025_4 * error_deg_per_s * DEG_TO_RAD
}

/// Unit speeds are reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedUnit {
    /// m/s
    MetersPerSecond,
    /// km/h
    KilometersPerHour,
    /// mph
    #[default]
    MilesPerHour,
}

impl SpeedUnit {
    /// Convert a speed in metres per second into this unit
    pub fn from_meters_per_second(&self, speed: f32) -> f32 {
        match self {
            SpeedUnit::MetersPerSecond => speed,
            SpeedUnit::KilometersPerHour => speed * MPS_TO_KPH,
            SpeedUnit::MilesPerHour => speed * MPS_TO_MPH,
        }
    }
}

/// Wheel sensor geometry and plausibility limits
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WheelSettings {
    /// Distance the bicycle travels between two hall-sensor pulses, metres
    pub arc_length_per_pulse: f32,
    /// Unit for every speed produced by the estimator
    pub unit: SpeedUnit,
    /// Instantaneous readings at or above this speed, in m/s, are discarded
    ///
    /// Kept in m/s so the limit means the same thing whatever `unit` is.
    pub speed_ceiling_mps: f32,
    /// Consecutive windows without a pulse after which the wheel counts as stopped
    ///
    /// The next pulse then starts a fresh timing chain instead of being timed
    /// against a pulse from before the stop.
    pub stop_windows: u16,
}

/// Default sanity ceiling: 30 mph in m/s
pub const DEFAULT_SPEED_CEILING_MPS: f32 = 30.0 / MPS_TO_MPH;

impl Default for WheelSettings {
    fn default() -> Self {
        Self {
            arc_length_per_pulse: 0.2721,
            unit: SpeedUnit::MilesPerHour,
            speed_ceiling_mps: DEFAULT_SPEED_CEILING_MPS,
            stop_windows: 8,
        }
    }
}

impl WheelSettings {
    /// Settings for `magnets` evenly spaced magnets on a wheel of the given circumference
    ///
    /// A zero magnet count is treated as one.
    pub fn from_circumference(circumference_m: f32, magnets: u8) -> Self {
        Self {
            arc_length_per_pulse: circumference_m / f32::from(magnets.max(1)),
            ..Default::default()
        }
    }

    /// Reject impossible geometry or limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.arc_length_per_pulse.is_finite() || self.arc_length_per_pulse <= 0.0 {
            return Err(ConfigError::InvalidArcLength(self.arc_length_per_pulse));
        }
        if !self.speed_ceiling_mps.is_finite() || self.speed_ceiling_mps <= 0.0 {
            return Err(ConfigError::InvalidSpeedCeiling(self.speed_ceiling_mps));
        }
        if self.stop_windows == 0 {
            return Err(ConfigError::ZeroDuration("stop_windows"));
        }
        Ok(())
    }
}

/// Thresholds and timers of the turn-signal state machine
///
/// None of these ever converged to final values on the bike, so all of them
/// are tunable.
///
/// # Example
/// ```
/// use lean_signal::SignalSettings;
///
/// let settings = SignalSettings {
///     turn_threshold: 17.0,   // stiffer frame, less lean needed
///     turn_timeout_ms: 0,     // never time out a requested turn
///     ..Default::default()
/// };
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalSettings {
    /// Smoothed roll, in degrees, beyond which a turn is signalled
    pub turn_threshold: f32,
    /// Extra lean past the threshold that locks a turn
    pub lock_margin: f32,
    /// |roll| below this returns an unlocked turn to idle, degrees
    pub hysteresis_band: f32,
    /// Speed delta below which braking is signalled
    pub braking_threshold: f32,
    /// Speed delta below which an expiring brake hold is re-armed
    pub deep_braking_threshold: f32,
    /// Minimum time spent in BRAKE before any transition, milliseconds
    pub brake_hold_ms: u32,
    /// How long a requested turn is held without a lean, milliseconds
    ///
    /// Zero disables the timeout.
    pub turn_timeout_ms: u32,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            turn_threshold: 14.0,
            lock_margin: 2.0,
            hysteresis_band: 1.0,
            braking_threshold: -0.7,
            deep_braking_threshold: -8.0,
            brake_hold_ms: 3000,
            turn_timeout_ms: 10_000,
        }
    }
}

impl SignalSettings {
    /// Check that the thresholds are ordered so the machine cannot chatter
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("turn_threshold", self.turn_threshold),
            ("lock_margin", self.lock_margin),
            ("hysteresis_band", self.hysteresis_band),
            ("braking_threshold", self.braking_threshold),
            ("deep_braking_threshold", self.deep_braking_threshold),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }
        if self.hysteresis_band < 0.0 || self.turn_threshold <= self.hysteresis_band {
            return Err(ConfigError::TurnThresholdBelowBand {
                threshold: self.turn_threshold,
                band: self.hysteresis_band,
            });
        }
        if self.lock_margin < 0.0 {
            return Err(ConfigError::Negative("lock_margin"));
        }
        if self.braking_threshold >= 0.0 || self.deep_braking_threshold > self.braking_threshold {
            return Err(ConfigError::InvalidBrakingThresholds {
                braking: self.braking_threshold,
                deep: self.deep_braking_threshold,
            });
        }
        if self.brake_hold_ms == 0 {
            return Err(ConfigError::ZeroDuration("brake_hold_ms"));
        }
        Ok(())
    }
}

/// Hardware tick counter description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockSettings {
    /// Reference oscillator frequency in hertz
    pub frequency_hz: u32,
    /// Counter prescaler; one tick every `prescaler + 1` oscillator cycles
    pub prescaler: u16,
    /// Width of the free-running counter in bits
    pub counter_bits: u8,
}

impl Default for ClockSettings {
    /// 32.768 kHz low-frequency clock, no prescaling, 24-bit RTC counter
    fn default() -> Self {
        Self {
            frequency_hz: 32_768,
            prescaler: 0,
            counter_bits: 24,
        }
    }
}

impl ClockSettings {
    /// Reject a stopped clock or an impossible counter width
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency_hz == 0 {
            return Err(ConfigError::ZeroClockFrequency);
        }
        if self.counter_bits == 0 || self.counter_bits > 32 {
            return Err(ConfigError::InvalidCounterWidth(self.counter_bits));
        }
        Ok(())
    }
}

/// Everything [`crate::SignalEngine`] needs at start-up
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineSettings {
    /// Attitude filter gain
    pub attitude: AttitudeSettings,
    /// Wheel sensor geometry
    pub wheel: WheelSettings,
    /// State machine thresholds and timers
    pub signal: SignalSettings,
    /// Tick counter description
    pub clock: ClockSettings,
    /// Magnetometer axes expressed in the accelerometer frame
    pub magnetometer_axes: AxisMap,
    /// Local magnetic declination added to yaw, degrees
    pub declination: f32,
}

impl EngineSettings {
    /// Validate every nested group
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.attitude.validate()?;
        self.wheel.validate()?;
        self.signal.validate()?;
        self.clock.validate()?;
        if !self.magnetometer_axes.is_permutation() {
            return Err(ConfigError::InvalidAxisMap);
        }
        if !self.declination.is_finite() {
            return Err(ConfigError::NonFinite("declination"));
        }
        Ok(())
    }
}
