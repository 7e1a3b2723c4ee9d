//! Main-loop wiring of the decision core
//!
//! ```text
//! sensor ──> AttitudeFilter ──> extract ──> SlidingSmoother ──┐
//!                                                             ├──> TurnSignalFsm ──> DisplaySink
//! hall pulses ──> VelocityEstimator ──────────────────────────┘
//! ```

use log::{debug, warn};
use nalgebra::UnitQuaternion;

use crate::attitude::AttitudeFilter;
use crate::clock::TickClock;
use crate::display::DisplaySink;
use crate::error::ConfigError;
use crate::euler::extract;
use crate::fsm::{FsmInputs, TurnSignalFsm};
use crate::isr::SharedInputs;
use crate::smoother::{DEFAULT_WINDOW, SlidingSmoother};
use crate::types::{EngineSettings, EulerAngles, Override, RiderState, SensorSample, Telemetry};
use crate::velocity::VelocityEstimator;

/// Anything that can produce inertial samples on demand
///
/// A failed read is not fatal: the engine keeps the previous orientation and
/// tries again on the next data-ready event.
pub trait SensorSource {
    type Error: core::fmt::Debug;

    /// Read the most recent sample
    fn read_sample(&mut self) -> Result<SensorSample, Self::Error>;
}

/// Every component of the decision core, owned in one place
///
/// `N` is the smoothing window in samples.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use lean_signal::{EngineSettings, NullSink, Override, RiderState, SensorSample, SignalEngine};
///
/// let mut engine: SignalEngine<_, 4> =
///     SignalEngine::new(EngineSettings::default(), NullSink).unwrap();
///
/// // Leaning 30 degrees to the left, sampled every 10 ms
/// let lean = 30.0f32.to_radians();
/// for i in 0..400 {
///     engine.on_sample(SensorSample::new(
///         Vector3::new(0.0, lean.sin(), lean.cos()),
///         Vector3::zeros(),
///         Vector3::zeros(),
///         i * 328,
///     ));
/// }
///
/// assert_eq!(engine.evaluate(400 * 328, Override::NONE), RiderState::Left);
/// ```
pub struct SignalEngine<D, const N: usize = DEFAULT_WINDOW> {
    settings: EngineSettings,
    attitude: AttitudeFilter,
    roll: SlidingSmoother<N>,
    lateral: SlidingSmoother<N>,
    velocity: VelocityEstimator,
    fsm: TurnSignalFsm,
    clock: TickClock,
    last_sample_tick: Option<u32>,
    angles: EulerAngles,
    sink: D,
}

impl<D: DisplaySink, const N: usize> SignalEngine<D, N> {
    /// Validate `settings` and build every component
    pub fn new(settings: EngineSettings, sink: D) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            attitude: AttitudeFilter::with_settings(settings.attitude)?,
            roll: SlidingSmoother::new()?,
            lateral: SlidingSmoother::new()?,
            velocity: VelocityEstimator::new(settings.wheel, settings.clock)?,
            fsm: TurnSignalFsm::with_settings(settings.signal)?,
            clock: TickClock::new(settings.clock)?,
            last_sample_tick: None,
            angles: EulerAngles::default(),
            sink,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Fuse one sample and update the smoothed signals
    ///
    /// The very first sample only starts the sample clock. Samples with
    /// non-finite components are dropped.
    pub fn on_sample(&mut self, sample: SensorSample) -> EulerAngles {
        if !sample.is_finite() {
            warn!("dropping non-finite sample at tick {}", sample.timestamp);
            return self.angles;
        }

        let aligned = SensorSample {
            magnetometer: self.settings.magnetometer_axes.apply(sample.magnetometer),
            ..sample
        };

        let Some(previous) = self.last_sample_tick.replace(aligned.timestamp) else {
            return self.angles;
        };
        let dt_millis = self.clock.elapsed_millis(aligned.timestamp, previous);

        let quaternion = self.attitude.update(&aligned, dt_millis);
        let angles = extract(&quaternion, &aligned, self.settings.declination);
        self.roll.push(angles.roll);
        self.lateral.push(angles.linear_acceleration.y);

        self.angles = angles;
        angles
    }

    /// Read and fuse one sample; `false` if the read failed
    pub fn poll<S: SensorSource>(&mut self, source: &mut S) -> bool {
        match source.read_sample() {
            Ok(sample) => {
                self.on_sample(sample);
                true
            }
            Err(error) => {
                warn!("sensor read failed, keeping previous values: {:?}", error);
                false
            }
        }
    }

    /// One main-loop pass over what the interrupt handlers collected
    ///
    /// Returns whether a new sample was fused.
    pub fn service<S: SensorSource>(&mut self, shared: &SharedInputs, source: &mut S) -> bool {
        let pulses = shared.pulses.drain();
        // Lost timestamps are the oldest ones, so they come first
        if pulses.missed > 0 {
            debug!("{} wheel pulses arrived without a timestamp", pulses.missed);
            self.velocity.on_untimed_pulses(pulses.missed);
        }
        for tick in &pulses.ticks {
            self.velocity.on_pulse(*tick);
        }

        if shared.data_ready.take() {
            self.poll(source)
        } else {
            false
        }
    }

    /// Record one wheel pulse
    pub fn on_pulse(&mut self, now_ticks: u32) {
        self.velocity.on_pulse(now_ticks);
    }

    /// Close the speed window and push fresh telemetry to the sink
    pub fn on_window_tick(&mut self) -> f32 {
        let speed = self.velocity.on_window_tick();
        let telemetry = self.telemetry();
        self.sink.on_telemetry(&telemetry);
        speed
    }

    /// Run the state machine with the current smoothed signals
    pub fn evaluate(&mut self, now_ticks: u32, request: Override) -> RiderState {
        let now_ms = self.clock.advance(now_ticks);
        let inputs = FsmInputs {
            smoothed_roll: self.roll.mean(),
            speed_delta: self.velocity.speed_delta(),
            override_request: request,
            now_ms,
        };
        self.fsm.evaluate(inputs, &mut self.sink)
    }

    /// Dashboard numbers
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            distance_m: self.velocity.cumulative_distance(),
            speed: self.velocity.current_speed(),
            roll: self.roll.mean(),
            state: self.fsm.state(),
        }
    }

    pub fn state(&self) -> RiderState {
        self.fsm.state()
    }

    /// Angles from the latest fused sample
    pub fn angles(&self) -> EulerAngles {
        self.angles
    }

    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.attitude.quaternion()
    }

    pub fn smoothed_roll(&self) -> f32 {
        self.roll.mean()
    }

    /// Smoothed sideways acceleration with gravity removed, in g
    pub fn smoothed_lateral_acceleration(&self) -> f32 {
        self.lateral.mean()
    }

    pub fn velocity(&self) -> &VelocityEstimator {
        &self.velocity
    }

    pub fn fsm(&self) -> &TurnSignalFsm {
        &self.fsm
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }
}
