#![no_std]

//! Lean Signal - turn signal and brake light decisions for a bicycle-mounted IMU
//!
//! The board under the saddle carries a 9-axis inertial sensor, a hall-effect
//! wheel sensor and an LED strip. This crate turns their raw readings into
//! one of four rider states: IDLE, LEFT, RIGHT or BRAKE.
//!
//! # Features
//!
//! - Madgwick gradient-descent fusion of accelerometer, gyroscope and magnetometer
//! - Roll, pitch, heading and gravity-free acceleration
//! - Wheel speed, odometer and deceleration trend from hall-sensor pulses
//! - Debounced decision state machine with turn locking, brake hold and request timeouts
//! - Voice and handlebar button requests
//! - Interrupt-safe pulse and data-ready plumbing built on `critical-section`
//! - `#![no_std]`, no allocation after start-up
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use lean_signal::{EngineSettings, Override, RiderState, SensorSample, SignalEngine};
//!
//! let mut engine: SignalEngine<_, 300> =
//!     SignalEngine::new(EngineSettings::default(), |state: RiderState| {
//!         // drive the LED strip here
//!         let _ = state;
//!     })
//!     .unwrap();
//!
//! // Every data-ready interrupt
//! let sample = SensorSample::new(
//!     Vector3::new(0.0, 0.0, 1.0), // g
//!     Vector3::new(0.1, 0.2, 0.3), // deg/s
//!     Vector3::new(1.0, 0.0, 0.0), // calibrated field
//!     1234,                        // RTC ticks
//! );
//! engine.on_sample(sample);
//!
//! // Every hall-sensor edge
//! engine.on_pulse(1300);
//!
//! // Every 250 ms
//! engine.on_window_tick();
//! let state = engine.evaluate(8192, Override::NONE);
//!
//! assert_eq!(state, RiderState::Idle);
//! ```

mod attitude;
pub mod axes;
pub mod calibration;
mod clock;
pub mod command;
mod display;
mod engine;
mod error;
mod euler;
mod fsm;
pub mod isr;
mod math;
mod smoother;
mod types;
mod velocity;

// Re-export all public types and functions
pub use attitude::AttitudeFilter;
pub use axes::{AxisMap, SignedAxis};
pub use clock::TickClock;
pub use display::{DisplaySink, FRAME_PERIOD_MS, LedPattern, NullSink, Rgb, indicator_text};
pub use engine::{SensorSource, SignalEngine};
pub use error::ConfigError;
pub use euler::extract;
pub use fsm::{FsmInputs, TurnSignalFsm};
pub use math::{DEG_TO_RAD, QuaternionExt, RAD_TO_DEG, Vector3Ext, wrap_degrees};
pub use smoother::{DEFAULT_WINDOW, SlidingSmoother};
pub use types::*;
pub use velocity::{HISTORY_LEN, VelocityEstimator, WINDOW_CAPACITY};
