//! Gradient-descent attitude filter
//!
//! One Madgwick MARG step per sensor sample. The accelerometer supplies the
//! gravity reference and the magnetometer the earth-field reference; the
//! normalized gradient of both alignment errors, scaled by `beta`, is taken
//! out of the gyroscope quaternion rate before integration.

use log::{trace, warn};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::error::ConfigError;
use crate::math::Vector3Ext;
use crate::types::{AttitudeSettings, SensorSample};

/// Orientation estimator
///
/// Owns the single orientation quaternion of the system. It starts at the
/// identity and is only ever changed by [`AttitudeFilter::update`],
/// [`AttitudeFilter::set_quaternion`] or [`AttitudeFilter::reset`].
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use lean_signal::{AttitudeFilter, SensorSample};
///
/// let mut filter = AttitudeFilter::new();
/// let sample = SensorSample::new(
///     Vector3::new(0.0, 0.0, 1.0),  // g
///     Vector3::new(0.0, 0.0, 0.0),  // deg/s
///     Vector3::new(1.0, 0.0, 0.0),  // calibrated field
///     0,
/// );
///
/// let q = filter.update(&sample, 5.0); // 5 ms since the previous sample
/// assert!((q.norm() - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct AttitudeFilter {
    settings: AttitudeSettings,
    quaternion: UnitQuaternion<f32>,
}

impl AttitudeFilter {
    /// Create a filter with the default gain
    pub fn new() -> Self {
        Self {
            settings: AttitudeSettings::default(),
            quaternion: UnitQuaternion::identity(),
        }
    }

    /// Create a filter with specified settings
    pub fn with_settings(settings: AttitudeSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            quaternion: UnitQuaternion::identity(),
        })
    }

    /// Return to the identity orientation
    pub fn reset(&mut self) {
        self.quaternion = UnitQuaternion::identity();
    }

    /// Get current filter settings
    pub fn settings(&self) -> AttitudeSettings {
        self.settings
    }

    /// Get current orientation quaternion
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    /// Set orientation quaternion directly
    pub fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>) {
        self.quaternion = quaternion;
    }

    /// Gravity direction in the sensor frame for the current orientation
    pub fn gravity(&self) -> Vector3<f32> {
        gravity_in_sensor_frame(&self.quaternion)
    }

    /// Fuse one sample
    ///
    /// `dt_millis` is the time since the previous sample. Samples with
    /// non-finite components and non-positive or non-finite intervals leave
    /// the orientation untouched.
    pub fn update(&mut self, sample: &SensorSample, dt_millis: f32) -> UnitQuaternion<f32> {
        if !sample.is_finite() {
            warn!("non-finite sensor sample at tick {}, orientation kept", sample.timestamp);
            return self.quaternion;
        }
        if !dt_millis.is_finite() || dt_millis <= 0.0 {
            trace!("skipping fusion step with dt {} ms", dt_millis);
            return self.quaternion;
        }

        let q = *self.quaternion.as_ref();
        let half_gyroscope = sample.gyroscope.deg_to_rad() * 0.5;

        // Quaternion derivative from the gyroscope: 0.5 * q * w
        let mut rate = q * Quaternion::from_parts(0.0, half_gyroscope);

        let mut gradient = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        if let Some(accelerometer) = sample.accelerometer.try_unit() {
            gradient += gravity_gradient(&q, &accelerometer);
        }
        if let Some(magnetometer) = sample.magnetometer.try_unit() {
            gradient += magnetic_gradient(&q, &magnetometer);
        }

        let gradient_norm = gradient.norm();
        if gradient_norm > 0.0 && gradient_norm.is_finite() {
            rate -= gradient * (self.settings.beta / gradient_norm);
        }

        let integrated = q + rate * (dt_millis * 0.001);

        // Renormalize every step to keep numerical drift off the unit sphere
        if let Some(unit) = UnitQuaternion::try_new(integrated, f32::EPSILON) {
            self.quaternion = unit;
        }
        self.quaternion
    }
}

impl Default for AttitudeFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Third row of the rotation matrix: where gravity points in the sensor frame
pub(crate) fn gravity_in_sensor_frame(quaternion: &UnitQuaternion<f32>) -> Vector3<f32> {
    let q = quaternion.as_ref();
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    Vector3::new(
        2.0 * (q1 * q3 - q0 * q2),
        2.0 * (q0 * q1 + q2 * q3),
        q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3,
    )
}

/// Gradient of the gravity alignment error `q* g q - a`
fn gravity_gradient(q: &Quaternion<f32>, a: &Vector3<f32>) -> Quaternion<f32> {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    let f1 = 2.0 * (q1 * q3 - q0 * q2) - a.x;
    let f2 = 2.0 * (q0 * q1 + q2 * q3) - a.y;
    let f3 = 1.0 - 2.0 * (q1 * q1 + q2 * q2) - a.z;

    Quaternion::new(
        -2.0 * q2 * f1 + 2.0 * q1 * f2,
        2.0 * q3 * f1 + 2.0 * q0 * f2 - 4.0 * q1 * f3,
        -2.0 * q0 * f1 + 2.0 * q3 * f2 - 4.0 * q2 * f3,
        2.0 * q1 * f1 + 2.0 * q2 * f2,
    )
}

/// Gradient of the magnetic alignment error `q* b q - m`
///
/// The earth-field reference `b = (bx, 0, bz)` is re-estimated every step by
/// rotating the measurement into the earth frame and collapsing its
/// horizontal part onto the x axis, which keeps magnetic inclination out of
/// roll and pitch.
fn magnetic_gradient(q: &Quaternion<f32>, m: &Vector3<f32>) -> Quaternion<f32> {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    let q0q0 = q0 * q0;
    let q0q1 = q0 * q1;
    let q0q2 = q0 * q2;
    let q0q3 = q0 * q3;
    let q1q1 = q1 * q1;
    let q1q2 = q1 * q2;
    let q1q3 = q1 * q3;
    let q2q2 = q2 * q2;
    let q2q3 = q2 * q3;
    let q3q3 = q3 * q3;

    // Measured field in the earth frame
    let hx = m.x * (q0q0 + q1q1 - q2q2 - q3q3)
        + 2.0 * m.y * (q1q2 - q0q3)
        + 2.0 * m.z * (q0q2 + q1q3);
    let hy = 2.0 * m.x * (q0q3 + q1q2)
        + m.y * (q0q0 - q1q1 + q2q2 - q3q3)
        + 2.0 * m.z * (q2q3 - q0q1);
    let hz = 2.0 * m.x * (q1q3 - q0q2)
        + 2.0 * m.y * (q0q1 + q2q3)
        + m.z * (q0q0 - q1q1 - q2q2 + q3q3);

    let two_bx = 2.0 * (hx * hx + hy * hy).sqrt();
    let two_bz = 2.0 * hz;
    let four_bx = 2.0 * two_bx;
    let four_bz = 2.0 * two_bz;

    let f1 = two_bx * (0.5 - q2q2 - q3q3) + two_bz * (q1q3 - q0q2) - m.x;
    let f2 = two_bx * (q1q2 - q0q3) + two_bz * (q0q1 + q2q3) - m.y;
    let f3 = two_bx * (q0q2 + q1q3) + two_bz * (0.5 - q1q1 - q2q2) - m.z;

    Quaternion::new(
        -two_bz * q2 * f1 + (-two_bx * q3 + two_bz * q1) * f2 + two_bx * q2 * f3,
        two_bz * q3 * f1 + (two_bx * q2 + two_bz * q0) * f2 + (two_bx * q3 - four_bz * q1) * f3,
        (-four_bx * q2 - two_bz * q0) * f1
            + (two_bx * q1 + two_bz * q3) * f2
            + (two_bx * q0 - four_bz * q2) * f3,
        (-four_bx * q3 + two_bz * q1) * f1 + (-two_bx * q0 + two_bz * q2) * f2 + two_bx * q1 * f3,
    )
}
