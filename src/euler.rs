//! Euler angle and linear acceleration extraction

use nalgebra::UnitQuaternion;

use crate::attitude::gravity_in_sensor_frame;
use crate::math::{RAD_TO_DEG, wrap_degrees};
use crate::types::{EulerAngles, SensorSample};

/// Derive roll, pitch, yaw and gravity-free acceleration
///
/// Pure function of its inputs; safe to call at any rate. `declination` (in
/// degrees) is added to the magnetic heading before wrapping it into
/// `[0, 360)`.
///
/// # Example
/// ```
/// use nalgebra::{UnitQuaternion, Vector3};
/// use lean_signal::{SensorSample, extract};
///
/// let level = Vector3::new(0.0, 0.0, 1.0);
/// let sample = SensorSample::new(level, Vector3::zeros(), Vector3::zeros(), 0);
/// let angles = extract(&UnitQuaternion::identity(), &sample, 0.0);
///
/// assert_eq!(angles.roll, 0.0);
/// assert!(angles.linear_acceleration.norm() < 1e-6);
/// ```
pub fn extract(
    quaternion: &UnitQuaternion<f32>,
    sample: &SensorSample,
    declination: f32,
) -> EulerAngles {
    let q = quaternion.as_ref();
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);

    let a12 = 2.0 * (q1 * q2 + q0 * q3);
    let a22 = q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3;
    let a31 = 2.0 * (q0 * q1 + q2 * q3);
    let a32 = 2.0 * (q1 * q3 - q0 * q2);
    let a33 = q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3;

    // Rounding can push |a32| a hair past one near +/-90 deg pitch
    let pitch = -a32.clamp(-1.0, 1.0).asin();
    let roll = a31.atan2(a33);
    let yaw = a12.atan2(a22);

    EulerAngles {
        roll: roll * RAD_TO_DEG,
        pitch: pitch * RAD_TO_DEG,
        yaw: wrap_degrees(yaw * RAD_TO_DEG + declination),
        linear_acceleration: sample.accelerometer - gravity_in_sensor_frame(quaternion),
    }
}
