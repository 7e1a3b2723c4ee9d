//! Mathematical utilities and nalgebra extensions

use nalgebra::{UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Wrap an angle in degrees into `[0, 360)`
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Normalize the vector, returning `None` if its magnitude is zero
    fn try_unit(&self) -> Option<Vector3<f32>>;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;
}

impl Vector3Ext for Vector3<f32> {
    fn try_unit(&self) -> Option<Vector3<f32>> {
        let magnitude_squared = self.norm_squared();
        if magnitude_squared > 0.0 && magnitude_squared.is_finite() {
            Some(*self / magnitude_squared.sqrt())
        } else {
            None
        }
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Create quaternion from roll, pitch and yaw in degrees
    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        let euler_rad = Vector3::new(roll, pitch, yaw).deg_to_rad();
        UnitQuaternion::from_euler_angles(euler_rad.x, euler_rad.y, euler_rad.z)
    }
}
