//! Sensor axes alignment
//!
//! The accelerometer/gyroscope die and the magnetometer die of a 9-axis part
//! rarely share axes. On the MPU-9250 the AK8963 magnetometer has X and Y
//! swapped and Z inverted relative to the accelerometer, so the fusion step
//! must see `(my, mx, -mz)` rather than the raw triple.
//!
//! # Example
//! ```
//! use nalgebra::Vector3;
//! use lean_signal::AxisMap;
//!
//! let raw = Vector3::new(1.0, 2.0, 3.0);
//! let aligned = AxisMap::MPU9250_MAGNETOMETER.apply(raw);
//!
//! assert_eq!(aligned, Vector3::new(2.0, 1.0, -3.0));
//! ```

use nalgebra::Vector3;

/// One sensor axis with a sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignedAxis {
    /// +X
    PosX,
    /// -X
    NegX,
    /// +Y
    PosY,
    /// -Y
    NegY,
    /// +Z
    PosZ,
    /// -Z
    NegZ,
}

impl SignedAxis {
    #[inline]
    fn pick(self, v: &Vector3<f32>) -> f32 {
        match self {
            SignedAxis::PosX => v.x,
            SignedAxis::NegX => -v.x,
            SignedAxis::PosY => v.y,
            SignedAxis::NegY => -v.y,
            SignedAxis::PosZ => v.z,
            SignedAxis::NegZ => -v.z,
        }
    }

    fn index(self) -> usize {
        match self {
            SignedAxis::PosX | SignedAxis::NegX => 0,
            SignedAxis::PosY | SignedAxis::NegY => 1,
            SignedAxis::PosZ | SignedAxis::NegZ => 2,
        }
    }
}

/// Where each body axis is read from in sensor coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisMap {
    /// Source of body X
    pub x: SignedAxis,
    /// Source of body Y
    pub y: SignedAxis,
    /// Source of body Z
    pub z: SignedAxis,
}

impl Default for AxisMap {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AxisMap {
    /// No remapping
    pub const IDENTITY: AxisMap = AxisMap {
        x: SignedAxis::PosX,
        y: SignedAxis::PosY,
        z: SignedAxis::PosZ,
    };

    /// AK8963 magnetometer inside an MPU-9250, expressed in the accelerometer frame
    pub const MPU9250_MAGNETOMETER: AxisMap = AxisMap {
        x: SignedAxis::PosY,
        y: SignedAxis::PosX,
        z: SignedAxis::NegZ,
    };

    /// Whether every sensor axis is used exactly once
    pub fn is_permutation(&self) -> bool {
        let mut seen = [false; 3];
        for axis in [self.x, self.y, self.z] {
            seen[axis.index()] = true;
        }
        seen.iter().all(|used| *used)
    }

    /// Remap a sensor reading into body axes
    #[inline]
    pub fn apply(&self, sensor: Vector3<f32>) -> Vector3<f32> {
        Vector3::new(
            self.x.pick(&sensor),
            self.y.pick(&sensor),
            self.z.pick(&sensor),
        )
    }
}
