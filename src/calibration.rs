//! Sensor calibration for the fusion input
//!
//! The magnetometer needs hard-iron (offset) and soft-iron (per-axis scale)
//! correction before it is useful for heading; the gyroscope needs its
//! resting bias removed. Both are estimated once, on the bench or at boot,
//! and then applied to every sample.

use nalgebra::Vector3;

/// AK8963 resolution in 16-bit output mode, milligauss per count
pub const AK8963_MILLIGAUSS_PER_COUNT: f32 = 10.0 * 4912.0 / 32760.0;

/// Per-axis sensitivity from the AK8963 fuse ROM adjustment bytes
///
/// # Example
/// ```
/// use lean_signal::calibration::factory_sensitivity;
///
/// let sensitivity = factory_sensitivity([128, 128, 128]);
/// assert_eq!(sensitivity.x, 1.0);
/// ```
pub fn factory_sensitivity(adjustment: [u8; 3]) -> Vector3<f32> {
    Vector3::from_iterator(
        adjustment
            .iter()
            .map(|asa| (f32::from(*asa) - 128.0) / 256.0 + 1.0),
    )
}

/// Hard and soft iron correction for one magnetometer
///
/// Trusted as correct once loaded; the fusion filter has no way to detect a
/// bad calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagCalibration {
    /// Hard-iron offset, subtracted first
    pub bias: Vector3<f32>,
    /// Soft-iron scale, applied after the offset
    pub scale: Vector3<f32>,
}

impl Default for MagCalibration {
    fn default() -> Self {
        Self {
            bias: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl MagCalibration {
    /// Correct a field reading: `(field - bias) * scale` per axis
    pub fn apply(&self, field: Vector3<f32>) -> Vector3<f32> {
        (field - self.bias).component_mul(&self.scale)
    }

    /// Correct raw AK8963 counts, converting them to milligauss first
    pub fn apply_counts(&self, counts: [i16; 3], sensitivity: &Vector3<f32>) -> Vector3<f32> {
        let field = Vector3::from_iterator(counts.iter().map(|c| f32::from(*c)))
            .component_mul(sensitivity)
            * AK8963_MILLIGAUSS_PER_COUNT;
        self.apply(field)
    }
}

/// Min/max tracker that derives a [`MagCalibration`]
///
/// Feed it readings while the sensor is waved through every orientation
/// (a figure eight for about 15 seconds is enough).
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use lean_signal::calibration::MagCalibrator;
///
/// let mut calibrator = MagCalibrator::new();
/// calibrator.add(Vector3::new(150.0, 40.0, -10.0));
/// calibrator.add(Vector3::new(-50.0, -40.0, 90.0));
///
/// let calibration = calibrator.finish().unwrap();
/// assert_eq!(calibration.bias, Vector3::new(50.0, 0.0, 40.0));
/// ```
#[derive(Debug, Clone)]
pub struct MagCalibrator {
    min: Vector3<f32>,
    max: Vector3<f32>,
    samples: u32,
}

impl MagCalibrator {
    pub fn new() -> Self {
        Self {
            min: Vector3::repeat(f32::MAX),
            max: Vector3::repeat(f32::MIN),
            samples: 0,
        }
    }

    /// Widen the observed envelope; non-finite readings are ignored
    pub fn add(&mut self, field: Vector3<f32>) {
        if !field.iter().all(|v| v.is_finite()) {
            return;
        }
        self.min = self.min.inf(&field);
        self.max = self.max.sup(&field);
        self.samples += 1;
    }

    /// Readings accepted so far
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Offset from the envelope centre, scale equalizing the three half chords
    ///
    /// `None` until every axis has seen a non-zero spread.
    pub fn finish(&self) -> Option<MagCalibration> {
        if self.samples == 0 {
            return None;
        }
        let half_chord = (self.max - self.min) * 0.5;
        if half_chord.iter().any(|c| *c <= 0.0) {
            return None;
        }
        let average = half_chord.sum() / 3.0;

        Some(MagCalibration {
            bias: (self.max + self.min) * 0.5,
            scale: half_chord.map(|c| average / c),
        })
    }
}

impl Default for MagCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resting gyroscope bias averaged over a still period at boot
#[derive(Debug, Clone, Default)]
pub struct GyroBiasEstimator {
    sum: Vector3<f64>,
    samples: u32,
}

impl GyroBiasEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one reading taken while the board is not moving
    pub fn add(&mut self, gyroscope: Vector3<f32>) {
        if gyroscope.iter().all(|v| v.is_finite()) {
            self.sum += gyroscope.cast::<f64>();
            self.samples += 1;
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Mean of the readings, `None` before the first one
    pub fn bias(&self) -> Option<Vector3<f32>> {
        (self.samples > 0).then(|| (self.sum / f64::from(self.samples)).cast::<f32>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_sensitivity_from_fuse_rom() {
        let sensitivity = factory_sensitivity([183, 184, 173]);
        assert!((sensitivity.x - 1.214_844).abs() < 1e-5);
        assert!((sensitivity.y - 1.218_75).abs() < 1e-5);
        assert!((sensitivity.z - 1.175_781).abs() < 1e-5);
    }

    #[test]
    fn test_default_calibration_is_identity() {
        let field = Vector3::new(12.0, -3.0, 40.0);
        assert_eq!(MagCalibration::default().apply(field), field);
    }

    #[test]
    fn test_apply_offset_then_scale() {
        let calibration = MagCalibration {
            bias: Vector3::new(10.0, 20.0, 30.0),
            scale: Vector3::new(2.0, 1.0, 0.5),
        };
        let corrected = calibration.apply(Vector3::new(20.0, 20.0, 50.0));
        assert_eq!(corrected, Vector3::new(20.0, 0.0, 10.0));
    }

    #[test]
    fn test_apply_counts_uses_resolution_and_sensitivity() {
        let calibration = MagCalibration::default();
        let corrected = calibration.apply_counts([100, 0, -100], &Vector3::new(1.0, 1.0, 2.0));

        assert!((corrected.x - 100.0 * AK8963_MILLIGAUSS_PER_COUNT).abs() < 1e-3);
        assert_eq!(corrected.y, 0.0);
        assert!((corrected.z + 200.0 * AK8963_MILLIGAUSS_PER_COUNT).abs() < 1e-3);
    }

    #[test]
    fn test_calibrator_equalizes_ellipsoid() {
        let mut calibrator = MagCalibrator::new();
        // Ellipsoid centred on (5, -5, 0) with half chords 20, 10, 30
        for field in [
            Vector3::new(25.0, -5.0, 0.0),
            Vector3::new(-15.0, -5.0, 0.0),
            Vector3::new(5.0, 5.0, 0.0),
            Vector3::new(5.0, -15.0, 0.0),
            Vector3::new(5.0, -5.0, 30.0),
            Vector3::new(5.0, -5.0, -30.0),
        ] {
            calibrator.add(field);
        }

        let calibration = calibrator.finish().unwrap();
        assert_eq!(calibration.bias, Vector3::new(5.0, -5.0, 0.0));
        assert!((calibration.scale.x - 1.0).abs() < 1e-6);
        assert!((calibration.scale.y - 2.0).abs() < 1e-6);
        assert!((calibration.scale.z - 2.0 / 3.0).abs() < 1e-6);

        // Every extreme lands on the same radius afterwards
        let corrected = calibration.apply(Vector3::new(5.0, 5.0, 0.0));
        assert!((corrected.norm() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_calibrator_needs_spread_on_every_axis() {
        let mut calibrator = MagCalibrator::new();
        assert!(calibrator.finish().is_none());

        calibrator.add(Vector3::new(1.0, 1.0, 1.0));
        calibrator.add(Vector3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(calibrator.samples(), 1);
        assert!(calibrator.finish().is_none());
    }

    #[test]
    fn test_gyro_bias_average() {
        let mut estimator = GyroBiasEstimator::new();
        assert!(estimator.bias().is_none());

        estimator.add(Vector3::new(0.5, -1.0, 0.2));
        estimator.add(Vector3::new(1.5, -1.0, 0.4));

        let bias = estimator.bias().unwrap();
        assert!((bias - Vector3::new(1.0, -1.0, 0.3)).norm() < 1e-6);
        assert_eq!(estimator.samples(), 2);
    }
}
