use glam::{DMat3, DVec2, DVec3};
use kornia_vp::{
    build_rotation, LineSegment, MatrixLayout, OrthogonalTripletSelector, OrthogonalityParams,
    RotationMatrix, VanishingPointEstimator, VanishingPointParams,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::accumulator::SampleAccumulator;
use crate::align::{AlignmentMethod, ExtrinsicCalibration};
use crate::error::CalibrationError;
use crate::gravity::{self, AXIS_REASSIGNMENT};
use crate::io::CalibrationRecord;
use crate::kabsch::MIN_SAMPLES;
use crate::sample::{CameraObservation, DirectionSample};

/// Gravity direction in the IMU world frame.
const WORLD_GRAVITY: DVec3 = DVec3::NEG_Z;

/// Form of the IMU readings fed to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImuInputMode {
    /// Gravity vectors in the IMU frame, e.g. from the accelerometer at rest.
    #[default]
    Gravity,
    /// Device orientation as an axis-angle vector.
    AxisAngle,
    /// Device orientation as the vector part of a unit quaternion.
    QuaternionVector,
}

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    /// Focal length along x.
    pub fx: f64,
    /// Focal length along y.
    pub fy: f64,
    /// Principal point x.
    pub cx: f64,
    /// Principal point y.
    pub cy: f64,
}

/// Configuration of [`ImuCameraCalibrator`].
#[derive(Debug, Clone)]
pub struct CalibratorConfig {
    /// Vanishing point search.
    pub vanishing: VanishingPointParams,
    /// Orthogonal triplet selection.
    pub orthogonality: OrthogonalityParams,
    /// Form of the IMU readings.
    pub imu_input: ImuInputMode,
    /// Strategy used by [`ImuCameraCalibrator::calibrate_extrinsic_rotation`].
    pub alignment: AlignmentMethod,
    /// Initial camera to IMU reference for the gravity direction selection.
    pub axis_reassignment: DMat3,
    /// Image `(width, height)` in pixels.
    pub image_size: Option<(usize, usize)>,
    /// Known principal point in pixels; takes precedence over the image center.
    pub principal_point: Option<DVec2>,
    /// Seed of the random generator; `None` seeds from the thread generator.
    pub seed: Option<u64>,
}

impl Default for CalibratorConfig {
    fn default() -> Self {
        Self {
            vanishing: VanishingPointParams::default(),
            orthogonality: OrthogonalityParams::default(),
            imu_input: ImuInputMode::default(),
            alignment: AlignmentMethod::default(),
            axis_reassignment: AXIS_REASSIGNMENT,
            image_size: None,
            principal_point: None,
            seed: None,
        }
    }
}

impl CalibratorConfig {
    /// Principal point in pixels: the configured one, else the image center, else the origin.
    pub fn principal_point(&self) -> DVec2 {
        match (self.principal_point, self.image_size) {
            (Some(pp), _) => pp,
            (None, Some((width, height))) => DVec2::new(width as f64 / 2.0, height as f64 / 2.0),
            (None, None) => DVec2::ZERO,
        }
    }
}

/// Camera intrinsics and camera to IMU rotation from vanishing points and IMU readings.
///
/// Every image contributes a camera rotation (through its vanishing points) and is
/// paired with one IMU reading taken at the same time.
pub struct ImuCameraCalibrator<R: Rng = StdRng> {
    config: CalibratorConfig,
    rng: R,
    estimator: VanishingPointEstimator,
    selector: OrthogonalTripletSelector,
    samples: SampleAccumulator,
    focal_estimates: Vec<f64>,
    external_intrinsics: Option<PinholeIntrinsics>,
    calibration: Option<ExtrinsicCalibration>,
}

impl ImuCameraCalibrator<StdRng> {
    /// Create a calibrator seeded from `config.seed` or from the thread generator.
    pub fn new(config: CalibratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> ImuCameraCalibrator<R> {
    /// Create a calibrator drawing its random samples from `rng`.
    pub fn with_rng(config: CalibratorConfig, rng: R) -> Self {
        Self {
            estimator: VanishingPointEstimator::new(config.vanishing.clone()),
            selector: OrthogonalTripletSelector::new(config.orthogonality.clone()),
            config,
            rng,
            samples: SampleAccumulator::new(),
            focal_estimates: Vec::new(),
            external_intrinsics: None,
            calibration: None,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &CalibratorConfig {
        &self.config
    }

    /// The accumulated samples.
    pub fn samples(&self) -> &SampleAccumulator {
        &self.samples
    }

    /// Focal lengths estimated so far, one per accepted image.
    pub fn focal_estimates(&self) -> &[f64] {
        &self.focal_estimates
    }

    /// Estimate a camera rotation from the line segments of one image.
    ///
    /// Coordinates are relative to the principal point. Returns `Ok(false)` when no
    /// orthogonal triplet is found, in which case nothing is recorded.
    pub fn add_line_observations(&mut self, lines: &[LineSegment]) -> Result<bool, CalibrationError> {
        let found = self
            .estimator
            .find_vanishing_points(lines, self.config.vanishing.max_count, &mut self.rng);
        let candidates = found.iter().map(|e| e.vanishing_point).collect::<Vec<_>>();

        let triplet = self.selector.select(&candidates).or_else(|| {
            // lines not explained by any detected point may confirm a predicted third one
            let mut used = vec![false; lines.len()];
            for &i in found.iter().flat_map(|e| e.inliers.iter()) {
                used[i] = true;
            }
            let remaining = lines
                .iter()
                .zip(used)
                .filter_map(|(line, used)| (!used).then_some(*line))
                .collect::<Vec<_>>();
            self.selector.complete(&candidates, &remaining, &self.estimator)
        });

        let Some(triplet) = triplet else {
            log::debug!(
                "no orthogonal triplet among {} vanishing points from {} lines",
                candidates.len(),
                lines.len()
            );
            return Ok(false);
        };

        let rotation = build_rotation(&triplet);
        self.samples.push_camera(CameraObservation::Rotation(rotation))?;
        self.focal_estimates.push(triplet.focal_length());
        log::info!(
            "image {} accepted, focal length {:.2}",
            self.focal_estimates.len(),
            triplet.focal_length()
        );
        Ok(true)
    }

    /// Same as [`Self::add_line_observations`] for segments `[x1, y1, x2, y2]` in pixels.
    ///
    /// Segments with coinciding endpoints are skipped.
    pub fn add_pixel_lines(&mut self, segments: &[[f64; 4]]) -> Result<bool, CalibrationError> {
        let principal_point = self.config.principal_point();
        let lines = segments
            .iter()
            .filter_map(|&[x1, y1, x2, y2]| {
                LineSegment::from_pixels(x1, y1, x2, y2, principal_point).ok()
            })
            .collect::<Vec<_>>();
        self.add_line_observations(&lines)
    }

    /// Record a camera rotation obtained elsewhere, with the same column ambiguity as
    /// the ones built from vanishing points.
    pub fn add_camera_rotation(&mut self, rotation: RotationMatrix) -> Result<(), CalibrationError> {
        self.samples.push_camera(CameraObservation::Rotation(rotation))
    }

    /// Record a gravity direction measured directly in the camera frame.
    pub fn add_camera_direction(&mut self, direction: DVec3) -> Result<(), CalibrationError> {
        let sample = DirectionSample::camera(direction)?;
        self.samples.push_camera(CameraObservation::Direction(sample))
    }

    /// Record an IMU orientation given as an axis-angle vector.
    pub fn add_imu_rotation(&mut self, axis_angle: DVec3) -> Result<(), CalibrationError> {
        self.check_mode(ImuInputMode::AxisAngle)?;
        self.push_imu_orientation(RotationMatrix::from_axis_angle(axis_angle))
    }

    /// Record an IMU orientation given as the vector part of a unit quaternion.
    pub fn add_imu_quaternion_vector(&mut self, v: DVec3) -> Result<(), CalibrationError> {
        self.check_mode(ImuInputMode::QuaternionVector)?;
        self.push_imu_orientation(RotationMatrix::from_quaternion_vector(v))
    }

    /// Record a gravity vector measured in the IMU frame.
    pub fn add_imu_gravity(&mut self, gravity: DVec3) -> Result<(), CalibrationError> {
        self.check_mode(ImuInputMode::Gravity)?;
        self.samples.push_imu(DirectionSample::imu(gravity)?)
    }

    /// Drop an observation still waiting for its pair, e.g. after an image was rejected.
    pub fn discard_pending(&mut self) {
        self.samples.discard_pending();
    }

    /// Remove all samples, focal estimates and results.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.focal_estimates.clear();
        self.external_intrinsics = None;
        self.calibration = None;
    }

    fn check_mode(&self, actual: ImuInputMode) -> Result<(), CalibrationError> {
        if self.config.imu_input != actual {
            return Err(CalibrationError::ImuModeMismatch {
                expected: self.config.imu_input,
                actual,
            });
        }
        Ok(())
    }

    fn push_imu_orientation(&mut self, orientation: RotationMatrix) -> Result<(), CalibrationError> {
        let gravity = orientation.transpose() * WORLD_GRAVITY;
        self.samples.push_imu(DirectionSample::imu(gravity)?)
    }

    /// Use intrinsics from an external calibration instead of the vanishing point estimate.
    pub fn set_external_intrinsics(&mut self, intrinsics: PinholeIntrinsics) {
        self.external_intrinsics = Some(intrinsics);
    }

    /// Camera intrinsics: the external ones if set, else the mean focal estimate.
    pub fn calibrate_intrinsics(&self) -> Result<PinholeIntrinsics, CalibrationError> {
        if let Some(intrinsics) = self.external_intrinsics {
            return Ok(intrinsics);
        }
        if self.focal_estimates.is_empty() {
            return Err(CalibrationError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let focal = self.focal_estimates.iter().sum::<f64>() / self.focal_estimates.len() as f64;
        let pp = self.config.principal_point();
        Ok(PinholeIntrinsics {
            fx: focal,
            fy: focal,
            cx: pp.x,
            cy: pp.y,
        })
    }

    /// Camera to IMU rotation with the configured alignment method.
    pub fn calibrate_extrinsic_rotation(&mut self) -> Result<ExtrinsicCalibration, CalibrationError> {
        let method = self.config.alignment.clone();
        self.calibrate_extrinsic_rotation_with(&method)
    }

    /// Camera to IMU rotation with an explicit alignment method.
    ///
    /// On failure any previously stored rotation is discarded.
    pub fn calibrate_extrinsic_rotation_with(
        &mut self,
        method: &AlignmentMethod,
    ) -> Result<ExtrinsicCalibration, CalibrationError> {
        self.calibration = None;

        let pairs = self.samples.len();
        if pairs < MIN_SAMPLES {
            return Err(CalibrationError::InsufficientData {
                required: MIN_SAMPLES,
                actual: pairs,
            });
        }

        let strategy = method.clone().into_strategy();
        let calibration = gravity::align_with_selection(
            self.samples.camera_observations(),
            self.samples.imu_samples(),
            &self.config.axis_reassignment,
            strategy.as_ref(),
            &mut self.rng,
        )?;

        if calibration.well_posed {
            log::info!("camera to imu rotation from {pairs} pairs");
        } else {
            log::warn!(
                "camera to imu rotation is ill-posed, singular values {:?}",
                calibration.singular_values
            );
        }

        self.calibration = Some(calibration.clone());
        Ok(calibration)
    }

    /// Latest calibration result.
    pub fn calibration(&self) -> Option<&ExtrinsicCalibration> {
        self.calibration.as_ref()
    }

    /// Latest camera to IMU rotation flattened in `layout`.
    pub fn rotation_matrix(&self, layout: MatrixLayout) -> Option<[f64; 9]> {
        self.calibration
            .as_ref()
            .map(|c| c.rotation.to_array(layout))
    }

    /// Snapshot of the current results for persistence.
    pub fn record(&self) -> Option<CalibrationRecord> {
        let calibration = self.calibration.as_ref()?;
        Some(CalibrationRecord::new(
            self.calibrate_intrinsics().ok(),
            calibration,
            self.samples.len(),
        ))
    }
}
