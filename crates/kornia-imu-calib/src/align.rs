//! Rotation alignment strategies between paired camera and IMU directions.

use glam::DVec3;
use kornia_vp::RotationMatrix;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::kabsch::{kabsch, KabschSolution, MIN_SAMPLES};

/// Camera to IMU rotation estimated from paired directions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrinsicCalibration {
    /// Rotation mapping camera-frame directions into the IMU frame.
    pub rotation: RotationMatrix,
    /// Whether the samples constrain all three rotational degrees of freedom.
    pub well_posed: bool,
    /// Indices of the pairs agreeing with the rotation, for robust strategies.
    pub inliers: Option<Vec<usize>>,
    /// Singular values of the final cross-covariance, in descending order.
    pub singular_values: DVec3,
}

/// A way of fitting the camera to IMU rotation.
pub trait AlignmentStrategy {
    /// Fit the rotation mapping `camera[i]` onto `imu[i]`.
    fn align(
        &self,
        camera: &[DVec3],
        imu: &[DVec3],
        rng: &mut dyn RngCore,
    ) -> Result<ExtrinsicCalibration, CalibrationError>;
}

/// Kabsch over all pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastSquaresAlignment;

impl AlignmentStrategy for LeastSquaresAlignment {
    fn align(
        &self,
        camera: &[DVec3],
        imu: &[DVec3],
        _rng: &mut dyn RngCore,
    ) -> Result<ExtrinsicCalibration, CalibrationError> {
        let KabschSolution {
            rotation,
            singular_values,
            well_posed,
        } = kabsch(camera, imu)?;
        Ok(ExtrinsicCalibration {
            rotation,
            well_posed,
            inliers: None,
            singular_values,
        })
    }
}

/// Parameters for RANSAC over the three-point Kabsch fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RansacParams {
    /// Number of sampled triples.
    pub max_iterations: usize,
    /// Maximum `‖R·camera − imu‖` for a pair to count as an inlier.
    pub inlier_threshold: f64,
    /// Whether to refit on all inliers.
    pub refine: bool,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            inlier_threshold: 0.05,
            refine: true,
        }
    }
}

/// Kabsch on random triples, keeping the rotation with the most inliers.
#[derive(Debug, Clone, Default)]
pub struct RansacAlignment {
    params: RansacParams,
}

impl RansacAlignment {
    /// Create the strategy from its parameters.
    pub fn new(params: RansacParams) -> Self {
        Self { params }
    }

    /// Parameters of the strategy.
    pub fn params(&self) -> &RansacParams {
        &self.params
    }

    fn classify_inliers(&self, rotation: &RotationMatrix, camera: &[DVec3], imu: &[DVec3]) -> Vec<usize> {
        camera
            .iter()
            .zip(imu.iter())
            .enumerate()
            .filter(|(_, (&c, &g))| (*rotation * c - g).length() < self.params.inlier_threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl AlignmentStrategy for RansacAlignment {
    fn align(
        &self,
        camera: &[DVec3],
        imu: &[DVec3],
        rng: &mut dyn RngCore,
    ) -> Result<ExtrinsicCalibration, CalibrationError> {
        let n = camera.len();
        if n != imu.len() {
            return Err(CalibrationError::MismatchedLengths { camera: n, imu: imu.len() });
        }
        if n < MIN_SAMPLES {
            return Err(CalibrationError::InsufficientData {
                required: MIN_SAMPLES,
                actual: n,
            });
        }

        let mut best: Option<(KabschSolution, Vec<usize>)> = None;
        // best of the degenerate samples, used when no well-posed one reaches the minimum
        let mut best_degenerate: Option<(KabschSolution, Vec<usize>)> = None;
        let mut skipped = 0usize;

        for _ in 0..self.params.max_iterations {
            let sample = rand::seq::index::sample(rng, n, MIN_SAMPLES);
            let cam_min = sample.iter().map(|i| camera[i]).collect::<Vec<_>>();
            let imu_min = sample.iter().map(|i| imu[i]).collect::<Vec<_>>();

            let solution = kabsch(&cam_min, &imu_min)?;
            let inliers = self.classify_inliers(&solution.rotation, camera, imu);
            let slot = if solution.well_posed {
                &mut best
            } else {
                skipped += 1;
                &mut best_degenerate
            };
            if slot.as_ref().map_or(true, |(_, b)| inliers.len() > b.len()) {
                *slot = Some((solution, inliers));
            }
        }

        let best_count = best.as_ref().map_or(0, |(_, inliers)| inliers.len());
        log::debug!(
            "rotation ransac: {best_count}/{n} inliers, {skipped} degenerate samples"
        );

        let (solution, inliers) = match (best, best_degenerate) {
            (Some(best), _) if best.1.len() >= MIN_SAMPLES => best,
            (_, Some(degenerate)) if degenerate.1.len() >= MIN_SAMPLES => {
                log::debug!(
                    "rotation ransac: only degenerate samples explain {} pairs",
                    degenerate.1.len()
                );
                degenerate
            }
            (_, degenerate) => {
                let degenerate_count = degenerate.map_or(0, |(_, inliers)| inliers.len());
                return Err(CalibrationError::RansacExhausted {
                    inliers: best_count.max(degenerate_count),
                    required: MIN_SAMPLES,
                });
            }
        };

        if !self.params.refine {
            return Ok(ExtrinsicCalibration {
                rotation: solution.rotation,
                well_posed: solution.well_posed,
                inliers: Some(inliers),
                singular_values: solution.singular_values,
            });
        }

        let cam_in = inliers.iter().map(|&i| camera[i]).collect::<Vec<_>>();
        let imu_in = inliers.iter().map(|&i| imu[i]).collect::<Vec<_>>();
        let refit = kabsch(&cam_in, &imu_in)?;

        Ok(ExtrinsicCalibration {
            rotation: refit.rotation,
            well_posed: solution.well_posed && refit.well_posed,
            inliers: Some(inliers),
            singular_values: refit.singular_values,
        })
    }
}

/// Tagged choice of alignment strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlignmentMethod {
    /// [`LeastSquaresAlignment`].
    LeastSquares,
    /// [`RansacAlignment`] with its parameters.
    Ransac(RansacParams),
}

impl Default for AlignmentMethod {
    fn default() -> Self {
        Self::Ransac(RansacParams::default())
    }
}

impl AlignmentMethod {
    /// Resolve the method into a strategy object.
    pub fn into_strategy(self) -> Box<dyn AlignmentStrategy> {
        match self {
            Self::LeastSquares => Box::new(LeastSquaresAlignment),
            Self::Ransac(params) => Box::new(RansacAlignment::new(params)),
        }
    }
}
