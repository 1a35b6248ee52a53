//! Gravity direction selection for camera rotations from vanishing points.
//!
//! A rotation built from vanishing points only tells which three orthogonal scene
//! directions the camera sees, not which of them is vertical nor their signs. For each
//! sample the gravity direction is therefore picked among the six signed columns of the
//! rotation, as the one that best agrees with the IMU gravity under a reference
//! camera to IMU rotation.

use glam::{DMat3, DVec3};
use kornia_vp::RotationMatrix;
use rand::RngCore;

use crate::align::{AlignmentStrategy, ExtrinsicCalibration};
use crate::error::CalibrationError;
use crate::sample::{CameraObservation, DirectionSample};

/// Axis reassignment from the camera frame (x right, y down, z forward) to the device
/// frame with gravity along `−z` when the device lies flat.
pub const AXIS_REASSIGNMENT: DMat3 = DMat3::from_cols(DVec3::X, DVec3::NEG_Y, DVec3::NEG_Z);

/// Maximum number of select-then-align rounds.
pub const MAX_ROUNDS: usize = 5;

/// The six signed columns `±R e_k` of a rotation.
pub fn candidate_directions(rotation: &RotationMatrix) -> [DVec3; 6] {
    let [c0, c1, c2] = [0, 1, 2].map(|k| rotation.column(k));
    [c0, -c0, c1, -c1, c2, -c2]
}

/// Candidate `c` minimising `‖reference · c − imu‖`.
pub fn select_direction(candidates: &[DVec3; 6], reference: &DMat3, imu: DVec3) -> DVec3 {
    let mut best = candidates[0];
    let mut best_err = f64::INFINITY;
    for &c in candidates {
        let err = (*reference * c - imu).length();
        if err < best_err {
            best_err = err;
            best = c;
        }
    }
    best
}

/// Camera-frame gravity direction of every pair under `reference`.
///
/// Direct direction observations pass through unchanged.
pub fn resolve_directions(
    observations: &[CameraObservation],
    imu: &[DirectionSample],
    reference: &DMat3,
) -> Result<Vec<DVec3>, CalibrationError> {
    if observations.len() != imu.len() {
        return Err(CalibrationError::MismatchedLengths {
            camera: observations.len(),
            imu: imu.len(),
        });
    }

    Ok(observations
        .iter()
        .zip(imu.iter())
        .map(|(obs, g)| match obs {
            CameraObservation::Direction(d) => d.direction(),
            CameraObservation::Rotation(r) => {
                select_direction(&candidate_directions(r), reference, g.direction())
            }
        })
        .collect())
}

/// Alternate direction selection and rotation fitting until the selection settles.
///
/// The first selection uses `initial` as the reference rotation; later rounds use the
/// latest fit. Stops after [`MAX_ROUNDS`] fits at most.
pub fn align_with_selection(
    observations: &[CameraObservation],
    imu: &[DirectionSample],
    initial: &DMat3,
    strategy: &dyn AlignmentStrategy,
    rng: &mut dyn RngCore,
) -> Result<ExtrinsicCalibration, CalibrationError> {
    let imu_dirs = imu.iter().map(|s| s.direction()).collect::<Vec<_>>();
    let mut camera_dirs = resolve_directions(observations, imu, initial)?;
    let mut calibration = strategy.align(&camera_dirs, &imu_dirs, rng)?;

    let needs_selection = observations
        .iter()
        .any(|o| matches!(o, CameraObservation::Rotation(_)));
    if !needs_selection {
        return Ok(calibration);
    }

    for round in 1..MAX_ROUNDS {
        let reselected = resolve_directions(observations, imu, calibration.rotation.matrix())?;
        if reselected == camera_dirs {
            log::debug!("gravity selection stable after {round} rounds");
            break;
        }
        camera_dirs = reselected;
        calibration = strategy.align(&camera_dirs, &imu_dirs, rng)?;
    }

    Ok(calibration)
}
