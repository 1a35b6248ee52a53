//! Closed-form rotation between two sets of paired unit directions (Kabsch).

use glam::{DMat3, DVec3};
use kornia_vp::{linalg, RotationMatrix};

use crate::error::CalibrationError;

/// Minimum ratio `σ₂ / σ₁` of the cross-covariance for a well-posed solution.
pub const DEGENERACY_RATIO: f64 = 0.01;

/// Minimum number of pairs for the rotation fit.
pub const MIN_SAMPLES: usize = 3;

/// Output of the Kabsch solver.
#[derive(Debug, Clone, PartialEq)]
pub struct KabschSolution {
    /// Rotation mapping camera directions onto IMU directions.
    pub rotation: RotationMatrix,
    /// Singular values of the cross-covariance, in descending order.
    pub singular_values: DVec3,
    /// Whether the directions span enough of the sphere to fix the rotation.
    pub well_posed: bool,
}

/// Rotation `R` minimising `Σ ‖R·camera_i − imu_i‖²`.
///
/// With `A = Σ imu_i · camera_iᵀ = U Σ Vᵀ` the solution is `R = U diag(1, 1, d) Vᵀ`
/// where `d = sign(det(U Vᵀ))`. The fit is flagged as not well-posed when all
/// directions are (nearly) collinear, `σ₂ / σ₁ < 0.01`.
pub fn kabsch(camera: &[DVec3], imu: &[DVec3]) -> Result<KabschSolution, CalibrationError> {
    if camera.len() != imu.len() {
        return Err(CalibrationError::MismatchedLengths {
            camera: camera.len(),
            imu: imu.len(),
        });
    }
    if camera.len() < MIN_SAMPLES {
        return Err(CalibrationError::InsufficientData {
            required: MIN_SAMPLES,
            actual: camera.len(),
        });
    }

    let mut a = DMat3::ZERO;
    for (c, g) in camera.iter().zip(imu.iter()) {
        a += DMat3::from_cols(*g * c.x, *g * c.y, *g * c.z);
    }

    let svd = linalg::svd3(&a).ok_or(CalibrationError::Svd)?;
    let s = *svd.s();
    let well_posed = s.x > 0.0 && s.y / s.x >= DEGENERACY_RATIO;
    if !well_posed {
        log::debug!("degenerate kabsch input, singular values {s:?}");
    }

    Ok(KabschSolution {
        rotation: RotationMatrix::from_svd(&svd),
        singular_values: s,
        well_posed,
    })
}
