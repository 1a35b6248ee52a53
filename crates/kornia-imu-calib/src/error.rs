use kornia_vp::VanishingPointError;
use thiserror::Error;

use crate::calibrator::ImuInputMode;
use crate::sample::Frame;

/// Errors of the camera-IMU calibration pipeline.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Not enough paired samples (or focal estimates) to run the requested step.
    #[error("Calibration requires at least {required} samples, got {actual}")]
    InsufficientData {
        /// Minimum number of samples.
        required: usize,
        /// Number of samples available.
        actual: usize,
    },

    /// RANSAC did not find a rotation explained by enough samples.
    #[error("RANSAC found {inliers} inliers, at least {required} are required")]
    RansacExhausted {
        /// Inliers of the best hypothesis.
        inliers: usize,
        /// Minimum number of inliers.
        required: usize,
    },

    /// A second sample was appended on one side before the other side caught up.
    #[error("A {side:?} sample is still waiting for its pair")]
    UnpairedSample {
        /// Side that already holds the pending sample.
        side: Frame,
    },

    /// The IMU entry point does not match the configured input mode.
    #[error("IMU input configured as {expected:?} but received {actual:?}")]
    ImuModeMismatch {
        /// Configured mode.
        expected: ImuInputMode,
        /// Mode of the called entry point.
        actual: ImuInputMode,
    },

    /// A direction is zero or not finite.
    #[error("Invalid direction vector")]
    InvalidDirection,

    /// Camera and IMU sequences have different lengths.
    #[error("Mismatched sample counts: camera ({camera}) != imu ({imu})")]
    MismatchedLengths {
        /// Number of camera directions.
        camera: usize,
        /// Number of IMU directions.
        imu: usize,
    },

    /// The singular value decomposition did not converge.
    #[error("SVD computation failed")]
    Svd,

    /// Error from the vanishing point stage.
    #[error(transparent)]
    VanishingPoint(#[from] VanishingPointError),

    /// Error while reading or writing a calibration file.
    #[error("Failed to access calibration file. {0}")]
    Io(#[from] std::io::Error),

    /// Malformed calibration file.
    #[error("Failed to (de)serialize calibration record. {0}")]
    Json(#[from] serde_json::Error),
}
