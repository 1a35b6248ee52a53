#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia IMU Calib
//!
//! Rotation between a camera and an IMU rigidly mounted together.
//!
//! Each event pairs a camera observation (a rotation from vanishing points or a
//! gravity direction) with an IMU reading. Once three pairs exist the rotation is
//! fitted with the Kabsch algorithm, optionally inside RANSAC.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//! use kornia_imu_calib::{AlignmentMethod, CalibratorConfig, ImuCameraCalibrator};
//! use kornia_vp::{MatrixLayout, RotationMatrix};
//!
//! let truth = RotationMatrix::from_axis_angle(DVec3::new(0.1, 0.2, -0.1));
//! let mut calibrator = ImuCameraCalibrator::new(CalibratorConfig {
//!     alignment: AlignmentMethod::LeastSquares,
//!     seed: Some(0),
//!     ..Default::default()
//! });
//!
//! for camera_gravity in [DVec3::Y, DVec3::new(0.5, 0.8, 0.1), DVec3::new(-0.3, 0.6, 0.7)] {
//!     calibrator.add_camera_direction(camera_gravity)?;
//!     calibrator.add_imu_gravity(truth * camera_gravity.normalize())?;
//! }
//!
//! let result = calibrator.calibrate_extrinsic_rotation()?;
//! assert!(result.well_posed);
//! assert!(result.rotation.angle_to(&truth) < 1e-9);
//! assert!(calibrator.rotation_matrix(MatrixLayout::RowMajor).is_some());
//! # Ok::<(), kornia_imu_calib::CalibrationError>(())
//! ```

/// Sample accumulation with index-aligned pairs.
pub mod accumulator;

/// Alignment strategies (least squares and RANSAC).
pub mod align;

/// The calibration facade.
pub mod calibrator;

/// Error types of the crate.
pub mod error;

/// Gravity direction selection for camera rotations.
pub mod gravity;

/// JSON persistence of calibration results.
pub mod io;

/// Kabsch rotation fit.
pub mod kabsch;

/// Direction samples and camera observations.
pub mod sample;

pub use accumulator::SampleAccumulator;
pub use align::{
    AlignmentMethod, AlignmentStrategy, ExtrinsicCalibration, LeastSquaresAlignment,
    RansacAlignment, RansacParams,
};
pub use calibrator::{CalibratorConfig, ImuCameraCalibrator, ImuInputMode, PinholeIntrinsics};
pub use error::CalibrationError;
pub use gravity::AXIS_REASSIGNMENT;
pub use io::{read_calibration_json, write_calibration_json, CalibrationRecord};
pub use kabsch::{kabsch, KabschSolution};
pub use sample::{CameraObservation, DirectionSample, Frame};
