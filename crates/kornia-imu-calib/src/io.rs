use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use kornia_vp::RotationMatrix;
use serde::{Deserialize, Serialize};

use crate::align::ExtrinsicCalibration;
use crate::calibrator::PinholeIntrinsics;
use crate::error::CalibrationError;

/// Calibration results as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Camera intrinsics, when known.
    pub intrinsics: Option<PinholeIntrinsics>,
    /// Camera to IMU rotation, row by row.
    pub camera_to_imu: [[f64; 3]; 3],
    /// Whether the rotation was well constrained.
    pub well_posed: bool,
    /// Number of sample pairs behind the rotation.
    pub num_samples: usize,
}

impl CalibrationRecord {
    /// Build a record from a calibration result.
    pub fn new(
        intrinsics: Option<PinholeIntrinsics>,
        calibration: &ExtrinsicCalibration,
        num_samples: usize,
    ) -> Self {
        Self {
            intrinsics,
            camera_to_imu: calibration.rotation.to_rows_array_2d(),
            well_posed: calibration.well_posed,
            num_samples,
        }
    }

    /// The stored rotation.
    pub fn rotation(&self) -> RotationMatrix {
        RotationMatrix::from_rows_array_2d(&self.camera_to_imu)
    }
}

/// Write a calibration record as pretty printed JSON.
pub fn write_calibration_json(
    path: impl AsRef<Path>,
    record: &CalibrationRecord,
) -> Result<(), CalibrationError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record)?;
    writer.flush()?;
    Ok(())
}

/// Read a calibration record written by [`write_calibration_json`].
pub fn read_calibration_json(path: impl AsRef<Path>) -> Result<CalibrationRecord, CalibrationError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
