use glam::DVec3;
use kornia_imu_calib::{
    AlignmentMethod, CalibrationError, CalibratorConfig, ImuCameraCalibrator, ImuInputMode,
    RansacParams, AXIS_REASSIGNMENT,
};
use kornia_vp::{MatrixLayout, RotationMatrix};

/// Camera rotations of the five images.
fn camera_rotations() -> Vec<RotationMatrix> {
    let deg = std::f64::consts::PI / 180.0;
    vec![
        RotationMatrix::IDENTITY,
        RotationMatrix::from_axis_angle(DVec3::X * 10.0 * deg),
        RotationMatrix::from_axis_angle(DVec3::Y * 10.0 * deg),
        RotationMatrix::from_axis_angle(DVec3::Z * 10.0 * deg),
        RotationMatrix::from_axis_angle(DVec3::X * -5.0 * deg),
    ]
}

/// Which signed column of each camera rotation is aligned with gravity. The rig is
/// turned between images so that gravity is seen along different camera axes.
const GRAVITY_COLUMNS: [(usize, f64); 5] = [(1, 1.0), (0, 1.0), (2, -1.0), (1, -1.0), (0, -1.0)];

fn ground_truth() -> RotationMatrix {
    let offset = RotationMatrix::from_axis_angle(DVec3::new(0.05, -0.04, 0.08));
    RotationMatrix::from_col_major(&AXIS_REASSIGNMENT.to_cols_array()) * offset
}

/// Camera rotations and the IMU-frame gravity measured with each of them.
fn scenario(truth: &RotationMatrix) -> Vec<(RotationMatrix, DVec3)> {
    camera_rotations()
        .into_iter()
        .zip(GRAVITY_COLUMNS)
        .map(|(r, (k, sign))| (r, *truth * (sign * r.column(k))))
        .collect()
}

/// Axis-angle orientation of a device measuring gravity `g` in its own frame.
fn orientation_measuring(g: DVec3) -> DVec3 {
    let world = DVec3::NEG_Z;
    let axis = g.cross(world);
    if axis.length() < 1e-12 {
        return if g.dot(world) > 0.0 {
            DVec3::ZERO
        } else {
            DVec3::X * std::f64::consts::PI
        };
    }
    axis.normalize() * g.dot(world).clamp(-1.0, 1.0).acos()
}

#[test]
fn least_squares_recovers_camera_to_imu() -> Result<(), CalibrationError> {
    let truth = ground_truth();
    let mut calibrator = ImuCameraCalibrator::new(CalibratorConfig {
        seed: Some(42),
        ..Default::default()
    });

    for (rotation, gravity) in scenario(&truth) {
        calibrator.add_camera_rotation(rotation)?;
        calibrator.add_imu_gravity(gravity)?;
    }

    let result = calibrator.calibrate_extrinsic_rotation_with(&AlignmentMethod::LeastSquares)?;
    assert!(result.well_posed);
    assert!(result.rotation.matrix().abs_diff_eq(*truth.matrix(), 1e-3));
    assert!(result.rotation.is_proper(1e-9));

    let row = calibrator
        .rotation_matrix(MatrixLayout::RowMajor)
        .expect("stored rotation");
    let col = calibrator
        .rotation_matrix(MatrixLayout::ColumnMajor)
        .expect("stored rotation");
    let m = truth.matrix();
    // row-major: r01 is the x component of the second column
    assert!((row[1] - m.y_axis.x).abs() < 1e-3);
    assert!((col[1] - m.x_axis.y).abs() < 1e-3);
    for r in 0..3 {
        for c in 0..3 {
            assert_eq!(row[3 * r + c], col[3 * c + r]);
        }
    }
    Ok(())
}

#[test]
fn ransac_with_axis_angle_imu_input() -> Result<(), CalibrationError> {
    let truth = ground_truth();
    let mut calibrator = ImuCameraCalibrator::new(CalibratorConfig {
        imu_input: ImuInputMode::AxisAngle,
        alignment: AlignmentMethod::Ransac(RansacParams::default()),
        seed: Some(7),
        ..Default::default()
    });

    for (rotation, gravity) in scenario(&truth) {
        // the IMU side may lead
        calibrator.add_imu_rotation(orientation_measuring(gravity))?;
        calibrator.add_camera_rotation(rotation)?;
    }

    let result = calibrator.calibrate_extrinsic_rotation()?;
    assert!(result.well_posed);
    assert!(result.rotation.angle_to(&truth) < 1e-3);
    assert_eq!(result.inliers, Some(vec![0, 1, 2, 3, 4]));

    let record = calibrator.record().expect("calibrated");
    assert!(record.intrinsics.is_none());
    assert_eq!(record.num_samples, 5);
    Ok(())
}

#[test]
fn same_gravity_axis_is_ill_posed() -> Result<(), CalibrationError> {
    let truth = ground_truth();
    let mut calibrator = ImuCameraCalibrator::new(CalibratorConfig {
        seed: Some(1),
        ..Default::default()
    });

    // gravity always along the second column: all directions lie within a few degrees
    for rotation in camera_rotations() {
        let gravity = truth * rotation.column(1);
        calibrator.add_camera_rotation(rotation)?;
        calibrator.add_imu_gravity(gravity)?;
    }

    let result = calibrator.calibrate_extrinsic_rotation_with(&AlignmentMethod::LeastSquares)?;
    assert!(!result.well_posed);
    Ok(())
}
