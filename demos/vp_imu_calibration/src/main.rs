use argh::FromArgs;
use std::path::PathBuf;

use glam::{DMat3, DVec2, DVec3};
use kornia_imu_calib::{
    self as kimu, AlignmentMethod, CalibratorConfig, ImuCameraCalibrator, RansacParams,
};
use kornia_vp::{MatrixLayout, RotationMatrix};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(FromArgs)]
/// Calibrate focal length and camera to IMU rotation on a synthetic sequence
struct Args {
    /// number of images
    #[argh(option, default = "8")]
    num_images: usize,

    /// focal length of the simulated camera in pixels
    #[argh(option, default = "800.0")]
    focal: f64,

    /// endpoint noise of the rendered segments in pixels
    #[argh(option, default = "0.3")]
    noise: f64,

    /// number of outlier segments per image
    #[argh(option, default = "10")]
    clutter: usize,

    /// seed of the scene generator and the calibrator
    #[argh(option, default = "0")]
    seed: u64,

    /// align with least squares instead of RANSAC
    #[argh(switch)]
    least_squares: bool,

    /// path to write the calibration as JSON
    #[argh(option)]
    output: Option<PathBuf>,
}

const WIDTH: usize = 640;
const HEIGHT: usize = 480;

/// Segments `[x1, y1, x2, y2]` of three orthogonal line families plus clutter.
fn render_image(
    rotation: &DMat3,
    focal: f64,
    noise: f64,
    clutter: usize,
    rng: &mut StdRng,
) -> Vec<[f64; 4]> {
    let center = DVec2::new(WIDTH as f64 / 2.0, HEIGHT as f64 / 2.0);
    let mut jitter = |p: DVec2| {
        p + center + DVec2::new(rng.random_range(-noise..=noise), rng.random_range(-noise..=noise))
    };

    let mut segments = Vec::new();
    let mut anchors = Vec::new();
    for k in 0..3 {
        let c = rotation.col(k);
        let vp = DVec2::new(focal * c.x / c.z, focal * c.y / c.z);
        for i in 0..15 {
            let t = (i as f64 + 0.5) / 15.0;
            let anchor = DVec2::new(-280.0 + 560.0 * t, 200.0 * (9.0 * t + k as f64).sin());
            anchors.push((anchor, anchor + 60.0 * (vp - anchor).normalize()));
        }
    }
    for (p0, p1) in anchors {
        let (p0, p1) = (jitter(p0), jitter(p1));
        segments.push([p0.x, p0.y, p1.x, p1.y]);
    }

    for _ in 0..clutter {
        let p0 = DVec2::new(
            rng.random_range(0.0..WIDTH as f64),
            rng.random_range(0.0..HEIGHT as f64),
        );
        let dir = DVec2::from_angle(rng.random_range(0.0..std::f64::consts::PI));
        let p1 = p0 + 30.0 * dir;
        segments.push([p0.x, p0.y, p1.x, p1.y]);
    }
    segments
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut rng = StdRng::seed_from_u64(args.seed);

    // ground truth camera to IMU rotation, a few degrees off the axis reassignment
    let truth = RotationMatrix::from_col_major(&kimu::AXIS_REASSIGNMENT.to_cols_array())
        * RotationMatrix::from_axis_angle(DVec3::new(0.03, -0.05, 0.04));

    let alignment = if args.least_squares {
        AlignmentMethod::LeastSquares
    } else {
        AlignmentMethod::Ransac(RansacParams::default())
    };
    let mut calibrator = ImuCameraCalibrator::new(CalibratorConfig {
        alignment,
        image_size: Some((WIDTH, HEIGHT)),
        seed: Some(args.seed),
        ..Default::default()
    });

    let base = DMat3::from_rotation_x(0.3) * DMat3::from_rotation_y(0.6);
    for i in 0..args.num_images {
        let view = DMat3::from_euler(
            glam::EulerRot::XYZ,
            rng.random_range(-0.15..0.15),
            rng.random_range(-0.15..0.15),
            rng.random_range(-0.15..0.15),
        );
        let rotation = view * base;

        let segments = render_image(&rotation, args.focal, args.noise, args.clutter, &mut rng);
        if !calibrator.add_pixel_lines(&segments)? {
            println!("image #{i}: no orthogonal triplet, skipped");
            continue;
        }

        // the rig is turned so that gravity is seen along a different scene axis
        let k = i % 3;
        let sign = if (i / 3) % 2 == 0 { 1.0 } else { -1.0 };
        let gravity = truth * (sign * rotation.col(k));
        calibrator.add_imu_gravity(gravity)?;
    }

    let intrinsics = calibrator.calibrate_intrinsics()?;
    println!(
        "intrinsics: fx={:.2} fy={:.2} cx={:.1} cy={:.1} (true focal {:.2})",
        intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy, args.focal
    );

    let result = calibrator.calibrate_extrinsic_rotation()?;
    println!("well posed: {}", result.well_posed);
    if let Some(inliers) = &result.inliers {
        println!("inliers: {inliers:?}");
    }
    println!(
        "error to ground truth: {:.4} deg",
        result.rotation.angle_to(&truth).to_degrees()
    );

    if let Some(r) = calibrator.rotation_matrix(MatrixLayout::RowMajor) {
        println!("camera to imu (row-major):");
        for row in r.chunks(3) {
            println!("  {:>9.5} {:>9.5} {:>9.5}", row[0], row[1], row[2]);
        }
    }

    if let (Some(path), Some(record)) = (args.output, calibrator.record()) {
        kimu::write_calibration_json(&path, &record)?;
        log::info!("calibration written to {}", path.display());
    }

    Ok(())
}
