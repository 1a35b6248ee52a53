use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec3;
use kornia_imu_calib::{kabsch, AlignmentStrategy, RansacAlignment, RansacParams};
use kornia_vp::RotationMatrix;
use rand::{rngs::StdRng, SeedableRng};

/// Paired directions related by a fixed rotation, every fifth pair corrupted.
fn generate_pairs(n: usize) -> (Vec<DVec3>, Vec<DVec3>) {
    let truth = RotationMatrix::from_axis_angle(DVec3::new(0.2, -0.5, 0.3));
    let mut camera = Vec::with_capacity(n);
    let mut imu = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 * 0.37;
        let c = DVec3::new(t.cos(), (1.3 * t).sin(), 0.5 * (0.7 * t).cos()).normalize();
        camera.push(c);
        imu.push(if i % 5 == 4 { -c } else { truth * c });
    }
    (camera, imu)
}

fn bench_kabsch(c: &mut Criterion) {
    let mut group = c.benchmark_group("kabsch");
    for &n in &[3, 50, 500] {
        let (camera, imu) = generate_pairs(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| std::hint::black_box(kabsch(&camera, &imu)));
        });
    }
    group.finish();
}

fn bench_ransac_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("ransac_alignment");
    let strategy = RansacAlignment::new(RansacParams::default());
    for &n in &[10, 100] {
        let (camera, imu) = generate_pairs(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(0);
                std::hint::black_box(strategy.align(&camera, &imu, &mut rng))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_kabsch, bench_ransac_alignment);
criterion_main!(benches);
