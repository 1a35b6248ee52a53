#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia VP
//!
//! Camera geometry from vanishing points.
//!
//! ## Key Features
//!
//! - **RANSAC vanishing points**: pairwise-intersection voting over image line segments
//! - **Orthogonal triplets**: focal length from three mutually orthogonal vanishing directions
//! - **Camera rotation**: a proper rotation built from an orthogonal triplet
//!
//! ## Example
//!
//! ```rust
//! use kornia_vp::{LineSegment, VanishingPointEstimator, VanishingPointParams};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // lines converging at (100, 50) in center-origin coordinates
//! let lines = (0..8)
//!     .map(|i| {
//!         let angle = i as f64 * 0.35;
//!         let (s, c) = angle.sin_cos();
//!         LineSegment::from_coords(100.0 + 40.0 * c, 50.0 + 40.0 * s, 100.0 + 90.0 * c, 50.0 + 90.0 * s)
//!     })
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let estimator = VanishingPointEstimator::new(VanishingPointParams::default());
//! let mut rng = StdRng::seed_from_u64(0);
//! let found = estimator.find_vanishing_points(&lines, 1, &mut rng);
//!
//! let position = found[0].vanishing_point.position().unwrap();
//! assert!((position.x - 100.0).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Error types of the crate.
pub mod error;

/// Line segments in image-centered coordinates.
pub mod line;

/// 3x3 linear algebra helpers backed by nalgebra.
pub mod linalg;

/// Selection of mutually orthogonal vanishing points and focal length estimation.
pub mod orthogonal;

/// Rotation matrices and camera rotation from an orthogonal triplet.
pub mod rotation;

/// RANSAC vanishing point estimation.
pub mod vanishing;

pub use error::VanishingPointError;
pub use line::LineSegment;
pub use orthogonal::{FocalPrior, OrthogonalTriplet, OrthogonalTripletSelector, OrthogonalityParams};
pub use rotation::{build_rotation, MatrixLayout, RotationMatrix};
pub use vanishing::{
    intersect_lines, SupportMetric, VanishingPoint, VanishingPointEstimate,
    VanishingPointEstimator, VanishingPointParams,
};
