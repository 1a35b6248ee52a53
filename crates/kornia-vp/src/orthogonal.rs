//! Selection of three mutually orthogonal vanishing directions.
//!
//! For a pinhole camera with principal point at the origin, two finite vanishing
//! points `v0`, `v1` of orthogonal 3D directions satisfy `v0·v1 + f² = 0`. The third
//! direction is then checked by back-projecting all three points and measuring how far
//! the stacked rays are from an orthonormal matrix.
//!
//! When only two orthogonal families are detected, the third vanishing point is
//! predicted from the first two and confirmed against the remaining image lines.

use glam::{DMat3, DVec3};

use crate::error::VanishingPointError;
use crate::line::LineSegment;
use crate::linalg;
use crate::vanishing::{VanishingPoint, VanishingPointEstimator};

/// How the focal length is obtained while scoring a triple.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FocalPrior {
    /// Solve the focal length from the two vanishing points nearest the image origin.
    #[default]
    Estimate,
    /// Use a known focal length (pixels) for every triple.
    Fixed(f64),
}

/// Parameters of the orthogonal triplet selection.
#[derive(Debug, Clone)]
pub struct OrthogonalityParams {
    /// A triple is accepted only if its residual `‖UVᵀ − A‖_F` is below this value.
    pub max_residual: f64,
    /// Source of the focal length.
    pub focal: FocalPrior,
    /// Minimum number of lines confirming a third vanishing point predicted from two
    /// detected ones; `None` disables the completion.
    pub completion_support: Option<usize>,
}

impl Default for OrthogonalityParams {
    fn default() -> Self {
        Self {
            max_residual: 0.1,
            focal: FocalPrior::Estimate,
            completion_support: Some(2),
        }
    }
}

/// Three vanishing points of mutually orthogonal directions and the focal length that
/// makes them orthogonal.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthogonalTriplet {
    points: [VanishingPoint; 3],
    focal_length: f64,
    residual: f64,
}

impl OrthogonalTriplet {
    /// Build a triplet from its points and focal length; the residual is computed here.
    pub fn new(points: [VanishingPoint; 3], focal_length: f64) -> Result<Self, VanishingPointError> {
        if !(focal_length.is_finite() && focal_length > 0.0) {
            return Err(VanishingPointError::InvalidFocalLength(focal_length));
        }
        let residual = orthogonality_residual(&points, focal_length);
        Ok(Self {
            points,
            focal_length,
            residual,
        })
    }

    /// The three vanishing points.
    #[inline]
    pub fn points(&self) -> &[VanishingPoint; 3] {
        &self.points
    }

    /// Focal length in pixels.
    #[inline]
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Distance of the back-projected rays from an orthonormal matrix.
    #[inline]
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Unit rays of the three vanishing directions in the camera frame.
    pub fn rays(&self) -> [DVec3; 3] {
        self.points.map(|p| p.back_project(self.focal_length))
    }
}

/// Focal length from two vanishing points of orthogonal directions, `f² = −(v0·v1)`.
///
/// Returns `None` when a point is at infinity or the product is not negative.
pub fn focal_from_pair(v0: &VanishingPoint, v1: &VanishingPoint) -> Option<f64> {
    let (p0, p1) = (v0.position()?, v1.position()?);
    let sqr_focal = -p0.dot(p1);
    (sqr_focal > 0.0).then(|| sqr_focal.sqrt())
}

fn orthogonality_residual(points: &[VanishingPoint; 3], focal: f64) -> f64 {
    let rays = points.map(|p| p.back_project(focal));
    linalg::orthogonality_residual(&DMat3::from_cols(rays[0], rays[1], rays[2]))
}

/// Exhaustive search for the most orthogonal triple among candidate vanishing points.
#[derive(Debug, Clone, Default)]
pub struct OrthogonalTripletSelector {
    params: OrthogonalityParams,
}

impl OrthogonalTripletSelector {
    /// Create a selector with the given parameters.
    pub fn new(params: OrthogonalityParams) -> Self {
        Self { params }
    }

    /// Parameters of the selector.
    pub fn params(&self) -> &OrthogonalityParams {
        &self.params
    }

    /// Focal length and orthogonality residual of one triple.
    ///
    /// With [`FocalPrior::Estimate`] the focal length comes from the two points closest
    /// to the origin; the triple is rejected (`None`) when that pair is inconsistent with
    /// a pinhole camera.
    pub fn evaluate(&self, triple: &[VanishingPoint; 3]) -> Option<(f64, f64)> {
        let focal = match self.params.focal {
            FocalPrior::Fixed(f) => f,
            FocalPrior::Estimate => {
                let mut order = [0usize, 1, 2];
                order.sort_by(|&i, &j| {
                    triple[i]
                        .distance_from_origin()
                        .total_cmp(&triple[j].distance_from_origin())
                });
                focal_from_pair(&triple[order[0]], &triple[order[1]])?
            }
        };

        if !(focal.is_finite() && focal > 0.0) {
            return None;
        }
        Some((focal, orthogonality_residual(triple, focal)))
    }

    /// Pick the triple with the smallest residual among all 3-combinations.
    ///
    /// Returns `None` when fewer than three points are given or when the best residual
    /// is not below `max_residual`.
    pub fn select(&self, vanishing_points: &[VanishingPoint]) -> Option<OrthogonalTriplet> {
        let n = vanishing_points.len();
        let mut best: Option<OrthogonalTriplet> = None;

        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    let triple = [vanishing_points[i], vanishing_points[j], vanishing_points[k]];
                    let Some((focal, residual)) = self.evaluate(&triple) else {
                        continue;
                    };
                    if best.as_ref().map_or(true, |b| residual < b.residual) {
                        best = Some(OrthogonalTriplet {
                            points: triple,
                            focal_length: focal,
                            residual,
                        });
                    }
                }
            }
        }

        match best {
            Some(triplet) if triplet.residual < self.params.max_residual => {
                log::debug!(
                    "orthogonal triplet with focal {:.2} and residual {:.4}",
                    triplet.focal_length,
                    triplet.residual
                );
                Some(triplet)
            }
            Some(triplet) => {
                log::debug!(
                    "best triplet residual {:.4} above threshold {}",
                    triplet.residual,
                    self.params.max_residual
                );
                None
            }
            None => None,
        }
    }

    /// Complete a triplet from two vanishing points of orthogonal directions.
    ///
    /// The third direction is the cross product of the two back-projected rays, so its
    /// image `v2` satisfies `v0·v2 = v1·v2 = −f²`. It is kept only if at least
    /// `completion_support` of `lines` pass through it under the metric of `estimator`.
    pub fn complete_pair(
        &self,
        v0: &VanishingPoint,
        v1: &VanishingPoint,
        lines: &[LineSegment],
        estimator: &VanishingPointEstimator,
    ) -> Option<OrthogonalTriplet> {
        let min_support = self.params.completion_support?;
        let focal = match self.params.focal {
            FocalPrior::Fixed(f) => f,
            FocalPrior::Estimate => focal_from_pair(v0, v1)?,
        };

        let direction = v0.back_project(focal).cross(v1.back_project(focal));
        let predicted = DVec3::new(direction.x, direction.y, direction.z / focal);
        let support = estimator.line_support(predicted, lines).len();
        if support < min_support {
            return None;
        }

        let points = [*v0, *v1, VanishingPoint::from_homogeneous(predicted, support)];
        let triplet = OrthogonalTriplet::new(points, focal).ok()?;
        (triplet.residual < self.params.max_residual).then_some(triplet)
    }

    /// Best completion over all pairs of `vanishing_points`: most supporting lines for the
    /// predicted point, then smallest residual.
    pub fn complete(
        &self,
        vanishing_points: &[VanishingPoint],
        lines: &[LineSegment],
        estimator: &VanishingPointEstimator,
    ) -> Option<OrthogonalTriplet> {
        let n = vanishing_points.len();
        let mut best: Option<OrthogonalTriplet> = None;

        for i in 0..n {
            for j in i + 1..n {
                let Some(triplet) =
                    self.complete_pair(&vanishing_points[i], &vanishing_points[j], lines, estimator)
                else {
                    continue;
                };
                let better = best.as_ref().map_or(true, |b| {
                    let (s, bs) = (triplet.points[2].support(), b.points[2].support());
                    s > bs || (s == bs && triplet.residual < b.residual)
                });
                if better {
                    best = Some(triplet);
                }
            }
        }

        if let Some(triplet) = &best {
            log::debug!(
                "triplet completed from two vanishing points, focal {:.2}, {} confirming lines",
                triplet.focal_length,
                triplet.points[2].support()
            );
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    /// Vanishing points of the camera-frame axes `rotation` for focal length `focal`.
    fn project_axes(rotation: &DMat3, focal: f64) -> [VanishingPoint; 3] {
        [0, 1, 2].map(|i| {
            let c = rotation.col(i);
            VanishingPoint::finite(DVec2::new(focal * c.x / c.z, focal * c.y / c.z), 10)
        })
    }

    fn camera_rotation() -> DMat3 {
        DMat3::from_rotation_x(0.35) * DMat3::from_rotation_y(0.7)
    }

    #[test]
    fn test_focal_from_pair() {
        let v0 = VanishingPoint::finite(DVec2::new(400.0, 0.0), 5);
        let v1 = VanishingPoint::finite(DVec2::new(-900.0, 0.0), 5);
        assert_eq!(focal_from_pair(&v0, &v1), Some(600.0));

        let same_side = VanishingPoint::finite(DVec2::new(900.0, 0.0), 5);
        assert_eq!(focal_from_pair(&v0, &same_side), None);

        let inf = VanishingPoint::at_infinity(DVec2::X, 5);
        assert_eq!(focal_from_pair(&v0, &inf), None);
    }

    #[test]
    fn test_select_recovers_focal() {
        let focal = 750.0;
        let points = project_axes(&camera_rotation(), focal);

        let selector = OrthogonalTripletSelector::default();
        let triplet = selector.select(&points).expect("triplet");
        assert!((triplet.focal_length() - focal).abs() < 0.01 * focal);
        assert!(triplet.residual() < 1e-6);
    }

    #[test]
    fn test_select_among_distractors() {
        let focal = 900.0;
        let axes = project_axes(&camera_rotation(), focal);
        let candidates = [
            VanishingPoint::finite(DVec2::new(35.0, -20.0), 6),
            axes[0],
            VanishingPoint::finite(DVec2::new(-1500.0, 2100.0), 8),
            axes[1],
            axes[2],
        ];

        let triplet = OrthogonalTripletSelector::default()
            .select(&candidates)
            .expect("triplet");
        assert!((triplet.focal_length() - focal).abs() < 0.01 * focal);
        for p in axes {
            assert!(triplet.points().contains(&p));
        }
    }

    #[test]
    fn test_select_rejects_non_orthogonal() {
        let focal = 750.0;
        let rotation = camera_rotation();
        let mut points = project_axes(&rotation, focal);

        // the point farthest from the origin does not enter the focal estimate; tilt its
        // direction by 15 degrees towards another axis
        let far = (0..3)
            .max_by(|&i, &j| {
                points[i]
                    .distance_from_origin()
                    .total_cmp(&points[j].distance_from_origin())
            })
            .expect("three points");
        let other = (far + 1) % 3;
        let axis = rotation.col(far).cross(rotation.col(other)).normalize();
        let tilted = DMat3::from_axis_angle(axis, 15f64.to_radians()) * rotation.col(far);
        points[far] = VanishingPoint::finite(
            DVec2::new(focal * tilted.x / tilted.z, focal * tilted.y / tilted.z),
            10,
        );

        let selector = OrthogonalTripletSelector::default();
        assert!(selector.select(&points).is_none());
        let (_, residual) = selector.evaluate(&points).expect("pinhole consistent");
        assert!(residual > 0.1);
    }

    #[test]
    fn test_fixed_focal_prior() {
        let focal = 640.0;
        let points = project_axes(&camera_rotation(), focal);

        let selector = OrthogonalTripletSelector::new(OrthogonalityParams {
            focal: FocalPrior::Fixed(focal),
            ..Default::default()
        });
        let triplet = selector.select(&points).expect("triplet");
        assert_eq!(triplet.focal_length(), focal);

        let wrong = OrthogonalTripletSelector::new(OrthogonalityParams {
            focal: FocalPrior::Fixed(2.0 * focal),
            ..Default::default()
        });
        assert!(wrong.select(&points).is_none());
    }

    /// Segments of `count` lines through `point`, fanned out around it.
    fn segments_through(point: DVec2, count: usize) -> Vec<LineSegment> {
        (0..count)
            .filter_map(|i| {
                let anchor = DVec2::new(-250.0 + 170.0 * i as f64, 120.0 - 60.0 * i as f64);
                let d = (point - anchor).normalize();
                LineSegment::new(anchor, anchor + 50.0 * d).ok()
            })
            .collect()
    }

    #[test]
    fn test_complete_from_two_points() {
        let focal = 800.0;
        let rotation = camera_rotation();
        let axes = project_axes(&rotation, focal);
        let estimator = VanishingPointEstimator::default();

        // the third family has a few lines only, too few to be detected on its own
        let third = axes[2].position().expect("finite");
        let mut lines = segments_through(third, 3);
        lines.push(LineSegment::new(DVec2::new(10.0, 10.0), DVec2::new(40.0, -5.0)).expect("segment"));

        let selector = OrthogonalTripletSelector::default();
        assert!(selector.select(&axes[..2]).is_none());

        let triplet = selector
            .complete(&axes[..2], &lines, &estimator)
            .expect("completed triplet");
        assert!((triplet.focal_length() - focal).abs() < 1e-6 * focal);
        assert!(triplet.residual() < 1e-6);
        let predicted = triplet.points()[2];
        assert_eq!(predicted.support(), 3);
        assert!(predicted.position().expect("finite").distance(third) < 1e-6);

        // unconfirmed prediction
        assert!(selector.complete(&axes[..2], &lines[3..], &estimator).is_none());

        let disabled = OrthogonalTripletSelector::new(OrthogonalityParams {
            completion_support: None,
            ..Default::default()
        });
        assert!(disabled.complete(&axes[..2], &lines, &estimator).is_none());
    }

    #[test]
    fn test_triplet_rejects_invalid_focal() {
        let points = project_axes(&camera_rotation(), 500.0);
        assert_eq!(
            OrthogonalTriplet::new(points, 0.0),
            Err(VanishingPointError::InvalidFocalLength(0.0))
        );
        assert!(OrthogonalTriplet::new(points, 500.0).is_ok());
    }
}
