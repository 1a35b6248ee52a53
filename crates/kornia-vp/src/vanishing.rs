//! RANSAC vanishing point estimation by pairwise line intersection voting.

use glam::{DMat2, DVec2, DVec3};
use rand::Rng;

use crate::line::LineSegment;

/// A point where a cluster of image lines converges.
///
/// The point is stored in homogeneous coordinates: finite points have `w = 1`,
/// points at infinity have `w = 0` and a unit `(x, y)` direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VanishingPoint {
    homogeneous: DVec3,
    support: usize,
}

impl VanishingPoint {
    /// A finite vanishing point at `position`.
    pub fn finite(position: DVec2, support: usize) -> Self {
        Self {
            homogeneous: position.extend(1.0),
            support,
        }
    }

    /// A vanishing point at infinity along `direction`.
    pub fn at_infinity(direction: DVec2, support: usize) -> Self {
        Self {
            homogeneous: direction.normalize_or_zero().extend(0.0),
            support,
        }
    }

    /// Build from a homogeneous 3-vector; finite points are rescaled to `w = 1`.
    pub fn from_homogeneous(point: DVec3, support: usize) -> Self {
        if point.z == 0.0 {
            Self::at_infinity(point.truncate(), support)
        } else {
            Self::finite(point.truncate() / point.z, support)
        }
    }

    /// Homogeneous coordinates of the point.
    #[inline]
    pub fn homogeneous(&self) -> DVec3 {
        self.homogeneous
    }

    /// Image position, `None` for points at infinity.
    #[inline]
    pub fn position(&self) -> Option<DVec2> {
        self.is_finite().then(|| self.homogeneous.truncate())
    }

    /// Whether the point lies at a finite image position.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.homogeneous.z != 0.0
    }

    /// Number of lines supporting the point.
    #[inline]
    pub fn support(&self) -> usize {
        self.support
    }

    /// Distance from the image origin; infinite for points at infinity.
    #[inline]
    pub fn distance_from_origin(&self) -> f64 {
        match self.position() {
            Some(p) => p.length(),
            None => f64::INFINITY,
        }
    }

    /// Unit ray of the vanishing direction for a pinhole camera with focal length `focal`.
    #[inline]
    pub fn back_project(&self, focal: f64) -> DVec3 {
        let h = self.homogeneous;
        DVec3::new(h.x, h.y, focal * h.z).normalize()
    }
}

/// Distance used to decide whether a line supports a vanishing point hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupportMetric {
    /// Orthogonal distance from the point to the infinite extension of the line.
    #[default]
    PointToLine,
    /// Distance from the segment endpoint to the ray joining its midpoint and the point.
    EndpointDeviation,
}

/// Parameters of the vanishing point search.
#[derive(Debug, Clone)]
pub struct VanishingPointParams {
    /// Maximum distance (pixels) for a line to support a point.
    pub inlier_threshold: f64,
    /// Probability of having sampled an all-inlier pair when the search stops.
    pub confidence: f64,
    /// Hard ceiling on the number of sampled pairs per vanishing point.
    pub max_iterations: usize,
    /// Minimum number of supporting lines for a vanishing point to be reported.
    pub min_support: usize,
    /// Maximum number of vanishing points extracted from one image.
    pub max_count: usize,
    /// Support distance.
    pub metric: SupportMetric,
    /// Re-intersect all supporting lines of the winning hypothesis.
    pub refine: bool,
}

impl Default for VanishingPointParams {
    fn default() -> Self {
        Self {
            inlier_threshold: 2.0,
            confidence: 0.995,
            max_iterations: 1000,
            min_support: 5,
            max_count: 5,
            metric: SupportMetric::PointToLine,
            refine: true,
        }
    }
}

/// A vanishing point and the indices of the input lines that support it.
#[derive(Debug, Clone)]
pub struct VanishingPointEstimate {
    /// The estimated point.
    pub vanishing_point: VanishingPoint,
    /// Sorted indices into the input line slice.
    pub inliers: Vec<usize>,
}

/// Least-squares intersection of lines.
///
/// Each line contributes its unit normal `n` and the constraint `nᵀx = nᵀp`. The
/// normal equations `Σ nnᵀ x = Σ nnᵀ p` are solved in closed form. When the system is
/// singular (all lines parallel) the intersection is the point at infinity along the
/// mean line direction.
///
/// Returns `None` for fewer than two lines.
pub fn intersect_lines<'a, I>(lines: I) -> Option<DVec3>
where
    I: IntoIterator<Item = &'a LineSegment>,
{
    let mut a = DMat2::ZERO;
    let mut b = DVec2::ZERO;
    let mut direction = DVec2::ZERO;
    let mut count = 0usize;

    for line in lines {
        let n = line.normal();
        let nnt = DMat2::from_cols(n * n.x, n * n.y);
        a += nnt;
        b += nnt * line.p0();

        // orient all directions like the first one before averaging
        let d = line.direction();
        direction += if direction.dot(d) < 0.0 { -d } else { d };
        count += 1;
    }

    if count < 2 {
        return None;
    }

    let trace = a.x_axis.x + a.y_axis.y;
    let det = a.determinant();
    if det.abs() <= 1e-12 * trace * trace {
        return Some(direction.normalize_or_zero().extend(0.0));
    }

    Some((a.inverse() * b).extend(1.0))
}

/// RANSAC estimator of vanishing points from line segments.
#[derive(Debug, Clone, Default)]
pub struct VanishingPointEstimator {
    params: VanishingPointParams,
}

impl VanishingPointEstimator {
    /// Create an estimator with the given parameters.
    pub fn new(params: VanishingPointParams) -> Self {
        Self { params }
    }

    /// Parameters of the estimator.
    pub fn params(&self) -> &VanishingPointParams {
        &self.params
    }

    /// Distance between `line` and a homogeneous point under the configured metric.
    ///
    /// Points at infinity are always measured with the endpoint deviation.
    pub fn support_distance(&self, line: &LineSegment, point: DVec3) -> f64 {
        if point.z == 0.0 {
            return line.endpoint_deviation(point);
        }
        match self.params.metric {
            SupportMetric::PointToLine => line.distance_to_point(point.truncate() / point.z),
            SupportMetric::EndpointDeviation => line.endpoint_deviation(point),
        }
    }

    /// Indices of `lines` that support `point`.
    pub fn line_support(&self, point: DVec3, lines: &[LineSegment]) -> Vec<usize> {
        (0..lines.len())
            .filter(|&i| self.support_distance(&lines[i], point) < self.params.inlier_threshold)
            .collect()
    }

    /// Find the best supported vanishing point among `lines`.
    ///
    /// Returns `None` for fewer than two lines or when no hypothesis explains more than
    /// the two lines it was sampled from. The minimum support threshold is not applied.
    pub fn find_vanishing_point<R: Rng + ?Sized>(
        &self,
        lines: &[LineSegment],
        rng: &mut R,
    ) -> Option<VanishingPointEstimate> {
        let pool = (0..lines.len()).collect::<Vec<_>>();
        self.ransac_two_lines(lines, &pool, rng)
    }

    /// Extract up to `max_count` vanishing points.
    ///
    /// After each accepted point its supporting lines leave the pool. The search stops
    /// early when fewer than two lines remain or the best point has less than
    /// `min_support` supporting lines.
    pub fn find_vanishing_points<R: Rng + ?Sized>(
        &self,
        lines: &[LineSegment],
        max_count: usize,
        rng: &mut R,
    ) -> Vec<VanishingPointEstimate> {
        let mut pool = (0..lines.len()).collect::<Vec<_>>();
        let mut found = Vec::with_capacity(max_count);

        while found.len() < max_count && pool.len() >= 2 {
            let Some(estimate) = self.ransac_two_lines(lines, &pool, rng) else {
                break;
            };

            if estimate.inliers.len() < self.params.min_support {
                log::debug!(
                    "vanishing point support {} below minimum {}, stopping",
                    estimate.inliers.len(),
                    self.params.min_support
                );
                break;
            }

            pool.retain(|idx| estimate.inliers.binary_search(idx).is_err());
            log::debug!(
                "vanishing point #{} at {:?} with {} lines, {} lines left",
                found.len(),
                estimate.vanishing_point.homogeneous(),
                estimate.inliers.len(),
                pool.len()
            );
            found.push(estimate);
        }

        found
    }

    /// Number of trials needed to sample an all-inlier pair with the configured confidence.
    fn required_iterations(&self, inlier_ratio: f64) -> usize {
        let log_conf = (1.0 - self.params.confidence).max(1e-12).ln();
        let log_denom = (1.0 - inlier_ratio * inlier_ratio).ln();
        let est = (log_conf / log_denom).ceil();
        if est.is_finite() && est >= 0.0 {
            (est as usize).min(self.params.max_iterations)
        } else if log_denom == f64::NEG_INFINITY {
            0
        } else {
            self.params.max_iterations
        }
    }

    fn support_in_pool(&self, point: DVec3, lines: &[LineSegment], pool: &[usize]) -> Vec<usize> {
        pool.iter()
            .copied()
            .filter(|&i| self.support_distance(&lines[i], point) < self.params.inlier_threshold)
            .collect()
    }

    fn ransac_two_lines<R: Rng + ?Sized>(
        &self,
        lines: &[LineSegment],
        pool: &[usize],
        rng: &mut R,
    ) -> Option<VanishingPointEstimate> {
        let n = pool.len();
        if n < 2 {
            return None;
        }

        // a hypothesis always explains the two lines it comes from
        let mut best_count = 2usize;
        let mut best: Option<(DVec3, Vec<usize>)> = None;

        let mut required_iters = self.required_iterations(2.0 / n as f64);
        let mut iter = 0usize;

        while iter < required_iters {
            iter += 1;

            let sample = rand::seq::index::sample(rng, n, 2);
            let (a, b) = (pool[sample.index(0)], pool[sample.index(1)]);
            let Some(guess) = intersect_lines([&lines[a], &lines[b]]) else {
                continue;
            };

            let inliers = self.support_in_pool(guess, lines, pool);
            if inliers.len() > best_count {
                best_count = inliers.len();
                required_iters = self.required_iterations(best_count as f64 / n as f64);
                best = Some((guess, inliers));
            }
        }

        let (mut point, mut inliers) = best?;
        log::trace!("vanishing point ransac stopped after {iter} iterations");

        if self.params.refine {
            if let Some(refined) = intersect_lines(inliers.iter().map(|&i| &lines[i])) {
                let refined_inliers = self.support_in_pool(refined, lines, pool);
                if refined_inliers.len() >= inliers.len() {
                    point = refined;
                    inliers = refined_inliers;
                }
            }
        }

        inliers.sort_unstable();
        Some(VanishingPointEstimate {
            vanishing_point: VanishingPoint::from_homogeneous(point, inliers.len()),
            inliers,
        })
    }
}
