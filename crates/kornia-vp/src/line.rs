use glam::{DVec2, DVec3};

use crate::error::VanishingPointError;

/// A detected straight edge.
///
/// Coordinates are expressed with the origin at the image center (or at the principal
/// point when it is known), x to the right and y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    p0: DVec2,
    p1: DVec2,
}

impl LineSegment {
    /// Create a segment from two distinct endpoints.
    pub fn new(p0: DVec2, p1: DVec2) -> Result<Self, VanishingPointError> {
        if !p0.is_finite() || !p1.is_finite() {
            return Err(VanishingPointError::NonFiniteCoordinate);
        }
        if p0.distance_squared(p1) <= f64::EPSILON {
            return Err(VanishingPointError::DegenerateSegment { x: p0.x, y: p0.y });
        }
        Ok(Self { p0, p1 })
    }

    /// Create a segment from raw endpoint coordinates `(x1, y1)` and `(x2, y2)`.
    pub fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Result<Self, VanishingPointError> {
        Self::new(DVec2::new(x1, y1), DVec2::new(x2, y2))
    }

    /// Create a segment from pixel coordinates, moving the origin to `principal_point`.
    ///
    /// Use the image center `(width / 2, height / 2)` when the principal point is unknown.
    pub fn from_pixels(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        principal_point: DVec2,
    ) -> Result<Self, VanishingPointError> {
        Self::new(
            DVec2::new(x1, y1) - principal_point,
            DVec2::new(x2, y2) - principal_point,
        )
    }

    /// First endpoint.
    #[inline]
    pub fn p0(&self) -> DVec2 {
        self.p0
    }

    /// Second endpoint.
    #[inline]
    pub fn p1(&self) -> DVec2 {
        self.p1
    }

    /// Segment midpoint.
    #[inline]
    pub fn midpoint(&self) -> DVec2 {
        0.5 * (self.p0 + self.p1)
    }

    /// Euclidean length of the segment.
    #[inline]
    pub fn length(&self) -> f64 {
        self.p0.distance(self.p1)
    }

    /// Unit direction from `p0` to `p1`.
    #[inline]
    pub fn direction(&self) -> DVec2 {
        (self.p1 - self.p0).normalize()
    }

    /// Unit normal of the supporting line.
    #[inline]
    pub fn normal(&self) -> DVec2 {
        let d = self.p1 - self.p0;
        DVec2::new(d.y, -d.x).normalize()
    }

    /// Homogeneous line `(a, b, c)` with `a² + b² = 1`, such that `a x + b y + c = 0`.
    pub fn homogeneous(&self) -> DVec3 {
        let n = self.normal();
        DVec3::new(n.x, n.y, -n.dot(self.p0))
    }

    /// Orthogonal distance from `point` to the infinite extension of the segment.
    #[inline]
    pub fn distance_to_point(&self, point: DVec2) -> f64 {
        self.normal().dot(point - self.p0).abs()
    }

    /// Distance between the segment endpoint and the ray that joins the midpoint with a
    /// homogeneous vanishing point.
    ///
    /// Points at infinity (`w = 0`) are treated as a direction. The measure is zero for a
    /// segment that points exactly at the vanishing point.
    pub fn endpoint_deviation(&self, point: DVec3) -> f64 {
        let mid = self.midpoint();
        let towards = if point.z == 0.0 {
            point.truncate()
        } else {
            point.truncate() / point.z - mid
        };
        let r = towards.length();
        if r <= f64::EPSILON {
            return 0.0;
        }
        let v = towards / r;
        let half = self.p0 - mid;
        let proj = v.dot(half);
        (half.length_squared() - proj * proj).max(0.0).sqrt()
    }
}
