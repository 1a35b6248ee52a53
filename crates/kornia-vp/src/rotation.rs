//! Rotation matrices and camera rotation from an orthogonal triplet.

use std::ops::Mul;

use glam::{DMat3, DQuat, DVec3};

use crate::error::VanishingPointError;
use crate::linalg::{self, Svd3};
use crate::orthogonal::OrthogonalTriplet;

/// Order in which a 3×3 matrix is flattened into nine values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixLayout {
    /// Rows one after the other: `[r00, r01, r02, r10, ...]`.
    #[default]
    RowMajor,
    /// Columns one after the other: `[r00, r10, r20, r01, ...]`.
    ColumnMajor,
}

/// A 3D rotation stored as an orthonormal matrix with determinant +1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix(DMat3);

impl Default for RotationMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RotationMatrix {
    /// The identity rotation.
    pub const IDENTITY: Self = Self(DMat3::IDENTITY);

    /// Accept `m` as a rotation if `m mᵀ ≈ I` and `det(m) ≈ 1` within `tolerance`.
    pub fn from_matrix(m: DMat3, tolerance: f64) -> Result<Self, VanishingPointError> {
        let rotation = Self(m);
        if rotation.is_proper(tolerance) {
            Ok(rotation)
        } else {
            Err(VanishingPointError::NotARotation {
                determinant: m.determinant(),
            })
        }
    }

    /// The rotation closest to `m` in the Frobenius norm.
    ///
    /// Returns `None` when `m` is not finite.
    pub fn project(m: &DMat3) -> Option<Self> {
        linalg::svd3(m).map(|svd| Self::from_svd(&svd))
    }

    /// The closest rotation `U diag(1, 1, ±1) Vᵀ` of a decomposed matrix.
    #[inline]
    pub fn from_svd(svd: &Svd3) -> Self {
        Self(svd.closest_rotation())
    }

    /// Rotation from an axis-angle vector (Rodrigues formula), `|v|` is the angle in radians.
    pub fn from_axis_angle(v: DVec3) -> Self {
        let theta = v.length();
        if theta < 1e-12 {
            return Self::IDENTITY;
        }
        let k = hat(v / theta);
        Self(DMat3::IDENTITY + k * theta.sin() + k * k * (1.0 - theta.cos()))
    }

    /// Rotation from the vector part `sin(θ/2)·axis` of a unit quaternion with `w ≥ 0`.
    pub fn from_quaternion_vector(v: DVec3) -> Self {
        let s = v.length();
        if s < 1e-12 {
            return Self::IDENTITY;
        }
        let angle = 2.0 * s.min(1.0).asin();
        Self::from_axis_angle(v / s * angle)
    }

    /// Axis-angle vector of the rotation.
    pub fn to_axis_angle(&self) -> DVec3 {
        let (axis, angle) = DQuat::from_mat3(&self.0).to_axis_angle();
        axis * angle
    }

    /// The underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &DMat3 {
        &self.0
    }

    /// Column `index` of the matrix, the image of the `index`-th basis vector.
    #[inline]
    pub fn column(&self, index: usize) -> DVec3 {
        self.0.col(index)
    }

    /// The inverse rotation.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Determinant of the matrix.
    #[inline]
    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Whether `R Rᵀ ≈ I` and `det(R) ≈ 1`.
    pub fn is_proper(&self, tolerance: f64) -> bool {
        let rrt = self.0 * self.0.transpose();
        rrt.abs_diff_eq(DMat3::IDENTITY, tolerance)
            && (self.determinant() - 1.0).abs() <= tolerance
    }

    /// Geodesic distance in radians to `other`.
    pub fn angle_to(&self, other: &RotationMatrix) -> f64 {
        let r = self.0.transpose() * other.0;
        let cos = (r.x_axis.x + r.y_axis.y + r.z_axis.z - 1.0) / 2.0;
        // skew part, twice the sine times the axis
        let skew = DVec3::new(
            r.y_axis.z - r.z_axis.y,
            r.z_axis.x - r.x_axis.z,
            r.x_axis.y - r.y_axis.x,
        );
        (skew.length() / 2.0).atan2(cos)
    }

    /// Flatten the matrix in the given layout.
    pub fn to_array(&self, layout: MatrixLayout) -> [f64; 9] {
        match layout {
            MatrixLayout::RowMajor => self.to_row_major(),
            MatrixLayout::ColumnMajor => self.to_col_major(),
        }
    }

    /// Flatten row by row.
    #[inline]
    pub fn to_row_major(&self) -> [f64; 9] {
        self.0.transpose().to_cols_array()
    }

    /// Flatten column by column.
    #[inline]
    pub fn to_col_major(&self) -> [f64; 9] {
        self.0.to_cols_array()
    }

    /// Rows as nested arrays.
    #[inline]
    pub fn to_rows_array_2d(&self) -> [[f64; 3]; 3] {
        self.0.transpose().to_cols_array_2d()
    }

    /// Read a row-major matrix without validation.
    #[inline]
    pub fn from_row_major(values: &[f64; 9]) -> Self {
        Self(DMat3::from_cols_array(values).transpose())
    }

    /// Read a column-major matrix without validation.
    #[inline]
    pub fn from_col_major(values: &[f64; 9]) -> Self {
        Self(DMat3::from_cols_array(values))
    }

    /// Read nested rows without validation.
    #[inline]
    pub fn from_rows_array_2d(rows: &[[f64; 3]; 3]) -> Self {
        Self(DMat3::from_cols_array_2d(rows).transpose())
    }
}

impl Mul<DVec3> for RotationMatrix {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> Self::Output {
        self.0 * rhs
    }
}

impl Mul for RotationMatrix {
    type Output = RotationMatrix;

    fn mul(self, rhs: RotationMatrix) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl From<RotationMatrix> for DMat3 {
    fn from(r: RotationMatrix) -> Self {
        r.0
    }
}

fn hat(v: DVec3) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(0.0, v.z, -v.y),
        DVec3::new(-v.z, 0.0, v.x),
        DVec3::new(v.y, -v.x, 0.0),
    )
}

/// Camera rotation from an orthogonal triplet.
///
/// The three vanishing directions become the columns of the rotation. The direction
/// with the smallest horizontal component is the vertical axis (last column, pointing
/// down in image coordinates); the remaining two keep their order unless swapping them
/// is needed for a right-handed frame. The result is projected onto SO(3) to absorb the
/// residual non-orthogonality of the triplet.
pub fn build_rotation(triplet: &OrthogonalTriplet) -> RotationMatrix {
    let rays = triplet.rays();

    let mut vertical = 0;
    for (i, ray) in rays.iter().enumerate() {
        if ray.x.abs() <= rays[vertical].x.abs() {
            vertical = i;
        }
    }

    let mut axis2 = rays[vertical];
    if axis2.y < 0.0 {
        axis2 = -axis2;
    }

    let [first, second] = match vertical {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    };
    let (mut axis0, mut axis1) = (rays[first], rays[second]);
    if axis0.cross(axis1).dot(axis2) < 0.0 {
        std::mem::swap(&mut axis0, &mut axis1);
    }

    let assembled = DMat3::from_cols(axis0, axis1, axis2);
    match RotationMatrix::project(&assembled) {
        Some(rotation) => rotation,
        None => {
            log::warn!("svd failed on the assembled rotation, orthonormalizing instead");
            gram_schmidt(axis0, axis1)
        }
    }
}

fn gram_schmidt(a: DVec3, b: DVec3) -> RotationMatrix {
    let x = a.normalize_or(DVec3::X);
    let y = (b - x * x.dot(b)).normalize_or(x.any_orthonormal_vector());
    RotationMatrix(DMat3::from_cols(x, y, x.cross(y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vanishing::VanishingPoint;
    use approx::assert_relative_eq;
    use glam::DVec2;

    fn triplet_from(rotation: &DMat3, focal: f64) -> OrthogonalTriplet {
        let points = [0, 1, 2].map(|i| {
            let c = rotation.col(i);
            VanishingPoint::finite(DVec2::new(focal * c.x / c.z, focal * c.y / c.z), 10)
        });
        OrthogonalTriplet::new(points, focal).expect("valid focal")
    }

    #[test]
    fn test_build_rotation_is_proper() {
        let truth = DMat3::from_rotation_x(0.35) * DMat3::from_rotation_y(0.7);
        let rotation = build_rotation(&triplet_from(&truth, 800.0));

        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-9);
        assert!((*rotation.matrix() * rotation.matrix().transpose())
            .abs_diff_eq(DMat3::IDENTITY, 1e-9));

        // every column is a signed column of the true rotation
        for i in 0..3 {
            let col = rotation.column(i);
            let matched = (0..3).any(|k| {
                col.abs_diff_eq(truth.col(k), 1e-6) || col.abs_diff_eq(-truth.col(k), 1e-6)
            });
            assert!(matched, "column {i} = {col:?}");
        }

        // the vertical axis points down the image
        assert!(rotation.column(2).y >= 0.0);
    }

    #[test]
    fn test_build_rotation_vertical_axis() {
        // a camera tilted down about its x axis, the world vertical has x = 0
        let truth = DMat3::from_rotation_y(0.5) * DMat3::from_rotation_x(0.3);
        let triplet = triplet_from(&truth, 600.0);
        let rotation = build_rotation(&triplet);
        let rays = triplet.rays();
        let vertical = rays
            .iter()
            .min_by(|a, b| a.x.abs().total_cmp(&b.x.abs()))
            .expect("three rays");
        assert!(rotation.column(2).abs_diff_eq(*vertical, 1e-9)
            || rotation.column(2).abs_diff_eq(-*vertical, 1e-9));
        assert!(rotation.is_proper(1e-9));
    }

    #[test]
    fn test_build_rotation_noisy_triplet() {
        let truth = DMat3::from_rotation_z(0.2) * DMat3::from_rotation_x(0.6);
        let focal = 700.0;
        let mut points = *triplet_from(&truth, focal).points();
        let p = points[0].position().expect("finite");
        points[0] = VanishingPoint::finite(p + DVec2::new(15.0, -10.0), 10);
        let triplet = OrthogonalTriplet::new(points, focal).expect("valid focal");
        assert!(triplet.residual() > 0.0);

        let rotation = build_rotation(&triplet);
        assert!(rotation.is_proper(1e-9));
    }

    #[test]
    fn test_axis_angle() {
        let v = DVec3::new(0.1, -0.4, 0.25);
        let rotation = RotationMatrix::from_axis_angle(v);
        let expected = DMat3::from_axis_angle(v.normalize(), v.length());
        assert!(rotation.matrix().abs_diff_eq(expected, 1e-12));
        assert!(rotation.to_axis_angle().abs_diff_eq(v, 1e-9));
        assert_eq!(RotationMatrix::from_axis_angle(DVec3::ZERO), RotationMatrix::IDENTITY);
    }

    #[test]
    fn test_quaternion_vector() {
        let axis = DVec3::new(1.0, 2.0, -1.0).normalize();
        let angle = 0.8;
        let q = DQuat::from_axis_angle(axis, angle);
        let rotation = RotationMatrix::from_quaternion_vector(DVec3::new(q.x, q.y, q.z));
        assert!(rotation
            .matrix()
            .abs_diff_eq(DMat3::from_quat(q), 1e-12));
    }

    #[test]
    fn test_layouts() {
        let rotation = RotationMatrix::from_axis_angle(DVec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        // rotates x onto y
        let row = rotation.to_array(MatrixLayout::RowMajor);
        let col = rotation.to_array(MatrixLayout::ColumnMajor);
        assert_relative_eq!(row[1], -1.0, epsilon = 1e-12);
        assert_relative_eq!(row[3], 1.0, epsilon = 1e-12);
        assert_relative_eq!(col[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(col[3], -1.0, epsilon = 1e-12);

        assert_eq!(RotationMatrix::from_row_major(&row), rotation);
        assert_eq!(RotationMatrix::from_col_major(&col), rotation);
        assert_eq!(
            RotationMatrix::from_rows_array_2d(&rotation.to_rows_array_2d()),
            rotation
        );
        assert_eq!(rotation.to_rows_array_2d()[0][1], row[1]);
    }

    #[test]
    fn test_from_matrix_rejects_reflection() {
        let reflection = DMat3::from_diagonal(DVec3::new(1.0, -1.0, 1.0));
        assert_eq!(
            RotationMatrix::from_matrix(reflection, 1e-9),
            Err(VanishingPointError::NotARotation { determinant: -1.0 })
        );
        let projected = RotationMatrix::project(&(DMat3::IDENTITY * 2.0)).expect("finite");
        assert!(projected.matrix().abs_diff_eq(DMat3::IDENTITY, 1e-12));
    }

    #[test]
    fn test_angle_to() {
        let a = RotationMatrix::from_axis_angle(DVec3::new(0.2, 0.0, 0.0));
        let b = RotationMatrix::from_axis_angle(DVec3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(a.angle_to(&b), 0.3, epsilon = 1e-12);
        assert_relative_eq!((a * b.transpose()).determinant(), 1.0, epsilon = 1e-12);
        assert!((a * DVec3::X).abs_diff_eq(DVec3::X, 1e-12));
    }
}
