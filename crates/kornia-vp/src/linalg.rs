//! Small 3×3 decompositions used across the calibration pipeline.
//!
//! Geometry is exchanged as `glam` double precision types; the decompositions
//! themselves run on `nalgebra`.

use glam::{DMat3, DVec3};
use nalgebra::{Matrix3, SVD};

/// Singular value decomposition `A = U Σ Vᵀ` of a 3×3 matrix.
///
/// Singular values are sorted in descending order and the columns of `U` and `V`
/// follow the same order.
#[derive(Debug, Clone, Copy)]
pub struct Svd3 {
    u: DMat3,
    s: DVec3,
    v: DMat3,
}

impl Svd3 {
    /// Left singular vectors (columns).
    #[inline]
    pub fn u(&self) -> &DMat3 {
        &self.u
    }

    /// Singular values, `s.x ≥ s.y ≥ s.z ≥ 0`.
    #[inline]
    pub fn s(&self) -> &DVec3 {
        &self.s
    }

    /// Right singular vectors (columns).
    #[inline]
    pub fn v(&self) -> &DMat3 {
        &self.v
    }

    /// The closest orthonormal matrix `U Vᵀ` (polar factor), which may be a reflection.
    #[inline]
    pub fn polar(&self) -> DMat3 {
        self.u * self.v.transpose()
    }

    /// The closest proper rotation: `U diag(1, 1, ±1) Vᵀ`.
    pub fn closest_rotation(&self) -> DMat3 {
        let r = self.polar();
        if r.determinant() < 0.0 {
            let correction = DMat3::from_diagonal(DVec3::new(1.0, 1.0, -1.0));
            self.u * correction * self.v.transpose()
        } else {
            r
        }
    }
}

/// Convert a glam matrix into nalgebra storage.
#[inline]
pub fn to_nalgebra(m: &DMat3) -> Matrix3<f64> {
    Matrix3::from_column_slice(&m.to_cols_array())
}

/// Convert a nalgebra matrix back into a glam matrix.
#[inline]
pub fn from_nalgebra(m: &Matrix3<f64>) -> DMat3 {
    DMat3::from_cols_slice(m.as_slice())
}

/// Compute the sorted SVD of a 3×3 matrix.
///
/// Returns `None` when the input is not finite or the decomposition did not produce
/// singular vectors.
pub fn svd3(a: &DMat3) -> Option<Svd3> {
    if !a.is_finite() {
        return None;
    }

    let svd = SVD::new(to_nalgebra(a), true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let values = svd.singular_values;

    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| values[j].total_cmp(&values[i]));

    let u_cols = order.map(|i| DVec3::new(u[(0, i)], u[(1, i)], u[(2, i)]));
    let v_cols = order.map(|i| DVec3::new(v_t[(i, 0)], v_t[(i, 1)], v_t[(i, 2)]));

    Some(Svd3 {
        u: DMat3::from_cols(u_cols[0], u_cols[1], u_cols[2]),
        s: DVec3::new(values[order[0]], values[order[1]], values[order[2]]),
        v: DMat3::from_cols(v_cols[0], v_cols[1], v_cols[2]),
    })
}

/// Frobenius norm of a 3×3 matrix.
#[inline]
pub fn frobenius_norm(m: &DMat3) -> f64 {
    m.to_cols_array().iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Distance `‖U Vᵀ − A‖_F` between `a` and the closest orthonormal matrix.
///
/// Returns infinity when the decomposition fails.
pub fn orthogonality_residual(a: &DMat3) -> f64 {
    match svd3(a) {
        Some(svd) => frobenius_norm(&(svd.polar() - *a)),
        None => f64::INFINITY,
    }
}
