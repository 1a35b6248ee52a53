use thiserror::Error;

/// Errors raised while building vanishing point inputs and results.
#[derive(Debug, Error, PartialEq)]
pub enum VanishingPointError {
    /// Both endpoints of a segment coincide, so it has no direction.
    #[error("Line segment endpoints coincide at ({x}, {y})")]
    DegenerateSegment {
        /// X coordinate of the repeated endpoint.
        x: f64,
        /// Y coordinate of the repeated endpoint.
        y: f64,
    },

    /// A coordinate is NaN or infinite.
    #[error("Line segment has non-finite coordinates")]
    NonFiniteCoordinate,

    /// The focal length of a triplet must be strictly positive and finite.
    #[error("Invalid focal length: {0}")]
    InvalidFocalLength(f64),

    /// The matrix handed over as a rotation is not orthonormal with det = +1.
    #[error("Matrix is not a proper rotation (det = {determinant})")]
    NotARotation {
        /// Determinant of the rejected matrix.
        determinant: f64,
    },
}
