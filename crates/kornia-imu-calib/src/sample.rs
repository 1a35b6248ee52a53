use glam::DVec3;
use kornia_vp::RotationMatrix;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Coordinate frame a direction is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Camera frame: x right, y down, z forward.
    Camera,
    /// IMU / device frame.
    Imu,
}

/// A unit direction tagged with its frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSample {
    direction: DVec3,
    frame: Frame,
}

impl DirectionSample {
    /// Normalize `direction`; zero and non-finite vectors are rejected.
    pub fn new(direction: DVec3, frame: Frame) -> Result<Self, CalibrationError> {
        let norm = direction.length();
        if !norm.is_finite() || norm <= f64::EPSILON {
            return Err(CalibrationError::InvalidDirection);
        }
        Ok(Self {
            direction: direction / norm,
            frame,
        })
    }

    /// A camera-frame direction.
    pub fn camera(direction: DVec3) -> Result<Self, CalibrationError> {
        Self::new(direction, Frame::Camera)
    }

    /// An IMU-frame direction.
    pub fn imu(direction: DVec3) -> Result<Self, CalibrationError> {
        Self::new(direction, Frame::Imu)
    }

    /// The unit direction.
    #[inline]
    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    /// The frame of the direction.
    #[inline]
    pub fn frame(&self) -> Frame {
        self.frame
    }
}

/// What the camera side contributes for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraObservation {
    /// A gravity direction measured directly in the camera frame.
    Direction(DirectionSample),
    /// A camera rotation from vanishing points, known up to a signed permutation of its
    /// columns. The gravity direction is one of its six signed columns.
    Rotation(RotationMatrix),
}
