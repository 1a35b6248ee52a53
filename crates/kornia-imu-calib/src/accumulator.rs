use crate::error::CalibrationError;
use crate::sample::{CameraObservation, DirectionSample, Frame};

/// Index-aligned camera and IMU samples.
///
/// Entry `i` on both sides belongs to the same event. Either side may be appended
/// first, but at most one sample can wait for its pair at any time.
#[derive(Debug, Clone, Default)]
pub struct SampleAccumulator {
    camera: Vec<CameraObservation>,
    imu: Vec<DirectionSample>,
}

impl SampleAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a camera observation.
    pub fn push_camera(&mut self, observation: CameraObservation) -> Result<(), CalibrationError> {
        if self.pending() == Some(Frame::Camera) {
            return Err(CalibrationError::UnpairedSample {
                side: Frame::Camera,
            });
        }
        self.camera.push(observation);
        Ok(())
    }

    /// Append an IMU direction.
    pub fn push_imu(&mut self, sample: DirectionSample) -> Result<(), CalibrationError> {
        if sample.frame() != Frame::Imu {
            return Err(CalibrationError::InvalidDirection);
        }
        if self.pending() == Some(Frame::Imu) {
            return Err(CalibrationError::UnpairedSample { side: Frame::Imu });
        }
        self.imu.push(sample);
        Ok(())
    }

    /// Side holding a sample that still waits for its pair.
    pub fn pending(&self) -> Option<Frame> {
        match self.camera.len().cmp(&self.imu.len()) {
            std::cmp::Ordering::Greater => Some(Frame::Camera),
            std::cmp::Ordering::Less => Some(Frame::Imu),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Drop the sample waiting for its pair, if any.
    pub fn discard_pending(&mut self) -> Option<Frame> {
        let side = self.pending()?;
        match side {
            Frame::Camera => {
                self.camera.pop();
            }
            Frame::Imu => {
                self.imu.pop();
            }
        }
        log::debug!("discarded pending {side:?} sample");
        Some(side)
    }

    /// Number of complete pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.camera.len().min(self.imu.len())
    }

    /// Whether no complete pair exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Camera side of the complete pairs.
    pub fn camera_observations(&self) -> &[CameraObservation] {
        &self.camera[..self.len()]
    }

    /// IMU side of the complete pairs.
    pub fn imu_samples(&self) -> &[DirectionSample] {
        &self.imu[..self.len()]
    }

    /// Remove every sample.
    pub fn clear(&mut self) {
        self.camera.clear();
        self.imu.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use kornia_vp::RotationMatrix;

    #[test]
    fn test_pairs_stay_aligned() -> Result<(), CalibrationError> {
        let mut acc = SampleAccumulator::new();
        acc.push_camera(CameraObservation::Rotation(RotationMatrix::IDENTITY))?;
        assert_eq!(acc.pending(), Some(Frame::Camera));
        assert!(acc.is_empty());

        acc.push_imu(DirectionSample::imu(DVec3::NEG_Z)?)?;
        assert_eq!(acc.pending(), None);

        // the IMU side may lead as well
        acc.push_imu(DirectionSample::imu(DVec3::X)?)?;
        acc.push_camera(CameraObservation::Direction(DirectionSample::camera(DVec3::Y)?))?;

        assert_eq!(acc.len(), 2);
        assert_eq!(acc.imu_samples()[1].direction(), DVec3::X);
        assert!(matches!(
            acc.camera_observations()[1],
            CameraObservation::Direction(_)
        ));
        Ok(())
    }

    #[test]
    fn test_unpaired_sample() -> Result<(), CalibrationError> {
        let mut acc = SampleAccumulator::new();
        acc.push_imu(DirectionSample::imu(DVec3::NEG_Z)?)?;
        let res = acc.push_imu(DirectionSample::imu(DVec3::NEG_Y)?);
        assert!(matches!(
            res,
            Err(CalibrationError::UnpairedSample { side: Frame::Imu })
        ));

        // the pending sample is not part of the pairs
        assert_eq!(acc.len(), 0);
        assert!(acc.imu_samples().is_empty());

        assert_eq!(acc.discard_pending(), Some(Frame::Imu));
        assert_eq!(acc.pending(), None);
        Ok(())
    }

    #[test]
    fn test_rejects_camera_frame_on_imu_side() -> Result<(), CalibrationError> {
        let mut acc = SampleAccumulator::new();
        let res = acc.push_imu(DirectionSample::camera(DVec3::Z)?);
        assert!(matches!(res, Err(CalibrationError::InvalidDirection)));
        Ok(())
    }
}
