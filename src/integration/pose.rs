//! Pose estimation backends.

use crate::integration::Frame;
use crate::integration::heatmap::decode_heatmaps;
use crate::pipeline::{CenterScale, Joint};
use ndarray::Array3;

/// What a pose model returns for one subject crop: per-joint image
/// coordinates and per-joint confidences, as parallel arrays.
///
/// An empty estimate is a valid outcome (the model found nothing worth
/// reporting) and is zero-filled by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseEstimate {
    pub preds: Vec<[f32; 2]>,
    pub confidences: Vec<f32>,
}

impl PoseEstimate {
    pub fn new(preds: Vec<[f32; 2]>, confidences: Vec<f32>) -> Self {
        Self { preds, confidences }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_joints(joints: &[Joint]) -> Self {
        Self {
            preds: joints.iter().map(|j| [j.x, j.y]).collect(),
            confidences: joints.iter().map(|j| j.confidence).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty() && self.confidences.is_empty()
    }

    /// Zip predictions with confidences; `None` if the arrays differ in length.
    pub fn joints(&self) -> Option<Vec<Joint>> {
        if self.preds.len() != self.confidences.len() {
            return None;
        }
        Some(
            self.preds
                .iter()
                .zip(&self.confidences)
                .map(|(&[x, y], &confidence)| Joint::new(x, y, confidence))
                .collect(),
        )
    }
}

/// Trait for pose estimation backends.
///
/// Implementations own the crop-and-warp preprocessing: given the frame and
/// the subject's center/scale they build the model input, run inference and
/// return joints in frame coordinates.
pub trait PoseEstimator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn estimate(
        &mut self,
        frame: &Frame,
        target: &CenterScale,
    ) -> Result<PoseEstimate, Self::Error>;
}

impl<P: PoseEstimator + ?Sized> PoseEstimator for &mut P {
    type Error = P::Error;

    fn estimate(
        &mut self,
        frame: &Frame,
        target: &CenterScale,
    ) -> Result<PoseEstimate, Self::Error> {
        (**self).estimate(frame, target)
    }
}

/// A model producing one heatmap per joint, shape `(joints, height, width)`.
pub trait HeatmapModel {
    type Error: std::error::Error + Send + Sync + 'static;

    fn heatmaps(&mut self, frame: &Frame, target: &CenterScale) -> Result<Array3<f32>, Self::Error>;
}

/// Turns a [`HeatmapModel`] into a [`PoseEstimator`] by decoding its heatmaps.
pub struct HeatmapPoseEstimator<M> {
    model: M,
    pixel_std: f32,
}

impl<M: HeatmapModel> HeatmapPoseEstimator<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            pixel_std: crate::pipeline::PIXEL_STD,
        }
    }

    /// Must match the `pixel_std` used to build the center/scale.
    pub fn with_pixel_std(mut self, pixel_std: f32) -> Self {
        self.pixel_std = pixel_std;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: HeatmapModel> PoseEstimator for HeatmapPoseEstimator<M> {
    type Error = M::Error;

    fn estimate(
        &mut self,
        frame: &Frame,
        target: &CenterScale,
    ) -> Result<PoseEstimate, Self::Error> {
        let heatmaps = self.model.heatmaps(frame, target)?;
        Ok(decode_heatmaps(heatmaps.view(), target, self.pixel_std))
    }
}
