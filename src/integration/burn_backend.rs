//! Burn inference backend for person detection.
//!
//! `BurnDetector` wraps any `BurnModel` as an [`ObjectDetector`], turning a
//! frame's HWC `u8` pixels into a normalised `[1, C, H, W]` tensor and the
//! model's class ids into COCO labels.
//!
//! # Example
//!
//! ```ignore
//! use subject_pose_rs::integration::{BurnDetector, BurnModel, RawDetection};
//! use burn::backend::NdArray;
//!
//! struct MyRcnn { /* ... */ }
//!
//! impl BurnModel<NdArray> for MyRcnn {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<RawDetection> {
//!         // Run inference
//!     }
//! }
//!
//! let detector = BurnDetector::new(MyRcnn::load("rcnn.bin"), Default::default());
//! ```

use super::{DetectionBuilder, Frame, ObjectDetector, RawDetections};
use burn::prelude::*;
use burn::tensor::Tensor;

/// Error type for Burn detection failures.
#[derive(Debug, Clone)]
pub enum BurnDetectorError {
    /// Frame has no pixel data (a replayed or placeholder frame).
    MissingPixels { frame: usize },
    /// Frame size or channel count differs from the model input.
    InvalidInputDimensions {
        expected: (u32, u32, u32),
        got: (u32, u32, u32),
    },
    /// Model inference failed.
    InferenceError(String),
}

impl std::fmt::Display for BurnDetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPixels { frame } => write!(f, "Frame {} carries no pixels", frame),
            Self::InvalidInputDimensions { expected, got } => {
                write!(
                    f,
                    "Invalid input dimensions: expected {:?}, got {:?}",
                    expected, got
                )
            }
            Self::InferenceError(msg) => write!(f, "Inference error: {}", msg),
        }
    }
}

impl std::error::Error for BurnDetectorError {}

/// One detection as emitted by the model.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Bounding box: [x1, y1, x2, y2] or [cx, cy, w, h] depending on model
    pub bbox: [f32; 4],
    pub score: f32,
    /// COCO class id
    pub class_id: usize,
}

/// Trait for Burn-based detection models.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Forward pass on a `[batch, channels, height, width]` tensor, returning
    /// detections sorted by score, highest first.
    fn forward(&self, input: Tensor<B, 4>) -> Vec<RawDetection>;

    /// Expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32);

    /// Whether bbox output is XYWH rather than TLBR.
    fn bbox_is_xywh(&self) -> bool {
        false
    }
}

pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    /// HWC `u8` pixels to a `[1, C, H, W]` tensor scaled to [0, 1].
    pub fn preprocess(&self, frame: &Frame) -> Result<Tensor<B, 4>, BurnDetectorError> {
        if !frame.has_pixels() {
            return Err(BurnDetectorError::MissingPixels { frame: frame.index });
        }
        let (height, width, channels) = frame.pixels.dim();
        let expected = self.model.input_size();
        let got = (channels as u32, height as u32, width as u32);
        if got != expected {
            return Err(BurnDetectorError::InvalidInputDimensions { expected, got });
        }

        let chw = frame.pixels.view().permuted_axes([2, 0, 1]);
        let data: Vec<f32> = chw.iter().map(|&x| x as f32 / 255.0).collect();

        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([1, channels, height, width]))
    }

    fn postprocess(&self, raw_detections: Vec<RawDetection>) -> RawDetections {
        raw_detections
            .into_iter()
            .fold(DetectionBuilder::new(), |builder, d| {
                let label = super::coco_category_name(d.class_id);
                let [a, b, c, e] = d.bbox;
                if self.model.bbox_is_xywh() {
                    builder.xywh(label, a, b, c, e, d.score)
                } else {
                    builder.tlbr(label, d.bbox, d.score)
                }
            })
            .build()
    }
}

impl<B: Backend, M: BurnModel<B>> ObjectDetector for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error> {
        let tensor = self.preprocess(frame)?;
        let raw_detections = self.model.forward(tensor);
        Ok(self.postprocess(raw_detections))
    }
}
