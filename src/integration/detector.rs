//! Trait for object detection inference backends.

use crate::integration::Frame;

/// COCO category names indexed by the class ids torchvision-style detectors emit.
pub const COCO_CATEGORY_NAMES: [&str; 91] = [
    "__background__", "person", "bicycle", "car", "motorcycle", "airplane", "bus",
    "train", "truck", "boat", "traffic light", "fire hydrant", "N/A", "stop sign",
    "parking meter", "bench", "bird", "cat", "dog", "horse", "sheep", "cow",
    "elephant", "bear", "zebra", "giraffe", "N/A", "backpack", "umbrella", "N/A", "N/A",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "N/A", "wine glass", "cup", "fork", "knife", "spoon", "bowl",
    "banana", "apple", "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza",
    "donut", "cake", "chair", "couch", "potted plant", "bed", "N/A", "dining table",
    "N/A", "N/A", "toilet", "N/A", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "N/A", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Category name for a COCO class id; unknown ids map to `"N/A"`.
pub fn coco_category_name(class_id: usize) -> &'static str {
    COCO_CATEGORY_NAMES.get(class_id).copied().unwrap_or("N/A")
}

/// Raw detector output for one frame, as parallel arrays.
///
/// Boxes are `[x1, y1, x2, y2]` in frame pixels. Detectors are expected to
/// emit scores sorted descending; see [`crate::pipeline::ScoreOrder`] for how
/// the filter treats detectors that don't.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    pub labels: Vec<String>,
    pub boxes: Vec<[f32; 4]>,
    pub scores: Vec<f32>,
}

impl RawDetections {
    pub fn new(labels: Vec<String>, boxes: Vec<[f32; 4]>, scores: Vec<f32>) -> Self {
        Self {
            labels,
            boxes,
            scores,
        }
    }

    /// Build from numeric COCO class ids.
    pub fn from_class_ids(class_ids: &[usize], boxes: Vec<[f32; 4]>, scores: Vec<f32>) -> Self {
        let labels = class_ids
            .iter()
            .map(|&id| coco_category_name(id).to_string())
            .collect();
        Self::new(labels, boxes, scores)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of detections, or `None` when the arrays are not parallel.
    pub fn len(&self) -> Option<usize> {
        let n = self.labels.len();
        (self.boxes.len() == n && self.scores.len() == n).then_some(n)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.boxes.is_empty() && self.scores.is_empty()
    }
}

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the pipeline.
///
/// # Example
///
/// ```ignore
/// use subject_pose_rs::{Frame, ObjectDetector, RawDetections};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl ObjectDetector for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error> {
///         // Run inference and return labels, boxes and scores
///         Ok(RawDetections::empty())
///     }
/// }
/// ```
pub trait ObjectDetector {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on one frame.
    fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error>;
}

impl<D: ObjectDetector + ?Sized> ObjectDetector for &mut D {
    type Error = D::Error;

    fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error> {
        (**self).detect(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_names() {
        assert_eq!(coco_category_name(1), "person");
        assert_eq!(coco_category_name(3), "car");
        assert_eq!(coco_category_name(90), "toothbrush");
        assert_eq!(coco_category_name(1000), "N/A");
    }

    #[test]
    fn test_from_class_ids() {
        let raw = RawDetections::from_class_ids(
            &[1, 18],
            vec![[0.0, 0.0, 1.0, 1.0], [2.0, 2.0, 3.0, 3.0]],
            vec![0.9, 0.8],
        );
        assert_eq!(raw.labels, vec!["person".to_string(), "dog".to_string()]);
        assert_eq!(raw.len(), Some(2));
    }

    #[test]
    fn test_len_detects_non_parallel_arrays() {
        let raw = RawDetections::new(vec!["person".into()], vec![], vec![0.9]);
        assert_eq!(raw.len(), None);
        assert!(!raw.is_empty());
        assert_eq!(RawDetections::empty().len(), Some(0));
    }
}
