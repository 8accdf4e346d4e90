//! Builder for assembling `RawDetections` one detection at a time.

use crate::integration::detector::{RawDetections, coco_category_name};

/// Builder for `RawDetections`, accepting boxes in several common formats.
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    detections: RawDetections,
}

impl DetectionBuilder {
    /// Create a new, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detection with a TLBR box (x1, y1, x2, y2).
    pub fn tlbr(mut self, label: impl Into<String>, box_tlbr: [f32; 4], score: f32) -> Self {
        self.detections.labels.push(label.into());
        self.detections.boxes.push(box_tlbr);
        self.detections.scores.push(score);
        self
    }

    /// Add a detection with an XYWH box (center_x, center_y, width, height).
    pub fn xywh(
        self,
        label: impl Into<String>,
        cx: f32,
        cy: f32,
        w: f32,
        h: f32,
        score: f32,
    ) -> Self {
        self.tlbr(
            label,
            [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            score,
        )
    }

    /// Add a detection labelled by COCO class id.
    pub fn class_id(self, class_id: usize, box_tlbr: [f32; 4], score: f32) -> Self {
        self.tlbr(coco_category_name(class_id), box_tlbr, score)
    }

    /// Shorthand for a `"person"` detection.
    pub fn person(self, x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        self.tlbr("person", [x1, y1, x2, y2], score)
    }

    /// Build the final `RawDetections`.
    pub fn build(self) -> RawDetections {
        self.detections
    }
}
