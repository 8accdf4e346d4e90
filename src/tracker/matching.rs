//! IoU association between predicted tracks and person detections.

use crate::tracker::rect::Rect;
use ndarray::Array2;

/// Tracker input: one person box `[x1, y1, x2, y2, score]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonBox {
    /// Bounding box, built from TLBR corners
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
}

impl PersonBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }

    /// The `[x1, y1, x2, y2, score]` row handed to SORT-style trackers.
    pub fn to_row(&self) -> [f32; 5] {
        let [x1, y1, x2, y2] = self.bbox.to_tlbr();
        [x1, y1, x2, y2, self.score]
    }
}

/// Compute IoU distance matrix between tracks and detections.
pub fn iou_distance(track_boxes: &[Rect], det_boxes: &[Rect]) -> Array2<f32> {
    let mut dists = Array2::zeros((track_boxes.len(), det_boxes.len()));
    for (i, t) in track_boxes.iter().enumerate() {
        for (j, d) in det_boxes.iter().enumerate() {
            dists[[i, j]] = 1.0 - t.iou(d);
        }
    }
    dists
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Minimum-cost assignment via LAPJV; pairs costing more than `thresh` stay unmatched.
pub fn linear_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    // lapjv wants a square matrix
    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::from_elem((size, size), 1e6);
    for ((i, j), &cost) in cost_matrix.indexed_iter() {
        padded[[i, j]] = cost as f64;
    }

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask = vec![true; num_cols];

    match lapjv::lapjv(&padded) {
        Ok((row_to_col, _)) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
                if col_idx < num_cols && cost_matrix[[row_idx, col_idx]] <= thresh {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                } else {
                    unmatched_tracks.push(row_idx);
                }
            }
        }
        Err(_) => {
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}

/// SORT association: match predicted boxes to detections when IoU >= `iou_threshold`.
///
/// Rows of the result index `predicted`, columns index `detections`.
pub fn associate(
    predicted: &[Rect],
    detections: &[PersonBox],
    iou_threshold: f32,
) -> AssignmentResult {
    let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
    let dists = iou_distance(predicted, &det_rects);
    linear_assignment(&dists, 1.0 - iou_threshold)
}
