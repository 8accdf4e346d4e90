//! Decode per-joint heatmaps into frame coordinates.
//!
//! Follows the usual top-down pose decoding: take the arg-max of each
//! heatmap as the joint location and its value as the confidence, nudge the
//! location a quarter pixel toward the higher neighbour, then undo the crop
//! transform described by the subject's center/scale.

use ndarray::ArrayView3;

use crate::integration::pose::PoseEstimate;
use crate::pipeline::CenterScale;

fn quarter_step(diff: f32) -> f32 {
    if diff > 0.0 {
        0.25
    } else if diff < 0.0 {
        -0.25
    } else {
        0.0
    }
}

/// Decode `(joints, height, width)` heatmaps taken from the crop around `target`.
///
/// Joints whose peak is not positive report `(0, 0)` in heatmap space, which
/// maps to the crop's top-left corner, with their (non-positive) peak as
/// confidence.
pub fn decode_heatmaps(
    heatmaps: ArrayView3<f32>,
    target: &CenterScale,
    pixel_std: f32,
) -> PoseEstimate {
    let (num_joints, hm_height, hm_width) = heatmaps.dim();
    let mut preds = Vec::with_capacity(num_joints);
    let mut confidences = Vec::with_capacity(num_joints);

    if hm_height == 0 || hm_width == 0 {
        return PoseEstimate::empty();
    }

    // the crop warp is a similarity keyed on width, so one factor serves both axes
    let factor = target.scale[0] * pixel_std / hm_width as f32;
    let (half_w, half_h) = (hm_width as f32 * 0.5, hm_height as f32 * 0.5);

    for heatmap in heatmaps.outer_iter() {
        let mut best = (0usize, 0usize);
        let mut max_val = f32::NEG_INFINITY;
        for ((y, x), &v) in heatmap.indexed_iter() {
            if v > max_val {
                max_val = v;
                best = (y, x);
            }
        }

        let (mut px, mut py) = if max_val > 0.0 {
            (best.1 as f32, best.0 as f32)
        } else {
            (0.0, 0.0)
        };

        let (ix, iy) = ((px + 0.5).floor() as usize, (py + 0.5).floor() as usize);
        if ix > 1 && ix < hm_width - 1 && iy > 1 && iy < hm_height - 1 {
            px += quarter_step(heatmap[[iy, ix + 1]] - heatmap[[iy, ix - 1]]);
            py += quarter_step(heatmap[[iy + 1, ix]] - heatmap[[iy - 1, ix]]);
        }

        let x = target.center[0] + (px - half_w) * factor;
        let y = target.center[1] + (py - half_h) * factor;
        preds.push([x, y]);
        confidences.push(max_val);
    }

    PoseEstimate::new(preds, confidences)
}
