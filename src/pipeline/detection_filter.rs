//! Reduce raw detector output to the confident person boxes the tracker consumes.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::integration::RawDetections;
use crate::tracker::PersonBox;

/// Default score a detection must exceed on the subject-tracking path.
pub const DEFAULT_THRESHOLD: f32 = 0.95;

/// How the filter treats the detector's score ordering.
///
/// Truncation keeps everything up to the last score above the threshold,
/// which is only correct when scores are sorted descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreOrder {
    /// Sort by score before truncating; non-finite scores are dropped.
    #[default]
    Sort,
    /// Fail the run if scores are not already non-increasing.
    Validate,
    /// Use detector order as-is.
    Trust,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    threshold: f32,
    person_label: String,
    score_order: ScoreOrder,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DetectionFilter {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            person_label: "person".to_string(),
            score_order: ScoreOrder::default(),
        }
    }

    pub fn with_person_label(mut self, label: impl Into<String>) -> Self {
        self.person_label = label.into();
        self
    }

    pub fn with_score_order(mut self, order: ScoreOrder) -> Self {
        self.score_order = order;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Person boxes scoring above the threshold, highest score first.
    /// Boxes with a non-finite corner or a non-positive side are dropped.
    ///
    /// An empty result is normal (nothing confident enough this frame); only
    /// malformed input or, under [`ScoreOrder::Validate`], unsorted scores
    /// are errors.
    pub fn filter(&self, raw: &RawDetections) -> PipelineResult<Vec<PersonBox>> {
        if raw.len().is_none() {
            return Err(PipelineError::MalformedDetections {
                labels: raw.labels.len(),
                boxes: raw.boxes.len(),
                scores: raw.scores.len(),
            });
        }

        let scores = &raw.scores;
        let max_score = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if scores.is_empty() || max_score < self.threshold {
            return Ok(Vec::new());
        }

        let order = self.ordered_indices(scores)?;

        // last position still above threshold; everything after it is dropped
        let Some(cutoff) = order.iter().rposition(|&i| scores[i] > self.threshold) else {
            return Ok(Vec::new());
        };

        Ok(order[..=cutoff]
            .iter()
            .filter(|&&i| raw.labels[i] == self.person_label)
            .map(|&i| {
                let [x1, y1, x2, y2] = raw.boxes[i];
                PersonBox::new(x1, y1, x2, y2, scores[i])
            })
            .filter(|person| person.bbox.is_well_formed())
            .collect())
    }

    fn ordered_indices(&self, scores: &[f32]) -> PipelineResult<Vec<usize>> {
        match self.score_order {
            ScoreOrder::Sort => {
                let mut order: Vec<usize> = (0..scores.len())
                    .filter(|&i| scores[i].is_finite())
                    .collect();
                // stable, so equal scores keep detector order
                order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
                Ok(order)
            }
            ScoreOrder::Validate => {
                if let Some(pos) = scores.windows(2).position(|w| !(w[0] >= w[1])) {
                    return Err(PipelineError::UnsortedScores { index: pos + 1 });
                }
                Ok((0..scores.len()).collect())
            }
            ScoreOrder::Trust => Ok((0..scores.len()).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::DetectionBuilder;

    #[test]
    fn test_keeps_entries_above_threshold() {
        let raw = DetectionBuilder::new()
            .person(0.0, 0.0, 10.0, 10.0, 0.97)
            .person(20.0, 20.0, 30.0, 30.0, 0.96)
            .person(40.0, 40.0, 50.0, 50.0, 0.50)
            .build();
        let boxes = DetectionFilter::new(0.95).filter(&raw).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].score, 0.97);
        assert_eq!(boxes[1].to_row(), [20.0, 20.0, 30.0, 30.0, 0.96]);
    }

    #[test]
    fn test_empty_or_weak_detections_yield_nothing() {
        let filter = DetectionFilter::default();
        assert!(filter.filter(&RawDetections::empty()).unwrap().is_empty());

        let weak = DetectionBuilder::new()
            .person(0.0, 0.0, 10.0, 10.0, 0.9)
            .person(0.0, 0.0, 10.0, 10.0, 0.2)
            .build();
        assert!(filter.filter(&weak).unwrap().is_empty());
    }

    #[test]
    fn test_score_equal_to_threshold_is_not_kept() {
        let raw = DetectionBuilder::new()
            .person(0.0, 0.0, 10.0, 10.0, 0.95)
            .build();
        assert!(DetectionFilter::new(0.95).filter(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_non_person_labels_are_dropped() {
        let raw = DetectionBuilder::new()
            .tlbr("dog", [0.0, 0.0, 5.0, 5.0], 0.99)
            .person(1.0, 1.0, 9.0, 9.0, 0.98)
            .tlbr("car", [0.0, 0.0, 50.0, 50.0], 0.97)
            .build();
        let boxes = DetectionFilter::default().filter(&raw).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].score, 0.98);
    }

    #[test]
    fn test_unsorted_scores_under_each_policy() {
        let raw = DetectionBuilder::new()
            .person(0.0, 0.0, 10.0, 10.0, 0.50)
            .person(20.0, 20.0, 30.0, 30.0, 0.99)
            .person(40.0, 40.0, 50.0, 50.0, 0.20)
            .build();

        let sorted = DetectionFilter::new(0.95).filter(&raw).unwrap();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].score, 0.99);

        let err = DetectionFilter::new(0.95)
            .with_score_order(ScoreOrder::Validate)
            .filter(&raw)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsortedScores { index: 1 }));

        // detector order: truncation keeps the low-scoring box ahead of the cutoff
        let trusted = DetectionFilter::new(0.95)
            .with_score_order(ScoreOrder::Trust)
            .filter(&raw)
            .unwrap();
        assert_eq!(trusted.len(), 2);
        assert_eq!(trusted[0].score, 0.50);
    }

    #[test]
    fn test_non_finite_scores_are_ignored_when_sorting() {
        let raw = DetectionBuilder::new()
            .person(0.0, 0.0, 10.0, 10.0, f32::NAN)
            .person(20.0, 20.0, 30.0, 30.0, 0.99)
            .build();
        let boxes = DetectionFilter::default().filter(&raw).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].score, 0.99);
    }

    #[test]
    fn test_malformed_boxes_are_dropped() {
        let raw = DetectionBuilder::new()
            .person(f32::NAN, 0.0, 10.0, 10.0, 0.99)
            .person(100.0, 50.0, 180.0, 250.0, 0.98)
            .person(20.0, 20.0, 20.0, 40.0, 0.97)
            .person(40.0, 40.0, 30.0, 50.0, 0.96)
            .person(0.0, 0.0, f32::INFINITY, 10.0, 0.96)
            .build();
        let boxes = DetectionFilter::default().filter(&raw).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].to_row(), [100.0, 50.0, 180.0, 250.0, 0.98]);
    }

    #[test]
    fn test_non_parallel_arrays_are_fatal() {
        let raw = RawDetections::new(vec!["person".into()], vec![], vec![0.99]);
        assert!(matches!(
            DetectionFilter::default().filter(&raw),
            Err(PipelineError::MalformedDetections {
                labels: 1,
                boxes: 0,
                scores: 1
            })
        ));
    }

    #[test]
    fn test_custom_person_label() {
        let raw = DetectionBuilder::new().class_id(1, [0.0, 0.0, 1.0, 1.0], 0.99).build();
        assert_eq!(DetectionFilter::default().filter(&raw).unwrap().len(), 1);
        let filter = DetectionFilter::default().with_person_label("pedestrian");
        assert!(filter.filter(&raw).unwrap().is_empty());
    }
}
