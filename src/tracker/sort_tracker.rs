//! SORT multi-object tracker: Kalman prediction plus IoU assignment.

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, PersonBox};
use crate::tracker::rect::Rect;
use crate::tracker::track::{Track, TrackId, TrackedBox};

/// Configuration for the SortTracker.
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Frames a track may go unmatched before it is dropped
    pub max_age: u32,
    /// Consecutive hits before a track is reported (waived for the first frames)
    pub min_hits: u32,
    /// Minimum IoU for a detection to continue a track
    pub iou_threshold: f32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_age: 3,
            min_hits: 1,
            iou_threshold: 0.3,
        }
    }
}

pub struct SortTracker {
    tracks: Vec<Track>,
    frame_count: u32,
    next_identity: TrackId,
    config: SortConfig,
    kalman_filter: KalmanFilter,
}

impl SortTracker {
    pub fn new(config: SortConfig) -> Self {
        Self {
            tracks: Vec::new(),
            frame_count: 0,
            next_identity: 1,
            config,
            kalman_filter: KalmanFilter::default(),
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Number of `update` calls so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Tracks still alive, including those coasting through a miss.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Feed one frame of person boxes; call it every frame, with an empty
    /// slice when nothing was detected, so unmatched tracks age correctly.
    ///
    /// Returns the boxes of tracks matched on this frame.
    pub fn update(&mut self, detections: &[PersonBox]) -> Vec<TrackedBox> {
        self.frame_count += 1;

        // Step 1: Predict every track forward, dropping ones that blew up
        let mut predicted = Vec::with_capacity(self.tracks.len());
        self.tracks.retain_mut(|track| {
            let rect = track.predict(&self.kalman_filter);
            let finite = rect.to_tlbr().iter().all(|v| v.is_finite());
            if finite {
                predicted.push(rect);
            }
            finite
        });

        // Step 2: Associate predictions with detections
        let AssignmentResult {
            matches,
            unmatched_detections,
            ..
        } = matching::associate(&predicted, detections, self.config.iou_threshold);

        for (itrack, idet) in matches {
            self.tracks[itrack].update(&detections[idet], &self.kalman_filter);
        }

        // Step 3: Start tracks for new detections
        for idet in unmatched_detections {
            let track = Track::new(self.next_identity, &detections[idet], &self.kalman_filter);
            self.next_identity += 1;
            self.tracks.push(track);
        }

        // Step 4: Report confirmed tracks seen this frame, then expire stale ones
        let warming_up = self.frame_count <= self.config.min_hits;
        let output = self
            .tracks
            .iter()
            .filter(|t| {
                t.time_since_update == 0 && (t.hit_streak >= self.config.min_hits || warming_up)
            })
            .map(Track::to_tracked_box)
            .collect();

        let max_age = self.config.max_age;
        self.tracks.retain(|t| t.time_since_update <= max_age);

        output
    }

    /// Predicted boxes of all live tracks, without advancing state.
    pub fn current_boxes(&self) -> Vec<Rect> {
        self.tracks.iter().map(Track::rect).collect()
    }
}

impl Default for SortTracker {
    fn default() -> Self {
        Self::new(SortConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_start_at_one_per_tracker() {
        let mut a = SortTracker::default();
        let mut b = SortTracker::default();
        let det = [PersonBox::new(0.0, 0.0, 10.0, 20.0, 0.99)];
        assert_eq!(a.update(&det)[0].identity, 1);
        assert_eq!(b.update(&det)[0].identity, 1);
    }

    #[test]
    fn test_track_expires_after_max_age() {
        let mut tracker = SortTracker::new(SortConfig {
            max_age: 2,
            ..SortConfig::default()
        });
        let det = [PersonBox::new(0.0, 0.0, 10.0, 20.0, 0.99)];
        tracker.update(&det);
        assert_eq!(tracker.tracks().len(), 1);

        tracker.update(&[]);
        tracker.update(&[]);
        assert_eq!(tracker.tracks().len(), 1);
        tracker.update(&[]);
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn test_late_newcomer_reported_at_once_with_default_min_hits() {
        let mut tracker = SortTracker::default();
        tracker.update(&[]);
        tracker.update(&[]);
        let out = tracker.update(&[PersonBox::new(0.0, 0.0, 10.0, 20.0, 0.99)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].identity, 1);
    }

    #[test]
    fn test_min_hits_holds_back_new_tracks() {
        let mut tracker = SortTracker::new(SortConfig {
            min_hits: 3,
            ..SortConfig::default()
        });
        let subject = PersonBox::new(0.0, 0.0, 10.0, 20.0, 0.99);
        for _ in 0..4 {
            tracker.update(&[subject]);
        }

        // newcomer on frame 5 is only reported after three consecutive hits
        let newcomer = PersonBox::new(200.0, 200.0, 220.0, 260.0, 0.99);
        let out = tracker.update(&[subject, newcomer]);
        assert_eq!(out.len(), 1);
        let out = tracker.update(&[subject, newcomer]);
        assert_eq!(out.len(), 1);
        let out = tracker.update(&[subject, newcomer]);
        assert_eq!(out.len(), 2);
    }
}
