//! A single Kalman-filtered identity track and the box it reports.

use crate::tracker::kalman_filter::{KalmanFilter, Measurement, StateCovariance, StateVector};
use crate::tracker::matching::PersonBox;
use crate::tracker::rect::Rect;

/// Tracker-assigned identity, stable for one physical object across frames.
pub type TrackId = u64;

/// Tracker output row `[x1, y1, x2, y2, score, identity]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// Score of the detection that refreshed this track
    pub score: f32,
    pub identity: TrackId,
}

impl TrackedBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, identity: TrackId) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score,
            identity,
        }
    }

    /// `(x2 - x1) * (y2 - y1)`, used to pick the subject on the first frame.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_tlbr(self.x1, self.y1, self.x2, self.y2)
    }

    /// Corner pair `[(x1, y1), (x2, y2)]`.
    pub fn corners(&self) -> [(f32, f32); 2] {
        [(self.x1, self.y1), (self.x2, self.y2)]
    }
}

fn measurement_of(rect: &Rect) -> Measurement {
    let [cx, cy, a, h] = rect.to_xyah();
    Measurement::from([cx as f64, cy as f64, a as f64, h as f64])
}

/// One object followed by the SORT tracker.
#[derive(Debug, Clone)]
pub struct Track {
    pub identity: TrackId,
    /// Score of the last associated detection
    pub score: f32,
    /// Total number of associated detections
    pub hits: u32,
    /// Consecutive frames with an associated detection
    pub hit_streak: u32,
    /// Frames since the track was created
    pub age: u32,
    /// Frames since the last associated detection
    pub time_since_update: u32,
    mean: StateVector,
    covariance: StateCovariance,
}

impl Track {
    pub fn new(identity: TrackId, detection: &PersonBox, kalman_filter: &KalmanFilter) -> Self {
        let (mean, covariance) = kalman_filter.initiate(&measurement_of(&detection.bbox));
        Self {
            identity,
            score: detection.score,
            // the creating detection counts as the first hit
            hits: 1,
            hit_streak: 1,
            age: 0,
            time_since_update: 0,
            mean,
            covariance,
        }
    }

    /// Current box estimate.
    pub fn rect(&self) -> Rect {
        Rect::from_xyah(
            self.mean[0] as f32,
            self.mean[1] as f32,
            self.mean[2] as f32,
            self.mean[3] as f32,
        )
    }

    /// Advance the state one frame and return the predicted box.
    pub fn predict(&mut self, kalman_filter: &KalmanFilter) -> Rect {
        // keep the height from collapsing through zero
        if self.mean[3] + self.mean[7] <= 0.0 {
            self.mean[7] = 0.0;
        }
        let (mean, covariance) = kalman_filter.predict(&self.mean, &self.covariance);
        self.mean = mean;
        self.covariance = covariance;

        self.age += 1;
        if self.time_since_update > 0 {
            self.hit_streak = 0;
        }
        self.time_since_update += 1;
        self.rect()
    }

    /// Correct the state with an associated detection.
    pub fn update(&mut self, detection: &PersonBox, kalman_filter: &KalmanFilter) {
        if let Some((mean, covariance)) =
            kalman_filter.update(&self.mean, &self.covariance, &measurement_of(&detection.bbox))
        {
            self.mean = mean;
            self.covariance = covariance;
        }
        self.time_since_update = 0;
        self.hits += 1;
        self.hit_streak += 1;
        self.score = detection.score;
    }

    pub fn to_tracked_box(&self) -> TrackedBox {
        let [x1, y1, x2, y2] = self.rect().to_tlbr();
        TrackedBox::new(x1, y1, x2, y2, self.score, self.identity)
    }
}
