//! Tracker trait the pipeline drives once per frame.

use std::convert::Infallible;

use crate::tracker::{PersonBox, SortTracker, TrackedBox};

/// Assigns persistent identities to per-frame person boxes.
///
/// Must be called on every frame, with an empty slice when nothing was
/// detected, so occlusion ageing stays correct. Returns only the boxes
/// confirmed on this frame.
pub trait IdentityTracker {
    type Error: std::error::Error + Send + Sync + 'static;

    fn update(&mut self, detections: &[PersonBox]) -> Result<Vec<TrackedBox>, Self::Error>;
}

impl IdentityTracker for SortTracker {
    type Error = Infallible;

    fn update(&mut self, detections: &[PersonBox]) -> Result<Vec<TrackedBox>, Self::Error> {
        Ok(SortTracker::update(self, detections))
    }
}

impl<T: IdentityTracker + ?Sized> IdentityTracker for &mut T {
    type Error = T::Error;

    fn update(&mut self, detections: &[PersonBox]) -> Result<Vec<TrackedBox>, Self::Error> {
        (**self).update(detections)
    }
}
