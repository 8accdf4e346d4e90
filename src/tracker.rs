mod kalman_filter;
mod matching;
mod rect;
mod sort_tracker;
mod track;

pub use kalman_filter::KalmanFilter;
pub use matching::{AssignmentResult, PersonBox, associate, iou_distance, linear_assignment};
pub use rect::Rect;
pub use sort_tracker::{SortConfig, SortTracker};
pub use track::{Track, TrackId, TrackedBox};
