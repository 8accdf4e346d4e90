//! Frame loop: detect, filter, track, select, map, estimate, append.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::integration::{
    Frame, FrameSource, IdentityTracker, KeypointSink, ObjectDetector, PoseEstimator,
};
use crate::pipeline::center_scale::CenterScaleMapper;
use crate::pipeline::detection_filter::DetectionFilter;
use crate::pipeline::identity::{SubjectIdentity, select_subject};
use crate::pipeline::keypoints::{KeypointFrame, KeypointSequence, NUM_JOINTS};
use crate::tracker::{SortTracker, TrackedBox};

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No frame processed yet
    Init,
    SubjectUnresolved,
    SubjectLocked,
    /// Source exhausted or run cancelled
    Done,
    /// A fatal error stopped the run; the sequence is incomplete
    Failed,
}

/// What happened on one frame. Everything but `Pose` appends a zero-filled record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Pose,
    /// No person scored above the threshold
    NoDetections,
    /// People were detected but the tracker has not reported anyone yet
    SubjectUnresolved,
    /// The subject's identity was not among this frame's tracks
    SubjectMissing,
    /// The subject's box had a non-positive or non-finite side
    DegenerateBox,
    /// The pose estimator returned no joints
    EmptyPose,
}

impl FrameOutcome {
    pub fn is_populated(self) -> bool {
        self == Self::Pose
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub frames: usize,
    pub populated: usize,
    pub zero_filled: usize,
    pub subject: SubjectIdentity,
    pub cancelled: bool,
}

/// Drives the single-subject keypoint extraction over a stream of frames.
///
/// Exactly one [`KeypointFrame`] is appended per processed frame, so the
/// output stays index-aligned with the source video no matter how often
/// detection, tracking or pose estimation come up empty.
pub struct FramePipeline<D, T, P> {
    detector: D,
    tracker: T,
    pose: P,
    filter: DetectionFilter,
    mapper: CenterScaleMapper,
    subject: SubjectIdentity,
    sequence: KeypointSequence,
    last_index: Option<usize>,
    populated: usize,
    subject_visible: bool,
    cancelled: bool,
    done: bool,
    failed: bool,
    progress_interval: usize,
}

impl<D, P> FramePipeline<D, SortTracker, P>
where
    D: ObjectDetector,
    P: PoseEstimator,
{
    /// Pipeline with the bundled SORT tracker, configured from `config`.
    pub fn from_config(detector: D, pose: P, config: &PipelineConfig) -> Self {
        Self::new(detector, SortTracker::new(config.sort_config()), pose)
            .with_filter(config.detection_filter())
            .with_mapper(config.center_scale_mapper())
            .with_progress_interval(config.output.progress_interval)
    }
}

impl<D, T, P> FramePipeline<D, T, P>
where
    D: ObjectDetector,
    T: IdentityTracker,
    P: PoseEstimator,
{
    pub fn new(detector: D, tracker: T, pose: P) -> Self {
        Self {
            detector,
            tracker,
            pose,
            filter: DetectionFilter::default(),
            mapper: CenterScaleMapper::default(),
            subject: SubjectIdentity::Unresolved,
            sequence: KeypointSequence::new(),
            last_index: None,
            populated: 0,
            subject_visible: false,
            cancelled: false,
            done: false,
            failed: false,
            progress_interval: 1,
        }
    }

    pub fn with_filter(mut self, filter: DetectionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_mapper(mut self, mapper: CenterScaleMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Log progress every `interval` frames; 0 disables progress lines.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn subject(&self) -> SubjectIdentity {
        self.subject
    }

    pub fn state(&self) -> PipelineState {
        if self.failed {
            PipelineState::Failed
        } else if self.done {
            PipelineState::Done
        } else if self.last_index.is_none() {
            PipelineState::Init
        } else if self.subject.is_locked() {
            PipelineState::SubjectLocked
        } else {
            PipelineState::SubjectUnresolved
        }
    }

    pub fn sequence(&self) -> &KeypointSequence {
        &self.sequence
    }

    pub fn into_sequence(self) -> KeypointSequence {
        self.sequence
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn pose_estimator(&self) -> &P {
        &self.pose
    }

    pub fn frames_processed(&self) -> usize {
        self.sequence.len()
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            frames: self.sequence.len(),
            populated: self.populated,
            zero_filled: self.sequence.len() - self.populated,
            subject: self.subject,
            cancelled: self.cancelled,
        }
    }

    fn ensure_open(&self) -> PipelineResult<()> {
        if self.failed {
            Err(PipelineError::Aborted)
        } else if self.done {
            Err(PipelineError::Finished)
        } else {
            Ok(())
        }
    }

    /// Process one frame and append its keypoint record.
    ///
    /// Soft failures come back as a zero-filling [`FrameOutcome`]; errors
    /// are reserved for collaborator failures and contract violations. Any
    /// error leaves the pipeline [`PipelineState::Failed`], and every later
    /// call is refused with [`PipelineError::Aborted`].
    pub fn process_frame(&mut self, frame: &Frame) -> PipelineResult<FrameOutcome> {
        self.ensure_open()?;
        let result = self.advance(frame);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn advance(&mut self, frame: &Frame) -> PipelineResult<FrameOutcome> {
        if let Some(previous) = self.last_index {
            if frame.index <= previous {
                return Err(PipelineError::FrameOutOfOrder {
                    previous,
                    got: frame.index,
                });
            }
        }
        self.last_index = Some(frame.index);

        let raw = self
            .detector
            .detect(frame)
            .map_err(|e| PipelineError::Detector {
                frame: frame.index,
                source: Box::new(e),
            })?;
        let person_boxes = self.filter.filter(&raw)?;

        // the tracker sees every frame, even empty ones, so its ages stay right
        let tracked = self
            .tracker
            .update(&person_boxes)
            .map_err(|e| PipelineError::Tracker {
                frame: frame.index,
                source: Box::new(e),
            })?;

        let previous = self.subject;
        let selection = select_subject(&tracked, self.subject);
        self.subject = selection.subject;
        if previous != self.subject {
            info!("Subject {} locked on frame {}", self.subject, frame.index);
        }
        let visible = selection.subject_box.is_some();
        if previous.is_locked() && visible != self.subject_visible {
            if visible {
                info!("Subject {} reacquired on frame {}", self.subject, frame.index);
            } else {
                warn!("Subject {} lost on frame {}", self.subject, frame.index);
            }
        }
        self.subject_visible = visible;

        let (keypoints, outcome) = match selection.subject_box {
            Some(subject_box) => self.estimate(frame, &subject_box)?,
            None => {
                let outcome = if person_boxes.is_empty() {
                    FrameOutcome::NoDetections
                } else if self.subject.is_locked() {
                    FrameOutcome::SubjectMissing
                } else {
                    FrameOutcome::SubjectUnresolved
                };
                (KeypointFrame::zeroed(), outcome)
            }
        };

        self.sequence.push(keypoints);
        if outcome.is_populated() {
            self.populated += 1;
        }

        let processed = self.sequence.len();
        debug!(
            frame = frame.index,
            persons = person_boxes.len(),
            tracked = tracked.len(),
            ?outcome,
            "frame processed"
        );
        if self.progress_interval > 0 && processed % self.progress_interval == 0 {
            info!("Processing frame {}", processed);
        }

        Ok(outcome)
    }

    fn estimate(
        &mut self,
        frame: &Frame,
        subject_box: &TrackedBox,
    ) -> PipelineResult<(KeypointFrame, FrameOutcome)> {
        let rect = subject_box.rect();
        if !rect.is_well_formed() {
            warn!(
                "Degenerate subject box {:?} on frame {}, zero-filling",
                subject_box.corners(),
                frame.index
            );
            return Ok((KeypointFrame::zeroed(), FrameOutcome::DegenerateBox));
        }

        let target = self.mapper.map(&rect);
        let estimate = self
            .pose
            .estimate(frame, &target)
            .map_err(|e| PipelineError::Pose {
                frame: frame.index,
                source: Box::new(e),
            })?;

        let shape_error = || PipelineError::PoseShapeMismatch {
            preds: estimate.preds.len(),
            confidences: estimate.confidences.len(),
            expected: NUM_JOINTS,
        };
        let joints = estimate.joints().ok_or_else(shape_error)?;
        if joints.is_empty() {
            return Ok((KeypointFrame::zeroed(), FrameOutcome::EmptyPose));
        }
        let keypoints = KeypointFrame::from_joints(&joints).ok_or_else(shape_error)?;
        Ok((keypoints, FrameOutcome::Pose))
    }

    /// Process frames until the source is exhausted.
    pub fn run<S: FrameSource>(&mut self, source: S) -> PipelineResult<RunReport> {
        self.run_until(source, &AtomicBool::new(false))
    }

    /// Like [`FramePipeline::run`], but stops between frames once `cancel` is set.
    pub fn run_until<S: FrameSource>(
        &mut self,
        mut source: S,
        cancel: &AtomicBool,
    ) -> PipelineResult<RunReport> {
        self.ensure_open()?;
        info!(
            "Tracking subject (threshold {}, pose input {}x{})",
            self.filter.threshold(),
            self.mapper.input().width,
            self.mapper.input().height
        );

        loop {
            if cancel.load(Ordering::Relaxed) {
                warn!("Run cancelled after {} frames", self.sequence.len());
                self.cancelled = true;
                break;
            }
            let frame = match source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    self.failed = true;
                    return Err(PipelineError::Source(Box::new(e)));
                }
            };
            let Some(frame) = frame else {
                info!("Video ended");
                break;
            };
            self.process_frame(&frame)?;
        }
        self.done = true;

        let report = self.report();
        info!(
            "{} frames, {} with pose, {} zero-filled, subject {}",
            report.frames, report.populated, report.zero_filled, report.subject
        );
        Ok(report)
    }

    /// Hand the accumulated sequence to a sink.
    pub fn save<K: KeypointSink>(&self, mut sink: K) -> PipelineResult<()> {
        sink.save(&self.sequence)
            .map_err(|e| PipelineError::Sink(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{IterSource, PoseEstimate, RawDetections};
    use crate::pipeline::{CenterScale, Joint};
    use crate::tracker::PersonBox;
    use std::convert::Infallible;

    /// Detector reporting a fixed person box on chosen frames.
    struct ScriptedDetector {
        hits: Vec<bool>,
    }

    impl ObjectDetector for ScriptedDetector {
        type Error = Infallible;

        fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error> {
            if self.hits.get(frame.index).copied().unwrap_or(false) {
                Ok(crate::integration::DetectionBuilder::new()
                    .person(10.0, 10.0, 60.0, 110.0, 0.99)
                    .build())
            } else {
                Ok(RawDetections::empty())
            }
        }
    }

    /// Tracker that tags every box with identity 1.
    struct EchoTracker;

    impl IdentityTracker for EchoTracker {
        type Error = Infallible;

        fn update(&mut self, detections: &[PersonBox]) -> Result<Vec<TrackedBox>, Self::Error> {
            Ok(detections
                .iter()
                .map(|d| {
                    let [x1, y1, x2, y2] = d.bbox.to_tlbr();
                    TrackedBox::new(x1, y1, x2, y2, d.score, 1)
                })
                .collect())
        }
    }

    struct FixedPose {
        joints: usize,
    }

    impl PoseEstimator for FixedPose {
        type Error = Infallible;

        fn estimate(
            &mut self,
            _frame: &Frame,
            target: &CenterScale,
        ) -> Result<PoseEstimate, Self::Error> {
            let joints = vec![Joint::new(target.center[0], target.center[1], 0.8); self.joints];
            Ok(PoseEstimate::from_joints(&joints))
        }
    }

    fn pipeline(
        hits: Vec<bool>,
        joints: usize,
    ) -> FramePipeline<ScriptedDetector, EchoTracker, FixedPose> {
        FramePipeline::new(ScriptedDetector { hits }, EchoTracker, FixedPose { joints })
            .with_progress_interval(0)
    }

    #[test]
    fn test_state_machine() {
        let mut p = pipeline(vec![false, true], NUM_JOINTS);
        assert_eq!(p.state(), PipelineState::Init);
        p.process_frame(&Frame::placeholder(0, 100, 100)).unwrap();
        assert_eq!(p.state(), PipelineState::SubjectUnresolved);
        p.process_frame(&Frame::placeholder(1, 100, 100)).unwrap();
        assert_eq!(p.state(), PipelineState::SubjectLocked);
        p.run(IterSource::placeholders(0, 100, 100)).unwrap();
        assert_eq!(p.state(), PipelineState::Done);
        assert!(matches!(
            p.process_frame(&Frame::placeholder(2, 100, 100)),
            Err(PipelineError::Finished)
        ));
    }

    #[test]
    fn test_pose_lands_at_box_center() {
        let mut p = pipeline(vec![true], NUM_JOINTS);
        let outcome = p.process_frame(&Frame::placeholder(0, 100, 100)).unwrap();
        assert_eq!(outcome, FrameOutcome::Pose);
        let frame = p.sequence().get(0).unwrap();
        assert_eq!(frame.joints[0], Joint::new(35.0, 60.0, 0.8));
    }

    #[test]
    fn test_empty_pose_is_zero_filled() {
        let mut p = pipeline(vec![true], 0);
        let outcome = p.process_frame(&Frame::placeholder(0, 100, 100)).unwrap();
        assert_eq!(outcome, FrameOutcome::EmptyPose);
        assert!(p.sequence().get(0).unwrap().is_zero_filled());
    }

    #[test]
    fn test_wrong_joint_count_is_fatal() {
        let mut p = pipeline(vec![true], 5);
        let err = p.process_frame(&Frame::placeholder(0, 100, 100)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PoseShapeMismatch {
                preds: 5,
                confidences: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_order_frames_are_rejected() {
        let mut p = pipeline(vec![], NUM_JOINTS);
        p.process_frame(&Frame::placeholder(4, 100, 100)).unwrap();
        let err = p.process_frame(&Frame::placeholder(4, 100, 100)).unwrap_err();
        assert!(matches!(err, PipelineError::FrameOutOfOrder { previous: 4, got: 4 }));
        assert_eq!(p.frames_processed(), 1);
        assert_eq!(p.state(), PipelineState::Failed);
    }

    /// Fails once, on the chosen frame.
    struct FlakyDetector {
        fail_at: usize,
    }

    impl ObjectDetector for FlakyDetector {
        type Error = std::io::Error;

        fn detect(&mut self, frame: &Frame) -> Result<RawDetections, Self::Error> {
            if frame.index == self.fail_at {
                self.fail_at = usize::MAX;
                return Err(std::io::Error::other("decoder stalled"));
            }
            Ok(crate::integration::DetectionBuilder::new()
                .person(10.0, 10.0, 60.0, 110.0, 0.99)
                .build())
        }
    }

    #[test]
    fn test_failed_run_cannot_be_resumed() {
        let mut p = FramePipeline::new(
            FlakyDetector { fail_at: 2 },
            EchoTracker,
            FixedPose { joints: NUM_JOINTS },
        )
        .with_progress_interval(0);
        let mut source = IterSource::placeholders(5, 100, 100);

        let err = p.run(&mut source).unwrap_err();
        assert!(matches!(err, PipelineError::Detector { frame: 2, .. }));
        assert_eq!(p.state(), PipelineState::Failed);
        assert_eq!(p.frames_processed(), 2);

        assert!(matches!(p.run(&mut source), Err(PipelineError::Aborted)));
        assert!(matches!(
            p.process_frame(&Frame::placeholder(3, 100, 100)),
            Err(PipelineError::Aborted)
        ));
        assert_eq!(p.frames_processed(), 2);
    }

    #[test]
    fn test_cancel_stops_between_frames() {
        let mut p = pipeline(vec![true; 10], NUM_JOINTS);
        let cancel = AtomicBool::new(true);
        let report = p.run_until(IterSource::placeholders(10, 100, 100), &cancel).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.frames, 0);
        assert_eq!(p.state(), PipelineState::Done);
    }

    #[test]
    fn test_report_counts() {
        let mut p = pipeline(vec![true, false, true], NUM_JOINTS);
        let report = p.run(IterSource::placeholders(3, 100, 100)).unwrap();
        assert_eq!(
            report,
            RunReport {
                frames: 3,
                populated: 2,
                zero_filled: 1,
                subject: SubjectIdentity::Locked(1),
                cancelled: false,
            }
        );
    }
}
