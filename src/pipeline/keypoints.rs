//! Per-frame keypoint records and the run-long sequence they accumulate into.

use std::path::Path;

use ndarray::{Array3, ArrayView3};
use ndarray_npy::{read_npy, write_npy};

use crate::error::{PipelineError, PipelineResult};

/// Joints per frame (COCO layout).
pub const NUM_JOINTS: usize = 17;

/// COCO keypoint indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum JointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl JointIndex {
    pub const ALL: [JointIndex; NUM_JOINTS] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

/// One joint in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Joint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Joint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.confidence]
    }
}

/// The keypoints recorded for one video frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeypointFrame {
    pub joints: [Joint; NUM_JOINTS],
}

impl KeypointFrame {
    pub fn new(joints: [Joint; NUM_JOINTS]) -> Self {
        Self { joints }
    }

    /// The gap record: every joint `(0, 0, 0)`.
    pub fn zeroed() -> Self {
        Self {
            joints: [Joint::default(); NUM_JOINTS],
        }
    }

    /// `None` unless exactly [`NUM_JOINTS`] joints are given.
    pub fn from_joints(joints: &[Joint]) -> Option<Self> {
        let joints: [Joint; NUM_JOINTS] = joints.try_into().ok()?;
        Some(Self { joints })
    }

    pub fn get(&self, index: JointIndex) -> &Joint {
        &self.joints[index as usize]
    }

    pub fn is_zero_filled(&self) -> bool {
        self.joints.iter().all(|j| *j == Joint::default())
    }

    pub fn mean_confidence(&self) -> f32 {
        let sum: f32 = self.joints.iter().map(|j| j.confidence).sum();
        sum / NUM_JOINTS as f32
    }
}

impl Default for KeypointFrame {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Append-only keypoint time series, one entry per processed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointSequence {
    frames: Vec<KeypointFrame>,
}

impl KeypointSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(frames: usize) -> Self {
        Self {
            frames: Vec::with_capacity(frames),
        }
    }

    pub fn push(&mut self, frame: KeypointFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&KeypointFrame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeypointFrame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[KeypointFrame] {
        &self.frames
    }

    /// Frames that carry a real pose rather than the zero fill.
    pub fn populated_count(&self) -> usize {
        self.frames.iter().filter(|f| !f.is_zero_filled()).count()
    }

    /// Dense `(frames, 17, 3)` array of `[x, y, confidence]`.
    pub fn to_array(&self) -> Array3<f32> {
        let mut array = Array3::zeros((self.frames.len(), NUM_JOINTS, 3));
        for (f, frame) in self.frames.iter().enumerate() {
            for (j, joint) in frame.joints.iter().enumerate() {
                array[[f, j, 0]] = joint.x;
                array[[f, j, 1]] = joint.y;
                array[[f, j, 2]] = joint.confidence;
            }
        }
        array
    }

    pub fn from_array(array: ArrayView3<f32>) -> PipelineResult<Self> {
        let (_, joints, fields) = array.dim();
        if joints != NUM_JOINTS || fields != 3 {
            return Err(PipelineError::ShapeMismatch {
                actual: array.shape().to_vec(),
                joints: NUM_JOINTS,
            });
        }
        let frames = array
            .outer_iter()
            .map(|frame| {
                let mut joints = [Joint::default(); NUM_JOINTS];
                for (j, row) in frame.outer_iter().enumerate() {
                    joints[j] = Joint::new(row[0], row[1], row[2]);
                }
                KeypointFrame::new(joints)
            })
            .collect();
        Ok(Self { frames })
    }

    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let path = path.as_ref();
        write_npy(path, &self.to_array()).map_err(|e| PipelineError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn load_npy<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let array: Array3<f32> = read_npy(path).map_err(|e| PipelineError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_array(array.view())
    }
}

impl<'a> IntoIterator for &'a KeypointSequence {
    type Item = &'a KeypointFrame;
    type IntoIter = std::slice::Iter<'a, KeypointFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(offset: f32) -> KeypointFrame {
        let mut joints = [Joint::default(); NUM_JOINTS];
        for (i, joint) in joints.iter_mut().enumerate() {
            *joint = Joint::new(offset + i as f32, offset + 2.0 * i as f32, 0.9);
        }
        KeypointFrame::new(joints)
    }

    #[test]
    fn test_joint_names() {
        assert_eq!(JointIndex::ALL.len(), NUM_JOINTS);
        assert_eq!(JointIndex::from_index(0).map(JointIndex::name), Some("nose"));
        assert_eq!(JointIndex::from_index(16), Some(JointIndex::RightAnkle));
        assert_eq!(JointIndex::from_index(17), None);
        for (i, joint) in JointIndex::ALL.iter().enumerate() {
            assert_eq!(*joint as usize, i);
        }
    }

    #[test]
    fn test_from_joints_requires_exact_count() {
        assert!(KeypointFrame::from_joints(&[Joint::default(); NUM_JOINTS]).is_some());
        assert!(KeypointFrame::from_joints(&[Joint::default(); 16]).is_none());
        assert!(KeypointFrame::from_joints(&[]).is_none());
    }

    #[test]
    fn test_zero_fill() {
        let frame = KeypointFrame::zeroed();
        assert!(frame.is_zero_filled());
        assert_eq!(frame.mean_confidence(), 0.0);
        assert!(!pose(1.0).is_zero_filled());
    }

    #[test]
    fn test_array_shape_and_layout() {
        let mut sequence = KeypointSequence::new();
        sequence.push(pose(0.0));
        sequence.push(KeypointFrame::zeroed());
        sequence.push(pose(100.0));

        let array = sequence.to_array();
        assert_eq!(array.shape(), &[3, NUM_JOINTS, 3]);
        assert_eq!(array[[0, 5, 0]], 5.0);
        assert_eq!(array[[0, 5, 1]], 10.0);
        assert_eq!(array[[0, 5, 2]], 0.9);
        assert!(array.index_axis(ndarray::Axis(0), 1).iter().all(|&v| v == 0.0));
        assert_eq!(array[[2, 0, 0]], 100.0);
        assert_eq!(sequence.populated_count(), 2);
    }

    #[test]
    fn test_from_array_rejects_wrong_joint_count() {
        let array = Array3::<f32>::zeros((2, 18, 3));
        assert!(matches!(
            KeypointSequence::from_array(array.view()),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_npy_file_keeps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keypoints.npy");

        let mut sequence = KeypointSequence::new();
        sequence.push(pose(3.0));
        sequence.push(KeypointFrame::zeroed());
        sequence.save_npy(&path).unwrap();

        let loaded = KeypointSequence::load_npy(&path).unwrap();
        assert_eq!(loaded, sequence);
    }
}
