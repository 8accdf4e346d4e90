//! Run configuration, loaded from TOML.
//!
//! Every field has a serde default, so an empty file (or no file at all)
//! yields the settings the pipeline was tuned with: a 0.95 detection
//! threshold, a three-frame occlusion window and a 192x256 pose input.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::pipeline::{CenterScaleMapper, DetectionFilter, ModelInputSize, ScoreOrder};
use crate::tracker::SortConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Scores must strictly exceed this to survive the filter
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Detector class label treated as a person
    #[serde(default = "default_person_label")]
    pub person_label: String,
    /// How to handle detector score ordering before truncation
    #[serde(default)]
    pub score_order: ScoreOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Occlusion tolerance in frames
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    #[serde(default = "default_min_hits")]
    pub min_hits: u32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    /// Pose model input width in pixels
    #[serde(default = "default_input_width")]
    pub input_width: u32,
    /// Pose model input height in pixels
    #[serde(default = "default_input_height")]
    pub input_height: u32,
    #[serde(default = "default_pixel_std")]
    pub pixel_std: f32,
    /// Margin multiplier applied to the box scale
    #[serde(default = "default_scale_margin")]
    pub scale_margin: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Persist the keypoint array at the end of the run
    #[serde(default = "default_save")]
    pub save: bool,
    /// Log progress every N frames
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_threshold() -> f32 { 0.95 }
fn default_person_label() -> String { "person".to_string() }
fn default_max_age() -> u32 { 3 }
fn default_min_hits() -> u32 { 1 }
fn default_iou_threshold() -> f32 { 0.3 }
fn default_input_width() -> u32 { 192 }
fn default_input_height() -> u32 { 256 }
fn default_pixel_std() -> f32 { 200.0 }
fn default_scale_margin() -> f32 { 1.25 }
fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_file_name() -> String { "keypoints.npy".to_string() }
fn default_save() -> bool { true }
fn default_progress_interval() -> usize { 1 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            person_label: default_person_label(),
            score_order: ScoreOrder::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            min_hits: default_min_hits(),
            iou_threshold: default_iou_threshold(),
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            input_width: default_input_width(),
            input_height: default_input_height(),
            pixel_std: default_pixel_std(),
            scale_margin: default_scale_margin(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_name: default_file_name(),
            save: default_save(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a TOML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Like [`PipelineConfig::load`], but a missing file means defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.detection.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::invalid_value(
                "detection.threshold",
                format!("{threshold} is outside [0, 1]"),
            ));
        }
        if self.detection.person_label.is_empty() {
            return Err(ConfigError::invalid_value("detection.person_label", "must not be empty"));
        }
        let iou = self.tracker.iou_threshold;
        if !(0.0..=1.0).contains(&iou) {
            return Err(ConfigError::invalid_value(
                "tracker.iou_threshold",
                format!("{iou} is outside [0, 1]"),
            ));
        }
        if self.pose.input_width == 0 || self.pose.input_height == 0 {
            return Err(ConfigError::invalid_value(
                "pose.input_width/input_height",
                format!("{}x{} has a zero side", self.pose.input_width, self.pose.input_height),
            ));
        }
        if !(self.pose.pixel_std > 0.0) {
            return Err(ConfigError::invalid_value("pose.pixel_std", "must be positive"));
        }
        if !(self.pose.scale_margin > 0.0) {
            return Err(ConfigError::invalid_value("pose.scale_margin", "must be positive"));
        }
        if self.output.file_name.is_empty() {
            return Err(ConfigError::invalid_value("output.file_name", "must not be empty"));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.file_name)
    }

    pub fn detection_filter(&self) -> DetectionFilter {
        DetectionFilter::new(self.detection.threshold)
            .with_person_label(self.detection.person_label.clone())
            .with_score_order(self.detection.score_order)
    }

    pub fn sort_config(&self) -> SortConfig {
        SortConfig {
            max_age: self.tracker.max_age,
            min_hits: self.tracker.min_hits,
            iou_threshold: self.tracker.iou_threshold,
        }
    }

    pub fn center_scale_mapper(&self) -> CenterScaleMapper {
        CenterScaleMapper::new(ModelInputSize::new(self.pose.input_width, self.pose.input_height))
            .with_pixel_std(self.pose.pixel_std)
            .with_margin(self.pose.scale_margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.detection.threshold, 0.95);
        assert_eq!(config.tracker.max_age, 3);
        assert_eq!(config.pose.input_width, 192);
        assert_eq!(config.output_path(), PathBuf::from("./keypoints.npy"));
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [detection]
            threshold = 0.8
            score_order = "validate"

            [tracker]
            max_age = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.threshold, 0.8);
        assert_eq!(config.detection.score_order, ScoreOrder::Validate);
        assert_eq!(config.detection.person_label, "person");
        assert_eq!(config.tracker.max_age, 10);
        assert_eq!(config.tracker.min_hits, 1);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = PipelineConfig::from_toml_str("[detection]\nthreshold = 1.5\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "detection.threshold",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_input_size() {
        let err = PipelineConfig::from_toml_str("[pose]\ninput_height = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = PipelineConfig::default();
        config.tracker.max_age = 7;
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let config = PipelineConfig::load_or_default("/nonexistent/subject-pose.toml").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }
}
