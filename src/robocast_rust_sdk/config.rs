use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::error::{ExtractError, Result};
use super::sensors::tf::{TF_STATIC_TOPIC, TF_TOPIC};
use super::source::PayloadKind;

/// What to do with a record that cannot be decoded or has the wrong shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Fail the whole extraction for that topic.
    #[default]
    Abort,
    /// Log the record and keep going.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFileFormat {
    #[default]
    Bmp,
    Png,
}

impl ImageFileFormat {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bmp => "bmp",
            Self::Png => "png",
        }
    }

    pub const fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub const fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

impl ValueEnum for ImageFileFormat {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Bmp, Self::Png]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// Which clock stamps an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampSource {
    /// Time the message was written to the bag.
    #[default]
    LogTime,
    /// `header.stamp` of the image message.
    Header,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    pub on_malformed: MalformedPolicy,
    /// Treat an image topic without records as an error, like IMU and pose topics.
    pub require_images: bool,
    pub image_format: ImageFileFormat,
    pub image_stamp: StampSource,
}

impl ExtractOptions {
    pub fn skip_malformed(mut self) -> Self {
        self.on_malformed = MalformedPolicy::Skip;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageJob {
    pub topic: String,
    #[serde(default = "default_image_dir")]
    pub dir: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableJob {
    pub topic: String,
    pub file: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformJob {
    #[serde(default = "default_tf_topics")]
    pub topics: Vec<String>,
    #[serde(default = "default_tf_file")]
    pub file: Utf8PathBuf,
}

impl Default for TransformJob {
    fn default() -> Self {
        Self {
            topics: default_tf_topics(),
            file: default_tf_file(),
        }
    }
}

/// One extraction run over one bag. Relative output names are resolved against `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    #[serde(default)]
    pub images: Option<ImageJob>,
    #[serde(default)]
    pub imu: Option<TableJob>,
    #[serde(default)]
    pub poses: Option<TableJob>,
    #[serde(default)]
    pub transforms: Option<TransformJob>,
    /// Topic → payload kind, for channels whose schema name is not recognised.
    #[serde(default)]
    pub schemas: BTreeMap<String, PayloadKind>,
    #[serde(default)]
    pub options: ExtractOptions,
}

impl JobConfig {
    pub fn new<P: AsRef<Utf8Path>>(input: P, output: P) -> JobConfig {
        JobConfig {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            images: None,
            imu: None,
            poses: None,
            transforms: None,
            schemas: BTreeMap::new(),
            options: ExtractOptions::default(),
        }
    }

    pub fn from_file<P: AsRef<Utf8Path>>(path: P) -> Result<JobConfig> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            ExtractError::Config(format!("Failed to read job file '{}': {}", path.as_ref(), e))
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<JobConfig> {
        serde_yaml::from_str(text).map_err(|e| ExtractError::Config(e.to_string()))
    }

    pub fn has_work(&self) -> bool {
        self.images.is_some() || self.imu.is_some() || self.poses.is_some() || self.transforms.is_some()
    }
}

pub const IMU_FILE_NAME: &str = "imu.csv";
pub const POSES_FILE_NAME: &str = "poses.csv";

fn default_image_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("images")
}

fn default_tf_topics() -> Vec<String> {
    vec![TF_TOPIC.to_string(), TF_STATIC_TOPIC.to_string()]
}

fn default_tf_file() -> Utf8PathBuf {
    Utf8PathBuf::from("transforms.json")
}
