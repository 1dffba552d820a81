use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use std::sync::LazyLock;

use super::config::{
    ImageFileFormat, ImageJob, JobConfig, MalformedPolicy, TableJob, TransformJob,
};

pub static IMAGE_FORMAT_HELP: LazyLock<String> = LazyLock::new(|| {
    let valid_options: Vec<String> = ImageFileFormat::value_variants()
        .iter()
        .filter_map(|v| {
            let value = v.to_possible_value()?;
            Some(value.get_name().to_string())
        })
        .collect();

    format!(
        "File format of extracted images. Valid options: {}",
        valid_options.join(", ")
    )
});

pub fn parse_image_format(s: &str) -> Result<ImageFileFormat, String> {
    ImageFileFormat::from_str(s, true).map_err(|_| {
        let valid_options: Vec<String> = ImageFileFormat::value_variants()
            .iter()
            .filter_map(|v| Some(v.to_possible_value()?.get_name().to_string()))
            .collect();
        format!(
            "Invalid image format: {}. Valid options are: {:?}",
            s, valid_options
        )
    })
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    #[arg(short, long, required_unless_present = "config")]
    pub input: Option<Utf8PathBuf>,

    #[arg(short, long, required_unless_present = "config")]
    pub output: Option<Utf8PathBuf>,

    /// Image topic, written to <output>/images.
    #[arg(long)]
    pub image_topic: Option<String>,

    /// IMU topic, written to <output>/imu.csv.
    #[arg(long)]
    pub imu_topic: Option<String>,

    /// Pose topic, written to <output>/poses.csv.
    #[arg(long)]
    pub pose_topic: Option<String>,

    /// Rebuild the transform tree from /tf and /tf_static into <output>/transforms.json.
    #[arg(long)]
    pub transforms: bool,

    #[arg(long, value_parser = parse_image_format, help = IMAGE_FORMAT_HELP.as_str())]
    pub image_format: Option<ImageFileFormat>,

    /// Log and drop records that can't be decoded instead of failing.
    #[arg(long)]
    pub skip_malformed: bool,

    /// Fail when the image topic has no records.
    #[arg(long)]
    pub require_images: bool,
}

impl CommonArgs {
    /// Command line flags win over what `base` says.
    pub fn apply(self, base: Option<JobConfig>) -> Result<JobConfig, String> {
        let mut job = match base {
            Some(job) => job,
            None => {
                let input = self.input.clone().ok_or("--input is required")?;
                let output = self.output.clone().ok_or("--output is required")?;
                JobConfig::new(input, output)
            }
        };
        if let Some(input) = self.input {
            job.input = input;
        }
        if let Some(output) = self.output {
            job.output = output;
        }
        if let Some(topic) = self.image_topic {
            job.images = Some(ImageJob {
                topic,
                dir: job
                    .images
                    .take()
                    .map(|images| images.dir)
                    .unwrap_or_else(|| Utf8PathBuf::from("images")),
            });
        }
        if let Some(topic) = self.imu_topic {
            let file = job.imu.take().and_then(|imu| imu.file);
            job.imu = Some(TableJob { topic, file });
        }
        if let Some(topic) = self.pose_topic {
            let file = job.poses.take().and_then(|poses| poses.file);
            job.poses = Some(TableJob { topic, file });
        }
        if self.transforms && job.transforms.is_none() {
            job.transforms = Some(TransformJob::default());
        }
        if let Some(format) = self.image_format {
            job.options.image_format = format;
        }
        if self.skip_malformed {
            job.options.on_malformed = MalformedPolicy::Skip;
        }
        if self.require_images {
            job.options.require_images = true;
        }
        Ok(job)
    }
}
