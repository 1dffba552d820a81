pub mod cli_common;
pub mod config;
pub mod demux;
pub mod error;
pub mod io;
pub mod sensors;
pub mod source;
pub mod transforms;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

pub use config::{
    ExtractOptions, ImageFileFormat, JobConfig, MalformedPolicy, StampSource, IMU_FILE_NAME,
    POSES_FILE_NAME,
};
pub use demux::{extract_images, extract_images_with_preview, extract_imu, extract_poses};
pub use error::ExtractError;
pub use source::{McapSource, MemorySource, Message, MessageSource, Payload, PayloadKind};
pub use transforms::{
    extract_transforms, extract_transforms_from, quaternion_to_matrix, TransformSample,
    TransformTree,
};

/// Counts of what a job wrote, `None` for outputs the job did not ask for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub images: Option<usize>,
    pub imu_rows: Option<usize>,
    pub pose_rows: Option<usize>,
    pub transform_frames: Option<usize>,
    pub transform_samples: Option<usize>,
}

fn output_file(output: &Utf8Path, file: Option<&Utf8Path>, default: &str) -> Utf8PathBuf {
    output.join(file.unwrap_or(Utf8Path::new(default)))
}

fn log_bag_summary(source: &McapSource) {
    match source.summary() {
        Ok(Some(summary)) => {
            info!(
                path = %source.path(),
                messages = summary.message_count,
                start = %summary.start_time,
                end = %summary.end_time,
                "opened bag"
            );
            for topic in &summary.topics {
                info!(
                    topic = %topic.topic,
                    schema = topic.schema_name.as_deref().unwrap_or("-"),
                    messages = topic.message_count,
                    "topic"
                );
            }
        }
        Ok(None) => warn!(path = %source.path(), "bag has no summary section"),
        Err(e) => warn!(path = %source.path(), error = %e, "couldn't read bag summary"),
    }
}

/// Runs every extraction `job` asks for over one bag, in the order images, IMU, poses,
/// transforms. The first failing extraction ends the job.
pub fn process_rosbag(job: &JobConfig) -> Result<JobSummary> {
    let input_path = io::check_mcap_input_path(&job.input)?;
    io::check_output_path(&job.output)?;
    if !job.has_work() {
        warn!("job has no extraction configured");
    }

    let source = McapSource::open(&input_path)?.with_schemas(job.schemas.clone());
    log_bag_summary(&source);

    let options = &job.options;
    let output = job.output.as_path();
    let mut summary = JobSummary::default();

    if let Some(images) = &job.images {
        let dir = output.join(&images.dir);
        let table = extract_images(&source, &images.topic, &dir, options)
            .with_context(|| format!("Failed to extract images from {}", images.topic))?;
        summary.images = Some(table.len());
    }

    if let Some(imu) = &job.imu {
        let table = extract_imu(&source, &imu.topic, options)
            .with_context(|| format!("Failed to extract imu samples from {}", imu.topic))?;
        table.save(output_file(output, imu.file.as_deref(), IMU_FILE_NAME))?;
        summary.imu_rows = Some(table.len());
    }

    if let Some(poses) = &job.poses {
        let table = extract_poses(&source, &poses.topic, options)
            .with_context(|| format!("Failed to extract poses from {}", poses.topic))?;
        table.save(output_file(output, poses.file.as_deref(), POSES_FILE_NAME))?;
        summary.pose_rows = Some(table.len());
    }

    if let Some(transforms) = &job.transforms {
        let topics: Vec<&str> = transforms.topics.iter().map(String::as_str).collect();
        let tree = extract_transforms_from(&source, &topics, options)
            .with_context(|| format!("Failed to extract transforms from {:?}", topics))?;
        tree.save_json(output.join(&transforms.file))?;
        summary.transform_frames = Some(tree.len());
        summary.transform_samples = Some(tree.sample_count());
    }

    source.close();
    info!(output = %output, ?summary, "job done");
    Ok(summary)
}
