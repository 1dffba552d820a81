//! Per-topic extraction of images, IMU samples and poses into fixed-schema tables.

use camino::Utf8Path;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::config::{ExtractOptions, MalformedPolicy, StampSource};
use super::error::{ExtractError, Result};
use super::io;
use super::sensors::common::SensorTable;
use super::sensors::header::Header;
use super::sensors::image::{save_image, ImageRecord, STAMPS_FILE_NAME};
use super::sensors::imu::ImuRow;
use super::sensors::pose::PoseRow;
use super::sensors::timestamp::{MonotonicCheck, Timestamp};
use super::sensors::utils::HasHeader;
use super::source::{Message, MessageSource, Payload};

/// Called with every persisted frame. Only used for display.
pub type PreviewFn<'a> = &'a mut dyn FnMut(&ImageRecord, &RgbImage);

/// One pass over `topics` in source order. Malformed records either end the pass or, under
/// [`MalformedPolicy::Skip`], are logged and dropped. Returns the number of dropped records.
pub(crate) fn demux<S, F>(
    source: &S,
    topics: &[&str],
    options: &ExtractOptions,
    mut handle: F,
) -> Result<usize>
where
    S: MessageSource + ?Sized,
    F: FnMut(Message) -> Result<()>,
{
    let mut progress = PassProgress::new(source, topics);
    let mut skipped = 0;
    for record in source.read_messages(topics)? {
        progress.inc();
        match record.and_then(|message| handle(message)) {
            Ok(()) => {}
            Err(e) if e.is_malformed() && options.on_malformed == MalformedPolicy::Skip => {
                warn!(error = %e, "skipping malformed record");
                skipped += 1;
            }
            Err(e) => {
                progress.bar.abandon();
                return Err(e);
            }
        }
    }
    progress.bar.finish_with_message("Done");
    Ok(skipped)
}

/// Progress of one pass. Drawn on stderr when it is a terminal, otherwise logged every 10 %.
/// Stays silent for sources that can't count their records up front.
pub(crate) struct PassProgress {
    bar: ProgressBar,
    total: u64,
    logged_decile: u64,
}

impl PassProgress {
    pub(crate) fn new<S: MessageSource + ?Sized>(source: &S, topics: &[&str]) -> PassProgress {
        let Some(total) = source.message_count(topics) else {
            return PassProgress {
                bar: ProgressBar::hidden(),
                total: 0,
                logged_decile: 0,
            };
        };
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template("{msg} [{wide_bar}] {pos}/{len} ({eta})") {
            bar.set_style(style);
        }
        let what = if topics.is_empty() {
            "all topics".to_string()
        } else {
            topics.join(", ")
        };
        bar.set_message(format!("Processing {}", what));
        PassProgress {
            bar,
            total,
            logged_decile: 0,
        }
    }

    pub(crate) fn inc(&mut self) {
        self.bar.inc(1);
        if self.total == 0 || !self.bar.is_hidden() {
            return;
        }
        let decile = (10 * self.bar.position() / self.total).min(10);
        if decile > self.logged_decile {
            self.logged_decile = decile;
            info!("Reached {}0 %", decile);
        }
    }
}

pub(crate) fn empty_topic<S: MessageSource + ?Sized>(source: &S, topic: &str) -> ExtractError {
    ExtractError::EmptyTopic {
        topic: topic.to_string(),
        available: source.topics(),
    }
}

fn header_stamp(message: &Message, header: &Header) -> Result<Timestamp> {
    header.get_timestamp().ok_or_else(|| {
        message.malformed(format!(
            "header stamp {}.{:09} is before the epoch",
            header.stamp_sec, header.stamp_nsec
        ))
    })
}

fn unexpected_payload(message: &Message, expected: &str) -> ExtractError {
    message.malformed(format!(
        "expected {} payload, found {}",
        expected,
        message.payload.name()
    ))
}

fn check_order(order: &mut MonotonicCheck, message: &Message, stamp: Timestamp) {
    if let Some(previous) = order.observe(stamp) {
        warn!(
            topic = %message.topic,
            index = message.index,
            previous = %previous,
            stamp = %stamp,
            "timestamp went backwards"
        );
    }
}

/// Angular velocity and linear acceleration of every record on `imu_topic`, stamped with the
/// message header. Fails with [`ExtractError::EmptyTopic`] when the topic yields nothing.
pub fn extract_imu<S: MessageSource + ?Sized>(
    source: &S,
    imu_topic: &str,
    options: &ExtractOptions,
) -> Result<SensorTable<ImuRow>> {
    info!(topic = imu_topic, "extracting imu samples");
    let mut table = SensorTable::new(imu_topic);
    let mut order = MonotonicCheck::default();

    let skipped = demux(source, &[imu_topic], options, |message| {
        let Payload::Imu(imu) = &message.payload else {
            return Err(unexpected_payload(&message, "an imu"));
        };
        let stamp = header_stamp(&message, imu.get_header())?;
        check_order(&mut order, &message, stamp);
        table.add(ImuRow::from_msg(imu, stamp.as_nanos()));
        Ok(())
    })?;

    if table.is_empty() {
        return Err(empty_topic(source, imu_topic));
    }
    info!(
        topic = imu_topic,
        rows = table.len(),
        skipped,
        regressions = order.regressions(),
        "imu extraction done"
    );
    Ok(table)
}

/// Position and (w, x, y, z) orientation of every record on `pose_topic`, stamped with the
/// message header. Fails with [`ExtractError::EmptyTopic`] when the topic yields nothing.
pub fn extract_poses<S: MessageSource + ?Sized>(
    source: &S,
    pose_topic: &str,
    options: &ExtractOptions,
) -> Result<SensorTable<PoseRow>> {
    info!(topic = pose_topic, "extracting poses");
    let mut table = SensorTable::new(pose_topic);
    let mut order = MonotonicCheck::default();

    let skipped = demux(source, &[pose_topic], options, |message| {
        let Payload::Pose(pose) = &message.payload else {
            return Err(unexpected_payload(&message, "a pose"));
        };
        let stamp = header_stamp(&message, pose.get_header())?;
        check_order(&mut order, &message, stamp);
        table.add(PoseRow::from_msg(pose, stamp.as_nanos()));
        Ok(())
    })?;

    if table.is_empty() {
        return Err(empty_topic(source, pose_topic));
    }
    info!(
        topic = pose_topic,
        rows = table.len(),
        skipped,
        regressions = order.regressions(),
        "pose extraction done"
    );
    Ok(table)
}

/// Writes every frame of `image_topic` as `{index}.{ext}` into `output_dir`, then the index as
/// `stamps.csv`. An empty topic is not an error unless `options.require_images` is set.
pub fn extract_images<S, P>(
    source: &S,
    image_topic: &str,
    output_dir: P,
    options: &ExtractOptions,
) -> Result<SensorTable<ImageRecord>>
where
    S: MessageSource + ?Sized,
    P: AsRef<Utf8Path>,
{
    extract_images_with_preview(source, image_topic, output_dir, options, None)
}

/// [`extract_images`] with a callback invoked after each frame is written.
pub fn extract_images_with_preview<S, P>(
    source: &S,
    image_topic: &str,
    output_dir: P,
    options: &ExtractOptions,
    mut preview: Option<PreviewFn<'_>>,
) -> Result<SensorTable<ImageRecord>>
where
    S: MessageSource + ?Sized,
    P: AsRef<Utf8Path>,
{
    let output_dir = output_dir.as_ref();
    io::check_output_path(output_dir)?;
    info!(topic = image_topic, output = %output_dir, "extracting images");

    let mut table = SensorTable::new(image_topic);
    let format = options.image_format;

    let pass = demux(source, &[image_topic], options, |message| {
        let Payload::Image(image) = &message.payload else {
            return Err(unexpected_payload(&message, "an image"));
        };
        let stamp = match options.image_stamp {
            StampSource::LogTime => message.log_time,
            StampSource::Header => header_stamp(&message, image.get_header())?,
        };
        let rgb = image.to_rgb().map_err(|reason| message.malformed(reason))?;

        let index = table.len() as u64;
        let path = output_dir.join(format!("{}.{}", index, format.extension()));
        save_image(&rgb, &path, format.image_format()).map_err(|source| {
            ExtractError::ImageWrite {
                path: path.clone(),
                source,
            }
        })?;
        debug!(path = %path, "saved image");

        let record = ImageRecord {
            timestamp_ns: stamp.as_nanos(),
            index,
        };
        if let Some(preview) = preview.as_deref_mut() {
            preview(&record, &rgb);
        }
        table.add(record);
        Ok(())
    });

    // the index always describes the images already on disk, even after a failed pass
    let saved = table.save(output_dir.join(STAMPS_FILE_NAME));
    let skipped = pass?;
    saved?;

    if table.is_empty() {
        if options.require_images {
            return Err(empty_topic(source, image_topic));
        }
        warn!(topic = image_topic, "no images extracted");
    }
    info!(
        topic = image_topic,
        images = table.len(),
        skipped,
        "image extraction done"
    );
    Ok(table)
}
