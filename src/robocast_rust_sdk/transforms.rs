//! Rebuilds the per-frame history of rigid transforms recorded on the tf topics.

use std::collections::BTreeMap;

use camino::Utf8Path;
use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::ExtractOptions;
use super::demux::demux;
use super::error::Result;
use super::io::write_atomic;
use super::sensors::basic::{Quaternion, Vector3};
use super::sensors::tf::{TransformStamped, TF_STATIC_TOPIC, TF_TOPIC};
use super::source::{MessageSource, Payload};

const UNIT_NORM_TOLERANCE: f64 = 1e-3;

/// Homogeneous transform for rotation `q` followed by translation `r`.
///
/// `q` is used as given. A non-unit quaternion yields a scaled, non-orthonormal block.
pub fn quaternion_to_matrix(q: &Quaternion, r: &Vector3) -> Matrix4<f64> {
    let rotation =
        UnitQuaternion::new_unchecked(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z));
    Isometry3::from_parts(Translation3::new(r.x, r.y, r.z), rotation).to_homogeneous()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformSample {
    /// Log time of the record, in seconds.
    pub timestamp: f64,
    pub parent_frame_id: String,
    pub matrix: Matrix4<f64>,
}

/// Child frame id → every sample recorded for it, in source order. Samples are never merged
/// and chains are not resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformTree {
    frames: BTreeMap<String, Vec<TransformSample>>,
}

#[derive(Serialize)]
struct SampleJson<'a> {
    timestamp: f64,
    parent_frame_id: &'a str,
    matrix: [[f64; 4]; 4],
}

impl<'a> From<&'a TransformSample> for SampleJson<'a> {
    fn from(sample: &'a TransformSample) -> Self {
        let mut matrix = [[0.0; 4]; 4];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = sample.matrix[(i, j)];
            }
        }
        SampleJson {
            timestamp: sample.timestamp,
            parent_frame_id: &sample.parent_frame_id,
            matrix,
        }
    }
}

impl TransformTree {
    pub fn new() -> TransformTree {
        TransformTree::default()
    }

    pub(crate) fn insert(&mut self, child_frame_id: &str, sample: TransformSample) {
        self.frames
            .entry(child_frame_id.to_string())
            .or_default()
            .push(sample);
    }

    pub fn get(&self, child_frame_id: &str) -> Option<&[TransformSample]> {
        self.frames.get(child_frame_id).map(Vec::as_slice)
    }

    pub fn latest(&self, child_frame_id: &str) -> Option<&TransformSample> {
        self.frames.get(child_frame_id).and_then(|samples| samples.last())
    }

    pub fn frames(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }

    /// Number of child frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// `{child: [{timestamp, parent_frame_id, matrix}]}` with row-major matrices.
    pub fn save_json<P: AsRef<Utf8Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json: BTreeMap<&str, Vec<SampleJson>> = self
            .frames
            .iter()
            .map(|(child, samples)| (child.as_str(), samples.iter().map(SampleJson::from).collect()))
            .collect();

        write_atomic(path, |writer| {
            serde_json::to_writer_pretty(writer, &json).map_err(std::io::Error::from)
        })?;
        debug!(path = %path, frames = self.len(), "saved transforms");
        Ok(())
    }
}

fn check_transform(tf: &TransformStamped) -> std::result::Result<(), String> {
    let transform = &tf.transform;
    if !transform.translation.is_finite() || !transform.rotation.is_finite() {
        return Err(format!(
            "transform {} -> {} has non-finite values",
            tf.parent_frame_id(),
            tf.child_frame_id
        ));
    }
    Ok(())
}

/// Reads `/tf` and `/tf_static`. See [`extract_transforms_from`].
pub fn extract_transforms<S: MessageSource + ?Sized>(
    source: &S,
    options: &ExtractOptions,
) -> Result<TransformTree> {
    extract_transforms_from(source, &[TF_TOPIC, TF_STATIC_TOPIC], options)
}

/// Appends one sample per transform of every record on `topics`, keyed by child frame.
/// A record is inserted whole or not at all. Finding no records yields an empty tree.
pub fn extract_transforms_from<S: MessageSource + ?Sized>(
    source: &S,
    topics: &[&str],
    options: &ExtractOptions,
) -> Result<TransformTree> {
    info!(topics = ?topics, "extracting transforms");
    let mut tree = TransformTree::new();

    let skipped = demux(source, topics, options, |message| {
        let Payload::TransformSet(tf_message) = &message.payload else {
            return Err(message.malformed(format!(
                "expected a transform set payload, found {}",
                message.payload.name()
            )));
        };
        for tf in &tf_message.transforms {
            check_transform(tf).map_err(|reason| message.malformed(reason))?;
        }

        let timestamp = message.log_time.as_secs_f64();
        for tf in &tf_message.transforms {
            let rotation = &tf.transform.rotation;
            let norm = rotation.norm();
            if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                warn!(
                    topic = %message.topic,
                    index = message.index,
                    child = %tf.child_frame_id,
                    norm,
                    "rotation is not a unit quaternion"
                );
            }
            tree.insert(
                &tf.child_frame_id,
                TransformSample {
                    timestamp,
                    parent_frame_id: tf.parent_frame_id().to_string(),
                    matrix: quaternion_to_matrix(rotation, &tf.transform.translation),
                },
            );
        }
        Ok(())
    })?;

    info!(
        frames = tree.len(),
        samples = tree.sample_count(),
        skipped,
        "transform extraction done"
    );
    Ok(tree)
}
