//! Sequential message sources.
//!
//! A source yields `(topic, log time, payload)` records in the order they were recorded. Payloads
//! are CDR encoded ROS 2 messages; the decoder for a topic is picked from a caller supplied
//! topic → [`PayloadKind`] map first, then from the schema name the record was written with.

use std::collections::{HashMap, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use mcap::read::MessageStream;
use memmap::Mmap;
use serde::{Deserialize, Serialize};

use super::error::{ExtractError, Result};
use super::io;
use super::sensors::image::RosImage;
use super::sensors::imu::Imu;
use super::sensors::pose::{Odom, PoseStamped, PoseWithCovarianceStamped};
use super::sensors::tf::TFMessage;
use super::sensors::timestamp::Timestamp;
use super::sensors::utils::{parse_cdr, RosMsg};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Image,
    Imu,
    Pose,
    PoseWithCovariance,
    Odometry,
    TransformSet,
}

impl PayloadKind {
    /// Accepts both `pkg/msg/Type` (ROS 2) and `pkg/Type` names.
    pub fn from_schema_name(name: &str) -> Option<PayloadKind> {
        let normalized = name.replacen("/msg/", "/", 1);
        match normalized.as_str() {
            "sensor_msgs/Image" => Some(Self::Image),
            "sensor_msgs/Imu" => Some(Self::Imu),
            "geometry_msgs/PoseStamped" => Some(Self::Pose),
            "geometry_msgs/PoseWithCovarianceStamped" => Some(Self::PoseWithCovariance),
            "nav_msgs/Odometry" => Some(Self::Odometry),
            "tf2_msgs/TFMessage" => Some(Self::TransformSet),
            _ => None,
        }
    }
}

/// A decoded record. Pose carrying messages of every accepted schema become [`Payload::Pose`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Image(RosImage),
    Imu(Imu),
    Pose(PoseStamped),
    TransformSet(TFMessage),
}

impl Payload {
    pub fn decode(kind: PayloadKind, data: &[u8]) -> std::result::Result<Payload, String> {
        let payload = match kind {
            PayloadKind::Image => Payload::Image(parse_cdr::<RosImage>(data)?),
            PayloadKind::Imu => Payload::Imu(parse_cdr::<Imu>(data)?),
            PayloadKind::Pose => Payload::Pose(parse_cdr::<PoseStamped>(data)?),
            PayloadKind::PoseWithCovariance => {
                Payload::Pose(parse_cdr::<PoseWithCovarianceStamped>(data)?.into())
            }
            PayloadKind::Odometry => Payload::Pose(parse_cdr::<Odom>(data)?.into()),
            PayloadKind::TransformSet => Payload::TransformSet(parse_cdr::<TFMessage>(data)?),
        };
        Ok(payload)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Payload::Image(_) => "image",
            Payload::Imu(_) => "imu",
            Payload::Pose(_) => "pose",
            Payload::TransformSet(_) => "transform set",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    /// Position of the record within its topic, counting from 0.
    pub index: usize,
    /// Time the record was written to the log.
    pub log_time: Timestamp,
    pub payload: Payload,
}

impl Message {
    pub fn malformed(&self, reason: impl Into<String>) -> ExtractError {
        ExtractError::malformed(&self.topic, self.index, reason)
    }
}

pub type MessageIter<'a> = Box<dyn Iterator<Item = Result<Message>> + 'a>;

pub trait MessageSource {
    /// Lazily yields the records of `topics` in source order. An empty slice selects every topic.
    fn read_messages<'a>(&'a self, topics: &[&str]) -> Result<MessageIter<'a>>;

    /// Topics present in the source, if it can tell without a full pass.
    fn topics(&self) -> Vec<String> {
        Vec::new()
    }

    /// Number of records `read_messages(topics)` will yield, if known up front.
    fn message_count(&self, _topics: &[&str]) -> Option<u64> {
        None
    }
}

struct TopicFilter(HashSet<String>);

impl TopicFilter {
    fn new(topics: &[&str]) -> Self {
        Self(topics.iter().map(|t| t.to_string()).collect())
    }

    fn accepts(&self, topic: &str) -> bool {
        self.0.is_empty() || self.0.contains(topic)
    }
}

/// Picks a decoder per record and numbers records per topic.
struct RecordDecoder {
    schemas: HashMap<String, PayloadKind>,
    counters: HashMap<String, usize>,
}

impl RecordDecoder {
    fn new(schemas: HashMap<String, PayloadKind>) -> Self {
        Self {
            schemas,
            counters: HashMap::new(),
        }
    }

    fn decode(
        &mut self,
        topic: &str,
        schema_name: Option<&str>,
        log_time: u64,
        data: &[u8],
    ) -> Result<Message> {
        let counter = self.counters.entry(topic.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;

        let kind = match self.schemas.get(topic) {
            Some(kind) => *kind,
            None => {
                let name = schema_name
                    .ok_or_else(|| ExtractError::malformed(topic, index, "Message schema must exist."))?;
                PayloadKind::from_schema_name(name).ok_or_else(|| {
                    ExtractError::malformed(topic, index, format!("unsupported schema {}", name))
                })?
            }
        };
        let payload =
            Payload::decode(kind, data).map_err(|reason| ExtractError::malformed(topic, index, reason))?;
        Ok(Message {
            topic: topic.to_string(),
            index,
            log_time: Timestamp::from_nanos(log_time),
            payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub topic: String,
    pub schema_name: Option<String>,
    pub message_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagSummary {
    pub message_count: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub topics: Vec<TopicSummary>,
}

/// A ROS 2 bag stored as MCAP, read through a memory map. The map is released on drop.
pub struct McapSource {
    path: Utf8PathBuf,
    mapped: Mmap,
    schemas: HashMap<String, PayloadKind>,
}

impl McapSource {
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> Result<McapSource> {
        let mapped = io::map_mcap(path.as_ref())?;
        Ok(McapSource {
            path: path.as_ref().to_path_buf(),
            mapped,
            schemas: HashMap::new(),
        })
    }

    /// Decode `topic` as `kind` regardless of its channel schema.
    pub fn with_schema(mut self, topic: &str, kind: PayloadKind) -> Self {
        self.schemas.insert(topic.to_string(), kind);
        self
    }

    pub fn with_schemas<I: IntoIterator<Item = (String, PayloadKind)>>(mut self, schemas: I) -> Self {
        self.schemas.extend(schemas);
        self
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Statistics from the summary section, `None` when the file has no summary.
    pub fn summary(&self) -> Result<Option<BagSummary>> {
        let summary = mcap::Summary::read(&self.mapped)
            .map_err(|e| ExtractError::source_io(self.path.to_string(), e))?;
        let Some(summary) = summary else {
            return Ok(None);
        };
        let Some(stats) = summary.stats else {
            return Ok(None);
        };

        let mut topics: Vec<TopicSummary> = summary
            .channels
            .values()
            .map(|channel| TopicSummary {
                topic: channel.topic.clone(),
                schema_name: channel.schema.as_ref().map(|s| s.name.clone()),
                message_count: stats
                    .channel_message_counts
                    .get(&channel.id)
                    .copied()
                    .unwrap_or(0),
            })
            .collect();
        topics.sort_by(|a, b| a.topic.cmp(&b.topic));

        Ok(Some(BagSummary {
            message_count: stats.message_count,
            start_time: Timestamp::from_nanos(stats.message_start_time),
            end_time: Timestamp::from_nanos(stats.message_end_time),
            topics,
        }))
    }

    /// Releases the memory map.
    pub fn close(self) {}
}

impl MessageSource for McapSource {
    fn read_messages<'a>(&'a self, topics: &[&str]) -> Result<MessageIter<'a>> {
        let stream = MessageStream::new(&self.mapped)
            .map_err(|e| ExtractError::source_io(self.path.to_string(), e))?;
        let filter = TopicFilter::new(topics);
        let mut decoder = RecordDecoder::new(self.schemas.clone());
        let path = &self.path;

        Ok(Box::new(stream.filter_map(move |message| {
            let message = match message {
                Ok(message) => message,
                Err(e) => return Some(Err(ExtractError::source_io(path.to_string(), e))),
            };
            let topic = message.channel.topic.as_str();
            if !filter.accepts(topic) {
                return None;
            }
            let schema_name = message.channel.schema.as_ref().map(|s| s.name.as_str());
            Some(decoder.decode(topic, schema_name, message.log_time, message.data.as_ref()))
        })))
    }

    fn topics(&self) -> Vec<String> {
        match self.summary() {
            Ok(Some(summary)) => summary.topics.into_iter().map(|t| t.topic).collect(),
            _ => Vec::new(),
        }
    }

    fn message_count(&self, topics: &[&str]) -> Option<u64> {
        let summary = self.summary().ok()??;
        if topics.is_empty() {
            return Some(summary.message_count);
        }
        Some(
            summary
                .topics
                .iter()
                .filter(|t| topics.contains(&t.topic.as_str()))
                .map(|t| t.message_count)
                .sum(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub topic: String,
    pub schema_name: String,
    pub log_time: u64,
    pub data: Vec<u8>,
}

/// Raw CDR records held in memory, decoded exactly like an MCAP file would be.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<RawRecord>,
    schemas: HashMap<String, PayloadKind>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn with_schema(mut self, topic: &str, kind: PayloadKind) -> Self {
        self.schemas.insert(topic.to_string(), kind);
        self
    }

    pub fn push_raw(&mut self, topic: &str, schema_name: &str, log_time: u64, data: Vec<u8>) {
        self.records.push(RawRecord {
            topic: topic.to_string(),
            schema_name: schema_name.to_string(),
            log_time,
            data,
        });
    }

    /// Encodes `msg` as little endian CDR under its own schema name.
    pub fn push<T: RosMsg>(&mut self, topic: &str, log_time: u64, msg: &T) -> Result<()> {
        let mut buffer = Vec::new();
        msg.construct_msg(&mut buffer).map_err(|reason| {
            let index = self.records.iter().filter(|r| r.topic == topic).count();
            ExtractError::malformed(topic, index, reason)
        })?;
        self.push_raw(topic, T::get_schema_name(), log_time, buffer);
        Ok(())
    }
}

impl MessageSource for MemorySource {
    fn read_messages<'a>(&'a self, topics: &[&str]) -> Result<MessageIter<'a>> {
        let filter = TopicFilter::new(topics);
        let mut decoder = RecordDecoder::new(self.schemas.clone());
        Ok(Box::new(
            self.records
                .iter()
                .filter(move |record| filter.accepts(&record.topic))
                .map(move |record| {
                    decoder.decode(
                        &record.topic,
                        Some(&record.schema_name),
                        record.log_time,
                        &record.data,
                    )
                }),
        ))
    }

    fn topics(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.topic.as_str()))
            .map(|r| r.topic.clone())
            .collect()
    }
}
