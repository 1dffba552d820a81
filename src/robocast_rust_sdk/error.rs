//! Error types for bag extraction.

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors raised while reading a bag or persisting what was extracted from it.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required topic produced no rows.
    #[error("topic {topic} has no records{}", available_hint(.available))]
    EmptyTopic {
        topic: String,
        /// Topics the source does contain, when it can list them.
        available: Vec<String>,
    },

    /// A record is missing fields, has the wrong shape, or could not be decoded.
    #[error("malformed record #{index} on topic {topic}: {reason}")]
    MalformedRecord {
        topic: String,
        index: usize,
        reason: String,
    },

    /// The log container could not be read.
    #[error("failed to read source {context}: {source}")]
    SourceIo {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Writing an output table or file failed.
    #[error("failed to write {path}: {source}")]
    Output {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding an image file failed.
    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        path: Utf8PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ExtractError {
    pub fn malformed(topic: &str, index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            topic: topic.to_string(),
            index,
            reason: reason.into(),
        }
    }

    pub fn source_io(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SourceIo {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn output(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available topics: {})", available.join(", "))
    }
}
