use super::timestamp::Timestamp;
use serde::{Deserialize, Serialize};

/// `std_msgs/Header`
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Header {
    pub stamp_sec: i32,
    pub stamp_nsec: u32,
    pub frame_id: String,
}

impl Header {
    /// `None` when `timestamp` is past what a header stamp can hold (2^31 s).
    pub fn new(timestamp: Timestamp, frame_id: &str) -> Option<Header> {
        let (stamp_sec, stamp_nsec) = timestamp.get_sec_nsec()?;
        Some(Header {
            stamp_sec,
            stamp_nsec,
            frame_id: frame_id.to_string(),
        })
    }

    /// Returns the timestamp of this [`Header`], or `None` if it lies before the epoch.
    #[inline]
    pub fn get_timestamp(&self) -> Option<Timestamp> {
        Timestamp::from_sec_nsec(self.stamp_sec, self.stamp_nsec)
    }
}
