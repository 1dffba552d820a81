use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use cdr_encoding::{from_bytes, to_vec};
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Cursor, Write};

use super::header::Header;

/// Encapsulation identifiers for plain CDR.
const CDR_BE: [u8; 2] = [0x00, 0x00];
const CDR_LE: [u8; 2] = [0x00, 0x01];

pub trait HasHeader {
    fn get_header(&self) -> &Header;
}

/// A ROS 2 message type with its schema, as stored in an MCAP channel.
pub trait RosMsg: Serialize + DeserializeOwned {
    fn get_schema_name() -> &'static str;
    fn get_schema_def() -> &'static [u8];

    /// Little endian CDR with its 4 byte encapsulation header.
    fn construct_msg(&self, buffer: &mut Vec<u8>) -> Result<(), String> {
        let mut cursor = Cursor::new(buffer);

        // write endian
        cursor
            .write_u32::<LittleEndian>(256)
            .map_err(|e| e.to_string())?;
        let serialized = to_vec::<Self, LittleEndian>(self).map_err(|e| e.to_string())?;
        cursor.write_all(&serialized).map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Decodes a CDR payload, honouring the byte order announced by its encapsulation header.
pub fn parse_cdr<T: DeserializeOwned>(input: &[u8]) -> Result<T, String> {
    if input.len() < 4 {
        return Err(format!(
            "payload of {} bytes is shorter than the CDR encapsulation header",
            input.len()
        ));
    }
    let encapsulation = [input[0], input[1]];
    let body = &input[4..];
    let decoded = match encapsulation {
        CDR_LE => from_bytes::<T, LittleEndian>(body).map(|(msg, _consumed_byte_count)| msg),
        CDR_BE => from_bytes::<T, BigEndian>(body).map(|(msg, _consumed_byte_count)| msg),
        other => {
            return Err(format!(
                "unsupported CDR encapsulation {:02X}{:02X}",
                other[0], other[1]
            ))
        }
    };
    decoded.map_err(|e| format!("CDR decoding failed: {}", e))
}

/// Big endian counterpart of [`RosMsg::construct_msg`].
#[cfg(test)]
pub(crate) fn construct_msg_be<T: Serialize>(msg: &T) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.write_u32::<BigEndian>(0).unwrap();
    buffer.extend(to_vec::<T, BigEndian>(msg).unwrap());
    buffer
}

#[cfg(test)]
mod tests {
    use super::super::imu::Imu;
    use super::super::timestamp::Timestamp;
    use super::*;

    fn sample_imu() -> Imu {
        let mut imu = Imu::new(Header::new(Timestamp::from_nanos(1_000_000_100), "imu_link").unwrap());
        imu.angular_velocity.x = 0.25;
        imu.linear_acceleration.z = 9.81;
        imu
    }

    #[test]
    fn little_endian_payload_decodes() {
        let imu = sample_imu();
        let mut buffer = Vec::new();
        imu.construct_msg(&mut buffer).unwrap();
        assert_eq!(&buffer[..4], &[0, 1, 0, 0]);
        let parsed: Imu = parse_cdr(&buffer).unwrap();
        assert_eq!(parsed, imu);
    }

    #[test]
    fn big_endian_payload_decodes() {
        let imu = sample_imu();
        let buffer = construct_msg_be(&imu);
        let parsed: Imu = parse_cdr(&buffer).unwrap();
        assert_eq!(parsed, imu);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let imu = sample_imu();
        let mut buffer = Vec::new();
        imu.construct_msg(&mut buffer).unwrap();
        assert!(parse_cdr::<Imu>(&buffer[..2]).is_err());
        assert!(parse_cdr::<Imu>(&buffer[..20]).is_err());
    }

    #[test]
    fn unknown_encapsulation_is_rejected() {
        let err = parse_cdr::<Imu>(&[0x00, 0x03, 0, 0, 1, 2, 3, 4]).unwrap_err();
        assert!(err.contains("encapsulation"), "{}", err);
    }
}
