use super::common::CsvSaveable;
use super::header::Header;
use super::utils::{HasHeader, RosMsg};
use bayer::run_demosaic;
use camino::Utf8Path;
use image::{ImageFormat, RgbImage};
use ndarray::{s, Array2, Array3};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

pub const DATA_SCHEMA_DEF: &str = "std_msgs/Header header\nuint32 height\nuint32 width\nstring encoding\nuint8 is_bigendian\nuint32 step\nuint8[] data\n================================================================================\nMSG: std_msgs/Header\nbuiltin_interfaces/Time stamp\nstring frame_id\n================================================================================\nMSG: builtin_interfaces/Time\nint32 sec\nuint32 nanosec\n";

pub const STAMPS_CSV_HEADERS: &str = "timestamp(ns),image_idx";
pub const STAMPS_FILE_NAME: &str = "stamps.csv";

/// `sensor_msgs/Image` as it appears on the wire.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RosImage {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub encoding: String,
    pub is_bigendian: u8,
    pub step: u32,
    pub data: Vec<u8>,
}

impl RosImage {
    /// Decodes the raw buffer into an 8 bit RGB raster.
    pub fn to_rgb(&self) -> Result<RgbImage, String> {
        let width = self.width as usize;
        let height = self.height as usize;
        let step = self.step as usize;

        let rgb = match self.encoding.as_str() {
            "rgb8" => packed_array(&self.data, width, height, step, 3)?,
            "bgr8" => packed_array(&self.data, width, height, step, 3)?
                .slice(s![.., .., ..;-1])
                .to_owned(),
            "rgba8" => packed_array(&self.data, width, height, step, 4)?
                .slice(s![.., .., ..3])
                .to_owned(),
            "bgra8" => packed_array(&self.data, width, height, step, 4)?
                .slice(s![.., .., ..3;-1])
                .to_owned(),
            "8UC1" | "mono8" => {
                let rows = packed_rows(&self.data, width, height, step, 1)?;
                let gray = Array2::from_shape_vec((height, width), rows)
                    .map_err(|_| "Shape mismatch".to_string())?;
                Array3::from_shape_fn((height, width, 3), |(y, x, _)| gray[[y, x]])
            }
            "bayer_bggr8" => demosaic(&self.data, width, height, step, bayer::CFA::BGGR)?,
            "bayer_rggb8" => demosaic(&self.data, width, height, step, bayer::CFA::RGGB)?,
            "bayer_gbrg8" => demosaic(&self.data, width, height, step, bayer::CFA::GBRG)?,
            "bayer_grbg8" => demosaic(&self.data, width, height, step, bayer::CFA::GRBG)?,
            encoding => return Err(format!("Unknown encoding {}", encoding)),
        };

        // iter() walks the logical order, whatever strides the slicing left behind
        let raw: Vec<u8> = rgb.iter().copied().collect();
        RgbImage::from_raw(self.width, self.height, raw)
            .ok_or_else(|| "RGB buffer does not match the image dimensions".to_string())
    }
}

impl RosMsg for RosImage {
    fn get_schema_name() -> &'static str {
        "sensor_msgs/msg/Image"
    }
    fn get_schema_def() -> &'static [u8] {
        DATA_SCHEMA_DEF.as_bytes()
    }
}

impl HasHeader for RosImage {
    fn get_header(&self) -> &Header {
        &self.header
    }
}

/// Copies `height` rows of `width * channels` bytes out of a buffer whose rows are `step` apart.
fn packed_rows(
    data: &[u8],
    width: usize,
    height: usize,
    step: usize,
    channels: usize,
) -> Result<Vec<u8>, String> {
    let row_bytes = width * channels;
    if width == 0 || height == 0 {
        return Err(format!("Empty image {}x{}", width, height));
    }
    if step < row_bytes {
        return Err(format!(
            "Row step {} is smaller than {} bytes per row",
            step, row_bytes
        ));
    }
    let required = step * (height - 1) + row_bytes;
    if data.len() < required {
        return Err(format!(
            "Invalid data size: {} bytes, expected at least {}",
            data.len(),
            required
        ));
    }
    if step == row_bytes {
        return Ok(data[..row_bytes * height].to_vec());
    }
    Ok(data
        .chunks(step)
        .take(height)
        .flat_map(|row| row[..row_bytes].iter().copied())
        .collect())
}

fn packed_array(
    data: &[u8],
    width: usize,
    height: usize,
    step: usize,
    channels: usize,
) -> Result<Array3<u8>, String> {
    let rows = packed_rows(data, width, height, step, channels)?;
    Array3::from_shape_vec((height, width, channels), rows).map_err(|_| "Shape mismatch".to_string())
}

fn demosaic(
    data: &[u8],
    width: usize,
    height: usize,
    step: usize,
    cfa: bayer::CFA,
) -> Result<Array3<u8>, String> {
    let rows = packed_rows(data, width, height, step, 1)?;
    let mut buf = vec![0u8; width * height * 3];
    let mut dst = bayer::RasterMut::new(width, height, bayer::RasterDepth::Depth8, &mut buf);

    let mut reader = Cursor::new(rows);
    run_demosaic(
        &mut reader,
        bayer::BayerDepth::Depth8,
        cfa,
        bayer::Demosaic::Linear,
        &mut dst,
    )
    .map_err(|e| format!("Demosaicing failed: {}", e))?;

    Array3::from_shape_vec((height, width, 3), buf).map_err(|_| "Shape mismatch".to_string())
}

pub fn save_image<P: AsRef<Utf8Path>>(
    img: &RgbImage,
    path: P,
    format: ImageFormat,
) -> Result<(), image::ImageError> {
    img.save_with_format(path.as_ref().as_std_path(), format)
}

/// Position of a persisted frame in `stamps.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecord {
    pub timestamp_ns: u64,
    pub index: u64,
}

impl CsvSaveable for ImageRecord {
    fn get_csv_headers() -> &'static str {
        STAMPS_CSV_HEADERS
    }

    fn to_csv_row(&self) -> String {
        format!("{},{}", self.timestamp_ns, self.index)
    }
}
