pub mod basic;
pub mod common;
pub mod header;
pub mod image;
pub mod imu;
pub mod pose;
pub mod tf;
pub mod timestamp;
pub mod utils;
