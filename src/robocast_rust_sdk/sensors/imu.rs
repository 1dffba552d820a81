use super::basic::{Quaternion, Vector3};
use super::common::CsvSaveable;
use super::header::Header;
use super::utils::{HasHeader, RosMsg};
use serde::{Deserialize, Serialize};

pub const SCHEMA_DEF: &str = "std_msgs/Header header\ngeometry_msgs/Quaternion orientation\nfloat64[9] orientation_covariance\ngeometry_msgs/Vector3 angular_velocity\nfloat64[9] angular_velocity_covariance\ngeometry_msgs/Vector3 linear_acceleration\nfloat64[9] linear_acceleration_covariance\n================================================================================\nMSG: std_msgs/Header\nbuiltin_interfaces/Time stamp\nstring frame_id\n================================================================================\nMSG: builtin_interfaces/Time\nint32 sec\nuint32 nanosec\n================================================================================\nMSG: geometry_msgs/Quaternion\nfloat64 x\nfloat64 y\nfloat64 z\nfloat64 w\n================================================================================\nMSG: geometry_msgs/Vector3\nfloat64 x\nfloat64 y\nfloat64 z\n";

/// Column names of the IMU table. Names and units follow the EuRoC dataset layout.
pub const IMU_CSV_HEADERS: &str = "#timestamp [ns],w_RS_S_x [rad s^-1],w_RS_S_y [rad s^-1],w_RS_S_z [rad s^-1],a_RS_S_x [m s^-2],a_RS_S_y [m s^-2],a_RS_S_z [m s^-2]";

/// `sensor_msgs/Imu`
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Imu {
    pub header: Header,
    pub orientation: Quaternion,
    pub orientation_covariance: [f64; 9],
    pub angular_velocity: Vector3,
    pub angular_velocity_covariance: [f64; 9],
    pub linear_acceleration: Vector3,
    pub linear_acceleration_covariance: [f64; 9],
}

impl Imu {
    pub fn new(header: Header) -> Imu {
        Imu {
            header,
            orientation: Quaternion::identity(),
            orientation_covariance: [0f64; 9],
            angular_velocity: Vector3::default(),
            angular_velocity_covariance: [0f64; 9],
            linear_acceleration: Vector3::default(),
            linear_acceleration_covariance: [0f64; 9],
        }
    }
}

impl RosMsg for Imu {
    fn get_schema_name() -> &'static str {
        "sensor_msgs/msg/Imu"
    }
    fn get_schema_def() -> &'static [u8] {
        SCHEMA_DEF.as_bytes()
    }
}

impl HasHeader for Imu {
    fn get_header(&self) -> &Header {
        &self.header
    }
}

/// One IMU sample: header stamp, gyro, accelerometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuRow {
    pub timestamp_ns: u64,
    pub angular_velocity: [f64; 3],
    pub linear_acceleration: [f64; 3],
}

impl ImuRow {
    pub fn from_msg(imu: &Imu, timestamp_ns: u64) -> ImuRow {
        ImuRow {
            timestamp_ns,
            angular_velocity: imu.angular_velocity.to_array(),
            linear_acceleration: imu.linear_acceleration.to_array(),
        }
    }
}

impl CsvSaveable for ImuRow {
    fn get_csv_headers() -> &'static str {
        IMU_CSV_HEADERS
    }

    fn to_csv_row(&self) -> String {
        let [wx, wy, wz] = self.angular_velocity;
        let [ax, ay, az] = self.linear_acceleration;
        format!(
            "{},{},{},{},{},{},{}",
            self.timestamp_ns, wx, wy, wz, ax, ay, az
        )
    }
}
