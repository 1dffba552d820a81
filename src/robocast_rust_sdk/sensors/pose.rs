use serde::{Deserialize, Serialize};

use super::{
    basic::{Pose, PoseWithCovariance, TwistWithCovariance},
    common::CsvSaveable,
    header::Header,
    utils::{HasHeader, RosMsg},
};

pub const POSE_STAMPED_SCHEMA_DEF: &str = "std_msgs/Header header\ngeometry_msgs/Pose pose\n================================================================================\nMSG: std_msgs/Header\nbuiltin_interfaces/Time stamp\nstring frame_id\n================================================================================\nMSG: builtin_interfaces/Time\nint32 sec\nuint32 nanosec\n================================================================================\nMSG: geometry_msgs/Pose\ngeometry_msgs/Point position\ngeometry_msgs/Quaternion orientation\n================================================================================\nMSG: geometry_msgs/Point\nfloat64 x\nfloat64 y\nfloat64 z\n================================================================================\nMSG: geometry_msgs/Quaternion\nfloat64 x\nfloat64 y\nfloat64 z\nfloat64 w\n";
pub const POSE_COV_SCHEMA_DEF: &str = "std_msgs/Header header\ngeometry_msgs/PoseWithCovariance pose\n================================================================================\nMSG: std_msgs/Header\nbuiltin_interfaces/Time stamp\nstring frame_id\n================================================================================\nMSG: builtin_interfaces/Time\nint32 sec\nuint32 nanosec\n================================================================================\nMSG: geometry_msgs/PoseWithCovariance\ngeometry_msgs/Pose pose\nfloat64[36] covariance\n================================================================================\nMSG: geometry_msgs/Pose\ngeometry_msgs/Point position\ngeometry_msgs/Quaternion orientation\n================================================================================\nMSG: geometry_msgs/Point\nfloat64 x\nfloat64 y\nfloat64 z\n================================================================================\nMSG: geometry_msgs/Quaternion\nfloat64 x\nfloat64 y\nfloat64 z\nfloat64 w\n";
pub const ODOM_SCHEMA_DEF: &str = "std_msgs/Header header\nstring child_frame_id\ngeometry_msgs/PoseWithCovariance pose\ngeometry_msgs/TwistWithCovariance twist\n================================================================================\nMSG: std_msgs/Header\nbuiltin_interfaces/Time stamp\nstring frame_id\n================================================================================\nMSG: builtin_interfaces/Time\nint32 sec\nuint32 nanosec\n================================================================================\nMSG: geometry_msgs/PoseWithCovariance\ngeometry_msgs/Pose pose\nfloat64[36] covariance\n================================================================================\nMSG: geometry_msgs/Pose\ngeometry_msgs/Point position\ngeometry_msgs/Quaternion orientation\n================================================================================\nMSG: geometry_msgs/Point\nfloat64 x\nfloat64 y\nfloat64 z\n================================================================================\nMSG: geometry_msgs/Quaternion\nfloat64 x\nfloat64 y\nfloat64 z\nfloat64 w\n================================================================================\nMSG: geometry_msgs/TwistWithCovariance\ngeometry_msgs/Twist twist\nfloat64[36] covariance\n================================================================================\nMSG: geometry_msgs/Twist\ngeometry_msgs/Vector3 linear\ngeometry_msgs/Vector3 angular\n================================================================================\nMSG: geometry_msgs/Vector3\nfloat64 x\nfloat64 y\nfloat64 z\n";

/// Column names of the pose table; the quaternion is written scalar first.
pub const POSE_CSV_HEADERS: &str = "#timestamp [ns],p_RS_R_x [m],p_RS_R_y [m],p_RS_R_z [m],q_RS_w [],q_RS_x [],q_RS_y [],q_RS_z []";

/// `geometry_msgs/PoseStamped`. The other pose carrying messages are reduced to this.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// `geometry_msgs/PoseWithCovarianceStamped`
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct PoseWithCovarianceStamped {
    pub header: Header,
    pub pose: PoseWithCovariance,
}

/// `nav_msgs/Odometry`
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Odom {
    pub header: Header,
    pub child_frame_id: String,
    pub pose: PoseWithCovariance,
    pub twist: TwistWithCovariance,
}

impl From<PoseWithCovarianceStamped> for PoseStamped {
    fn from(msg: PoseWithCovarianceStamped) -> Self {
        PoseStamped {
            header: msg.header,
            pose: msg.pose.pose,
        }
    }
}

impl From<Odom> for PoseStamped {
    fn from(odom: Odom) -> Self {
        PoseStamped {
            header: odom.header,
            pose: odom.pose.pose,
        }
    }
}

impl RosMsg for PoseStamped {
    fn get_schema_name() -> &'static str {
        "geometry_msgs/msg/PoseStamped"
    }
    fn get_schema_def() -> &'static [u8] {
        POSE_STAMPED_SCHEMA_DEF.as_bytes()
    }
}

impl RosMsg for PoseWithCovarianceStamped {
    fn get_schema_name() -> &'static str {
        "geometry_msgs/msg/PoseWithCovarianceStamped"
    }
    fn get_schema_def() -> &'static [u8] {
        POSE_COV_SCHEMA_DEF.as_bytes()
    }
}

impl RosMsg for Odom {
    fn get_schema_name() -> &'static str {
        "nav_msgs/msg/Odometry"
    }
    fn get_schema_def() -> &'static [u8] {
        ODOM_SCHEMA_DEF.as_bytes()
    }
}

impl HasHeader for PoseStamped {
    fn get_header(&self) -> &Header {
        &self.header
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRow {
    pub timestamp_ns: u64,
    pub position: [f64; 3],
    /// (w, x, y, z)
    pub orientation: [f64; 4],
}

impl PoseRow {
    pub fn from_msg(pose: &PoseStamped, timestamp_ns: u64) -> PoseRow {
        PoseRow {
            timestamp_ns,
            position: pose.pose.position.to_array(),
            orientation: pose.pose.orientation.to_wxyz(),
        }
    }
}

impl CsvSaveable for PoseRow {
    fn get_csv_headers() -> &'static str {
        POSE_CSV_HEADERS
    }

    fn to_csv_row(&self) -> String {
        let [px, py, pz] = self.position;
        let [qw, qx, qy, qz] = self.orientation;
        format!(
            "{},{},{},{},{},{},{},{}",
            self.timestamp_ns, px, py, pz, qw, qx, qy, qz
        )
    }
}
