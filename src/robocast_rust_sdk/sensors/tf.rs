use super::basic::{Quaternion, Vector3};
use super::header::Header;
use super::utils::RosMsg;
use serde::{Deserialize, Serialize};

pub const SCHEMA_DEF: &str = "geometry_msgs/TransformStamped[] transforms\n================================================================================\nMSG: geometry_msgs/TransformStamped\nstd_msgs/Header header\nstring child_frame_id\ngeometry_msgs/Transform transform\n================================================================================\nMSG: std_msgs/Header\nbuiltin_interfaces/Time stamp\nstring frame_id\n================================================================================\nMSG: builtin_interfaces/Time\nint32 sec\nuint32 nanosec\n================================================================================\nMSG: geometry_msgs/Transform\ngeometry_msgs/Vector3 translation\ngeometry_msgs/Quaternion rotation\n================================================================================\nMSG: geometry_msgs/Vector3\nfloat64 x\nfloat64 y\nfloat64 z\n================================================================================\nMSG: geometry_msgs/Quaternion\nfloat64 x\nfloat64 y\nfloat64 z\nfloat64 w\n";

pub const TF_TOPIC: &str = "/tf";
pub const TF_STATIC_TOPIC: &str = "/tf_static";

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

/// One parent → child edge. The parent frame is `header.frame_id`.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Transform,
}

impl TransformStamped {
    pub fn new(header: Header, child_frame_id: &str, transform: Transform) -> Self {
        Self {
            header,
            child_frame_id: child_frame_id.to_string(),
            transform,
        }
    }

    pub fn parent_frame_id(&self) -> &str {
        &self.header.frame_id
    }
}

/// `tf2_msgs/TFMessage`
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
pub struct TFMessage {
    pub transforms: Vec<TransformStamped>,
}

impl TFMessage {
    pub fn new() -> TFMessage {
        TFMessage {
            transforms: Vec::new(),
        }
    }

    pub fn add(&mut self, tf_stamped: TransformStamped) {
        self.transforms.push(tf_stamped);
    }
}

impl RosMsg for TFMessage {
    fn get_schema_name() -> &'static str {
        "tf2_msgs/msg/TFMessage"
    }
    fn get_schema_def() -> &'static [u8] {
        SCHEMA_DEF.as_bytes()
    }
}
