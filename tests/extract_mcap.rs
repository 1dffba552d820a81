use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;

use camino::{Utf8Path, Utf8PathBuf};
use robocast_rust_sdk::robocast_rust_sdk::sensors::basic::{Pose, Quaternion, Vector3};
use robocast_rust_sdk::robocast_rust_sdk::sensors::header::Header;
use robocast_rust_sdk::robocast_rust_sdk::sensors::image::RosImage;
use robocast_rust_sdk::robocast_rust_sdk::sensors::imu::Imu;
use robocast_rust_sdk::robocast_rust_sdk::sensors::pose::PoseStamped;
use robocast_rust_sdk::robocast_rust_sdk::sensors::tf::{
    TFMessage, Transform, TransformStamped, TF_STATIC_TOPIC, TF_TOPIC,
};
use robocast_rust_sdk::robocast_rust_sdk::sensors::timestamp::Timestamp;
use robocast_rust_sdk::robocast_rust_sdk::sensors::utils::RosMsg;
use robocast_rust_sdk::robocast_rust_sdk::{
    extract_imu, extract_transforms, process_rosbag, ExtractError, ExtractOptions, JobConfig,
    McapSource, MessageSource, Payload, PayloadKind,
};

/// Writes ROS 2 style MCAP files, one channel per topic.
struct BagBuilder {
    writer: mcap::Writer<BufWriter<File>>,
    channels: BTreeMap<String, u16>,
    sequence: u32,
}

impl BagBuilder {
    fn create(path: &Utf8Path) -> BagBuilder {
        let writer = mcap::WriteOptions::new()
            .profile("ros2")
            .create(BufWriter::new(File::create(path).unwrap()))
            .unwrap();
        BagBuilder {
            writer,
            channels: BTreeMap::new(),
            sequence: 0,
        }
    }

    fn channel<T: RosMsg>(&mut self, topic: &str, schema_name: &str) -> u16 {
        if let Some(id) = self.channels.get(topic) {
            return *id;
        }
        let schema_id = self
            .writer
            .add_schema(schema_name, "ros2msg", T::get_schema_def())
            .unwrap();
        let id = self
            .writer
            .add_channel(schema_id, topic, "cdr", &BTreeMap::new())
            .unwrap();
        self.channels.insert(topic.to_string(), id);
        id
    }

    fn write<T: RosMsg>(&mut self, topic: &str, log_time: u64, msg: &T) {
        self.write_as(topic, T::get_schema_name(), log_time, msg);
    }

    fn write_as<T: RosMsg>(&mut self, topic: &str, schema_name: &str, log_time: u64, msg: &T) {
        let channel_id = self.channel::<T>(topic, schema_name);
        let mut buffer = Vec::new();
        msg.construct_msg(&mut buffer).unwrap();
        self.sequence += 1;
        let header = mcap::records::MessageHeader {
            channel_id,
            sequence: self.sequence,
            log_time,
            publish_time: log_time,
        };
        self.writer.write_to_known_channel(&header, &buffer).unwrap();
    }

    fn finish(mut self) {
        self.writer.finish().unwrap();
    }
}

fn imu(nanos: u64, wz: f64) -> Imu {
    let mut imu = Imu::new(Header::new(Timestamp::from_nanos(nanos), "imu_link").unwrap());
    imu.angular_velocity = Vector3::new(0.0, 0.0, wz);
    imu.linear_acceleration = Vector3::new(0.0, 0.0, 9.81);
    imu
}

fn pose(nanos: u64, x: f64) -> PoseStamped {
    PoseStamped {
        header: Header::new(Timestamp::from_nanos(nanos), "map").unwrap(),
        pose: Pose {
            position: Vector3::new(x, 0.0, 0.0),
            orientation: Quaternion::new(0.0, 0.0, 0.0, 1.0),
        },
    }
}

fn frame(nanos: u64) -> RosImage {
    RosImage {
        header: Header::new(Timestamp::from_nanos(nanos), "camera").unwrap(),
        height: 2,
        width: 3,
        encoding: "rgb8".to_string(),
        is_bigendian: 0,
        step: 9,
        data: (0..18).collect(),
    }
}

fn tf(parent: &str, child: &str, x: f64) -> TFMessage {
    let mut msg = TFMessage::new();
    msg.add(TransformStamped::new(
        Header::new(Timestamp::from_nanos(0), parent).unwrap(),
        child,
        Transform {
            translation: Vector3::new(x, 0.0, 0.0),
            rotation: Quaternion::identity(),
        },
    ));
    msg
}

fn workspace() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap().to_path_buf();
    (dir, root)
}

fn write_run(path: &Utf8Path) {
    let mut bag = BagBuilder::create(path);
    bag.write(TF_STATIC_TOPIC, 1_000, &tf("base_link", "camera", 0.2));
    for i in 0..3u64 {
        let t = 1_000_000_000 + i * 100_000_000;
        bag.write("/camera/image_raw", t, &frame(t - 5));
        bag.write("/imu/data", t + 1, &imu(t, 0.1 * i as f64));
        bag.write("/ground_truth", t + 2, &pose(t, i as f64));
        bag.write(TF_TOPIC, t + 3, &tf("odom", "base_link", i as f64));
    }
    bag.finish();
}

#[test]
fn mcap_source_reads_back_written_records() {
    let (_dir, root) = workspace();
    let path = root.join("run.mcap");
    write_run(&path);

    let source = McapSource::open(&path).unwrap();
    let summary = source.summary().unwrap().unwrap();
    assert_eq!(summary.message_count, 13);
    assert!(source.topics().contains(&"/imu/data".to_string()));
    assert_eq!(source.message_count(&[]), Some(13));
    assert_eq!(source.message_count(&["/imu/data"]), Some(3));
    assert_eq!(source.message_count(&[TF_TOPIC, TF_STATIC_TOPIC]), Some(4));
    assert_eq!(source.message_count(&["/missing"]), Some(0));

    let messages: Vec<_> = source
        .read_messages(&["/imu/data"])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].index, 2);
    assert!(matches!(messages[0].payload, Payload::Imu(_)));

    let table = extract_imu(&source, "/imu/data", &ExtractOptions::default()).unwrap();
    let stamps: Vec<u64> = table.rows().iter().map(|r| r.timestamp_ns).collect();
    assert_eq!(stamps, vec![1_000_000_000, 1_100_000_000, 1_200_000_000]);

    let tree = extract_transforms(&source, &ExtractOptions::default()).unwrap();
    assert_eq!(tree.get("base_link").unwrap().len(), 3);
    assert_eq!(tree.get("camera").unwrap().len(), 1);
    source.close();
}

#[test]
fn job_writes_every_artifact() {
    let (_dir, root) = workspace();
    let bag_dir = root.join("run_0");
    fs::create_dir_all(&bag_dir).unwrap();
    write_run(&bag_dir.join("run_0_0.mcap"));

    let output = root.join("dataset");
    let job = JobConfig::from_yaml(&format!(
        "input: {}
output: {}
images:
  topic: /camera/image_raw
  dir: cam0
imu:
  topic: /imu/data
poses:
  topic: /ground_truth
  file: gt.csv
transforms: {{}}
",
        bag_dir, output
    ))
    .unwrap();

    let summary = process_rosbag(&job).unwrap();
    assert_eq!(summary.images, Some(3));
    assert_eq!(summary.imu_rows, Some(3));
    assert_eq!(summary.pose_rows, Some(3));
    assert_eq!(summary.transform_frames, Some(2));
    assert_eq!(summary.transform_samples, Some(4));

    for i in 0..3 {
        assert!(output.join("cam0").join(format!("{}.bmp", i)).is_file());
    }
    let stamps = fs::read_to_string(output.join("cam0").join("stamps.csv")).unwrap();
    assert_eq!(
        stamps,
        "timestamp(ns),image_idx\n1000000000,0\n1100000000,1\n1200000000,2\n"
    );

    let imu_csv = fs::read_to_string(output.join("imu.csv")).unwrap();
    let mut lines = imu_csv.lines();
    assert!(lines.next().unwrap().starts_with("#timestamp [ns],w_RS_S_x [rad s^-1]"));
    assert_eq!(lines.next().unwrap(), "1000000000,0,0,0,0,0,9.81");
    assert_eq!(lines.count(), 2);

    let poses_csv = fs::read_to_string(output.join("gt.csv")).unwrap();
    assert_eq!(poses_csv.lines().nth(2).unwrap(), "1100000000,1,0,0,1,0,0,0");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("transforms.json")).unwrap())
            .unwrap();
    assert_eq!(json["base_link"].as_array().unwrap().len(), 3);
    assert_eq!(json["camera"][0]["parent_frame_id"], "base_link");
}

#[test]
fn job_reports_missing_topic() {
    let (_dir, root) = workspace();
    let path = root.join("run.mcap");
    write_run(&path);

    let mut job = JobConfig::new(path, root.join("out"));
    job.imu = Some(robocast_rust_sdk::robocast_rust_sdk::config::TableJob {
        topic: "/imu/missing".to_string(),
        file: None,
    });
    let err = process_rosbag(&job).unwrap_err();
    match err.downcast_ref::<ExtractError>() {
        Some(ExtractError::EmptyTopic { topic, available }) => {
            assert_eq!(topic, "/imu/missing");
            assert!(available.contains(&"/imu/data".to_string()));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!root.join("out").join("imu.csv").exists());
}

#[test]
fn schema_override_decodes_custom_names() {
    let (_dir, root) = workspace();
    let path = root.join("custom.mcap");
    let mut bag = BagBuilder::create(&path);
    bag.write_as("/vn100/imu", "vectornav_msgs/msg/ImuRaw", 10, &imu(10, 0.5));
    bag.finish();

    let source = McapSource::open(&path).unwrap();
    let err = extract_imu(&source, "/vn100/imu", &ExtractOptions::default()).unwrap_err();
    assert!(err.is_malformed());

    let source = source.with_schema("/vn100/imu", PayloadKind::Imu);
    let table = extract_imu(&source, "/vn100/imu", &ExtractOptions::default()).unwrap();
    assert_eq!(table.rows()[0].angular_velocity, [0.0, 0.0, 0.5]);
}

#[test]
fn unreadable_bag_is_source_io() {
    let (_dir, root) = workspace();
    let path = root.join("broken.mcap");
    fs::write(&path, b"not an mcap file").unwrap();
    let source = McapSource::open(&path).unwrap();
    let err = match source.read_messages(&[]) {
        Err(e) => e,
        Ok(mut iter) => iter.next().unwrap().unwrap_err(),
    };
    assert!(matches!(err, ExtractError::SourceIo { .. }), "{}", err);
}
