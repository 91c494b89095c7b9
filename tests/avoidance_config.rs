use std::sync::Mutex;

use tempfile::NamedTempFile;

use human_avoidance::config::AvoidanceConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "HUMAN_AVOIDANCE_CONFIG",
        "HUMAN_AVOIDANCE_MODEL",
        "HUMAN_AVOIDANCE_CLASSES",
        "HUMAN_AVOIDANCE_OBJECTNESS",
        "HUMAN_AVOIDANCE_CLASS_SCORE",
        "HUMAN_AVOIDANCE_NMS_IOU",
        "HUMAN_AVOIDANCE_WARNING_DISTANCE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_toml_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [model]
        path = "models/yolov5n.onnx"
        classes_path = "models/people.names"
        input_width = 320
        input_height = 320

        [thresholds]
        objectness = 0.3
        nms_iou = 0.5

        [robot]
        transform = [
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, -1.0],
            [0.0, 0.0, 0.0, 1.0],
        ]

        [source]
        width = 1280
        height = 720
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("HUMAN_AVOIDANCE_CONFIG", file.path());
    std::env::set_var("HUMAN_AVOIDANCE_NMS_IOU", "0.35");
    std::env::set_var("HUMAN_AVOIDANCE_WARNING_DISTANCE", "2.0");

    let cfg = AvoidanceConfig::load().expect("load config");

    assert_eq!(cfg.model.path, "models/yolov5n.onnx");
    assert_eq!(cfg.model.classes_path.to_str(), Some("models/people.names"));
    assert_eq!(cfg.model.input_width, 320);
    assert_eq!(cfg.thresholds.objectness, 0.3);
    assert_eq!(cfg.thresholds.class_score, 0.5);
    assert_eq!(cfg.thresholds.nms_iou, 0.35);
    assert_eq!(cfg.transform.matrix[0][3], 0.5);
    assert_eq!(cfg.transform.matrix[2][3], -1.0);
    assert_eq!(cfg.avoidance.warning_distance_m, 2.0);
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.source.height, 720);
    assert_eq!(cfg.source.target_fps, 30);

    clear_env();
}

#[test]
fn json_extension_selects_json_parser() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp config");
    let json = r#"{
        "camera": { "focal_length_mm": 8.0 },
        "avoidance": { "warning_distance_m": 0.75, "human_class_id": 2 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    let cfg = AvoidanceConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.camera.focal_length_mm, 8.0);
    assert_eq!(cfg.camera.average_human_height, 175.0);
    assert_eq!(cfg.avoidance.warning_distance_m, 0.75);
    assert_eq!(cfg.avoidance.human_class_id, 2);

    clear_env();
}

#[test]
fn env_values_are_validated() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HUMAN_AVOIDANCE_OBJECTNESS", "1.7");
    assert!(AvoidanceConfig::load().is_err());

    std::env::set_var("HUMAN_AVOIDANCE_OBJECTNESS", "high");
    assert!(AvoidanceConfig::load().is_err());

    std::env::remove_var("HUMAN_AVOIDANCE_OBJECTNESS");
    std::env::set_var("HUMAN_AVOIDANCE_WARNING_DISTANCE", "-1");
    assert!(AvoidanceConfig::load().is_err());

    clear_env();
}

#[test]
fn blank_numeric_overrides_are_ignored() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HUMAN_AVOIDANCE_WARNING_DISTANCE", "");
    std::env::set_var("HUMAN_AVOIDANCE_OBJECTNESS", "  ");
    let cfg = AvoidanceConfig::load().expect("blank overrides are skipped");
    assert_eq!(cfg.avoidance.warning_distance_m, 1.5);
    assert_eq!(cfg.thresholds.objectness, 0.45);

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HUMAN_AVOIDANCE_CONFIG", "/nonexistent/avoidance.toml");
    assert!(AvoidanceConfig::load().is_err());

    clear_env();
}

#[test]
fn defaults_load_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AvoidanceConfig::load().expect("defaults are valid");
    assert_eq!(cfg.model.path, "models/yolov5s.onnx");
    assert_eq!(cfg.thresholds.nms_score, 0.5);
    assert_eq!(cfg.avoidance.warning_distance_m, 1.5);
}
