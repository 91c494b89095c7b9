use human_avoidance::config::{AvoidanceConfig, SourceSettings};
use human_avoidance::detect::{FixedOutputBackend, YOLOV5_ROWS};
use human_avoidance::{
    ClassNames, FramePipeline, FrameSize, FrameSource, InferenceBackend, OverlayRenderer,
    PipelineStage, RawDetectionTensor,
};

const NUM_CLASSES: usize = 80;
const DIMS: usize = NUM_CLASSES + 5;

fn coco_like_classes() -> ClassNames {
    let names: Vec<String> = std::iter::once("person".to_string())
        .chain((1..NUM_CLASSES).map(|i| format!("object{}", i)))
        .collect();
    ClassNames::new(names).expect("non-empty class list")
}

/// Tensor with `YOLOV5_ROWS` empty slots and the given rows written at the front.
fn yolov5_output(rows: &[[f32; 6]]) -> RawDetectionTensor {
    let mut data = vec![0.0f32; YOLOV5_ROWS * DIMS];
    for (slot, row) in rows.iter().enumerate() {
        let base = slot * DIMS;
        data[base..base + 6].copy_from_slice(row);
    }
    RawDetectionTensor::new(data, YOLOV5_ROWS, DIMS).expect("valid tensor")
}

fn pipeline() -> FramePipeline {
    FramePipeline::from_config(&AvoidanceConfig::default(), NUM_CLASSES).expect("valid pipeline")
}

#[test]
fn single_normalized_row_gives_one_selection() {
    let tensor = yolov5_output(&[[0.5, 0.5, 0.2, 0.4, 0.9, 0.8]]);
    let mut pipeline = pipeline();

    let report = pipeline
        .process(&tensor, FrameSize::new(640, 480))
        .expect("frame processes");

    assert_eq!(report.candidates, 1);
    assert_eq!(report.objects.len(), 1);
    let object = &report.objects[0];
    assert_eq!(object.selection.id, 1);
    assert_eq!(object.class_id(), 0);
    assert!((object.confidence() - 0.9).abs() < 1e-6);
    // sub-pixel box: height truncates to zero, so the estimate is skipped
    assert_eq!(object.bbox().height, 0);
    assert_eq!(report.skipped, 1);
    assert!(object.distance_m.is_none());
    assert_eq!(pipeline.stage(), PipelineStage::Done);
}

#[test]
fn pixel_space_row_is_rescaled_and_estimated() {
    let tensor = yolov5_output(&[[320.0, 320.0, 128.0, 512.0, 0.9, 0.8]]);
    let mut pipeline = pipeline();

    let report = pipeline
        .process(&tensor, FrameSize::new(640, 480))
        .expect("frame processes");

    assert_eq!(report.objects.len(), 1);
    let object = &report.objects[0];
    // x factor 1.0, y factor 0.75
    assert_eq!(object.bbox().left, 256);
    assert_eq!(object.bbox().top, 48);
    assert_eq!(object.bbox().width, 128);
    assert_eq!(object.bbox().height, 384);
    assert!(object.is_human);

    let expected = 175.0 * 16.0 / (25.0 * 384.0 / 480.0) / 100.0;
    let distance = object.distance_m.expect("distance estimated");
    assert!((distance - expected).abs() < 1e-9);
    assert!(object.too_close);
    let position = object.position.expect("position estimated");
    assert!((position.z - (distance - 2.0)).abs() < 1e-12);
    assert_eq!(report.nearest_human().map(|o| o.selection.id), Some(1));
}

#[test]
fn stub_chain_runs_source_backend_pipeline_and_renderer() {
    let classes = coco_like_classes();
    let settings = SourceSettings {
        width: 160,
        height: 120,
        target_fps: 10,
    };
    let mut source = FrameSource::open("stub://e2e", &settings).expect("stub source opens");
    let mut backend = FixedOutputBackend::new(
        FrameSize::new(640, 640),
        yolov5_output(&[[320.0, 320.0, 200.0, 400.0, 0.95, 0.9]]),
    );
    backend.warm_up().expect("warm up");
    let mut pipeline = pipeline();
    let renderer = OverlayRenderer::new();

    for _ in 0..3 {
        let mut frame = source.next_frame().expect("capture").expect("frame");
        let tensor = backend.infer(&frame.image).expect("inference");
        let report = pipeline.process(&tensor, frame.size()).expect("process");
        assert_eq!(report.objects.len(), 1);
        assert_eq!(report.humans().count(), 1);
        renderer.draw(&mut frame.image, &report, &classes);
        assert_eq!(frame.size(), FrameSize::new(160, 120));
    }
    assert_eq!(source.stats().frames_captured, 3);
}

#[test]
fn still_image_source_yields_exactly_one_frame() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("frame.png");
    image::RgbImage::new(64, 48).save(&path).expect("write png");

    let mut source =
        FrameSource::open(path.to_str().expect("utf-8 path"), &SourceSettings::default())
            .expect("image opens");
    let frame = source.next_frame().expect("read").expect("one frame");
    assert_eq!(frame.size(), FrameSize::new(64, 48));
    assert!(source.next_frame().expect("read").is_none());
}

#[test]
fn short_class_file_is_rejected_at_decode_time() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("short.names");
    std::fs::write(&path, "person\nbicycle\n").expect("write classes");
    let classes = ClassNames::load(&path).expect("class file parses");

    let tensor = yolov5_output(&[[320.0, 320.0, 200.0, 400.0, 0.95, 0.9]]);
    let mut pipeline = FramePipeline::from_config(&AvoidanceConfig::default(), classes.len())
        .expect("person is class 0");
    assert!(pipeline.process(&tensor, FrameSize::new(640, 480)).is_err());
}

#[test]
fn human_class_id_must_exist_in_class_list() {
    let mut config = AvoidanceConfig::default();
    config.avoidance.human_class_id = NUM_CLASSES;
    assert!(FramePipeline::from_config(&config, NUM_CLASSES).is_err());
}
