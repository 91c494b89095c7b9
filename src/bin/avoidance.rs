//! avoidance - detect humans in an image, video or camera stream
//!
//! Each frame is run through the detector, decoded, suppressed and annotated
//! with the distance and robot-frame position of every selection. Annotated
//! frames are written as PNG files when `--output` is given.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use human_avoidance::{
    load_backend, AvoidanceConfig, ClassNames, FramePipeline, FrameReport, FrameSource,
    OverlayRenderer,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input source: image file, video file, /dev/videoN or stub://name.
    #[arg(value_name = "SOURCE", required_unless_present = "image", conflicts_with = "image")]
    source: Option<String>,
    /// Single image to process.
    #[arg(long)]
    image: Option<String>,
    /// Configuration file (TOML, or JSON with a .json extension).
    #[arg(long, env = "HUMAN_AVOIDANCE_CONFIG")]
    config: Option<PathBuf>,
    /// ONNX model path, or stub://name for a detector that never fires.
    #[arg(long)]
    model: Option<String>,
    /// Class-name file, one class per line.
    #[arg(long)]
    classes: Option<PathBuf>,
    /// Directory for annotated PNG frames.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// TTF/OTF font for overlay text. Common system fonts are tried otherwise.
    #[arg(long)]
    font: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = AvoidanceConfig::load_from(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model.path = model;
    }
    if let Some(classes) = args.classes {
        config.model.classes_path = classes;
    }

    let classes = ClassNames::load(&config.model.classes_path)?;
    log::info!(
        "loaded {} classes from {}",
        classes.len(),
        config.model.classes_path.display()
    );

    let mut backend = load_backend(&config.model, classes.len())?;
    backend.warm_up().context("warm up inference backend")?;
    log::info!("inference backend: {}", backend.name());

    let mut pipeline = FramePipeline::from_config(&config, classes.len())?;
    let renderer = match &args.font {
        Some(path) => OverlayRenderer::with_font_file(path)?,
        None => OverlayRenderer::with_system_font(),
    };

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
    }

    let input = args
        .image
        .or(args.source)
        .context("an input source or --image is required")?;
    let mut source = FrameSource::open(&input, &config.source)?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let mut processed = 0u64;
    while running.load(Ordering::SeqCst) {
        if args.max_frames.is_some_and(|max| processed >= max) {
            log::info!("reached --max-frames {}", processed);
            break;
        }
        let Some(mut frame) = source.next_frame()? else {
            log::info!("source exhausted");
            break;
        };

        let started = Instant::now();
        let tensor = backend.infer(&frame.image)?;
        let inference_time = started.elapsed();

        let mut report = pipeline.process(&tensor, frame.size())?;
        report.inference_time = Some(inference_time);
        log_report(frame.sequence, &report, &classes);

        renderer.draw(&mut frame.image, &report, &classes);
        if let Some(dir) = &args.output {
            let path = dir.join(format!("frame_{:06}.png", frame.sequence));
            frame
                .image
                .save(&path)
                .with_context(|| format!("write annotated frame {}", path.display()))?;
        }
        processed += 1;
    }

    let stats = source.stats();
    log::info!(
        "processed {} frames from {} ({} captured)",
        processed,
        stats.input,
        stats.frames_captured
    );
    Ok(())
}

fn log_report(sequence: u64, report: &FrameReport, classes: &ClassNames) {
    log::debug!(
        "frame {}: {} candidates, {} selected",
        sequence,
        report.candidates,
        report.objects.len()
    );
    for object in report.humans() {
        match (object.distance_m, object.position) {
            (Some(distance), Some(position)) => log::info!(
                "frame {} {} #{}: {:.2} m at ({:.2}, {:.2}, {:.2}){}",
                sequence,
                classes.label(object.class_id()),
                object.selection.id,
                distance,
                position.x,
                position.y,
                position.z,
                if object.too_close { " TOO CLOSE" } else { "" }
            ),
            _ => log::info!(
                "frame {} {} #{}: no estimate",
                sequence,
                classes.label(object.class_id()),
                object.selection.id
            ),
        }
    }
    if report.any_too_close() {
        log::warn!("frame {}: human inside warning distance", sequence);
    }
}
