use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

use stereo_capture::pacing::FramePacer;
use stereo_capture::recording::{Recording, Scene};
use stereo_capture::snapshot::{capture_snapshot, SnapshotOptions};
use stereo_capture::{
    Camera, DepthMode, Element, ErrorKind, InitParameters, InputSource, Resolution,
    SyntheticCamera, TimeReference, Timestamp, Unit,
};

mod config;
use config::{load_config_file, CaptureConfig};

#[derive(Parser, Debug)]
#[command(
    name = "depth",
    version,
    about = "Stereo depth camera snapshot tool",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Camera options shared by every command that opens a session.
#[derive(Args, Debug, Clone, Default)]
struct CameraArgs {
    /// YAML settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Resolution: hd2k, hd1080, hd720, vga
    #[arg(long)]
    resolution: Option<Resolution>,
    /// Frames per second (0 picks the resolution default)
    #[arg(long)]
    fps: Option<u32>,
    /// Depth mode: performance, quality, ultra, neural
    #[arg(long)]
    depth_mode: Option<DepthMode>,
    /// Unit: mm, cm, m, in, ft
    #[arg(long)]
    unit: Option<Unit>,
    /// Live device index or serial number
    #[arg(long, conflicts_with = "playback")]
    device: Option<String>,
    /// Recorded scene file to replay instead of a live device
    #[arg(long)]
    playback: Option<PathBuf>,
    /// Confidence threshold 0..=100
    #[arg(long)]
    confidence: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grab one frame, print diagnostics, sample a pixel and export the depth matrix
    Snapshot {
        #[command(flatten)]
        camera: CameraArgs,
        /// Pixel column to sample
        #[arg(long)]
        x: Option<u32>,
        /// Pixel row to sample
        #[arg(long)]
        y: Option<u32>,
        /// Directory for <timestamp_ms>.txt
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Skip the text export
        #[arg(long, action = ArgAction::SetTrue)]
        no_export: bool,
        /// Also write the point cloud as PLY
        #[arg(long)]
        out_ply: Option<PathBuf>,
        /// Show the left image and the depth view (needs the opencv feature)
        #[arg(long, action = ArgAction::SetTrue)]
        display: bool,
    },
    /// Grab several frames and report timestamps and dropped frames
    Grab {
        #[command(flatten)]
        camera: CameraArgs,
        /// Number of frames to grab
        #[arg(long, default_value_t = 10u32)]
        count: u32,
    },
    /// Print camera information as YAML
    Info {
        #[command(flatten)]
        camera: CameraArgs,
    },
    /// Write a scene file for playback with the synthetic backend
    RecordScene {
        /// Output YAML path
        #[arg(long, default_value = "scene.yaml")]
        out: PathBuf,
        #[arg(long, default_value = "hd1080")]
        resolution: Resolution,
        #[arg(long, default_value_t = 30u32)]
        fps: u32,
        /// Number of frames in the recording
        #[arg(long, default_value_t = 100u64)]
        frames: u64,
        /// First frame timestamp in ns since the epoch (defaults to now)
        #[arg(long)]
        start_ns: Option<u64>,
    },
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot {
            camera,
            x,
            y,
            out_dir,
            no_export,
            out_ply,
            display,
        } => {
            let mut cfg = resolve_config(&camera)?;
            if let (Some(x), Some(y)) = (x, y) {
                cfg.sample = Some([x, y]);
            } else if x.is_some() || y.is_some() {
                anyhow::bail!("--x and --y must be given together");
            }
            if out_dir.is_some() {
                cfg.out_dir = out_dir;
            }
            if no_export {
                cfg.out_dir = None;
            } else if cfg.out_dir.is_none() {
                cfg.out_dir = Some(PathBuf::from("."));
            }
            if out_ply.is_some() {
                cfg.out_ply = out_ply;
            }
            cfg.display |= display;
            snapshot(cfg)
        }
        Commands::Grab { camera, count } => grab_frames(resolve_config(&camera)?, count),
        Commands::Info { camera } => camera_info(resolve_config(&camera)?),
        Commands::RecordScene {
            out,
            resolution,
            fps,
            frames,
            start_ns,
        } => record_scene(&out, resolution, fps, frames, start_ns),
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Config file (if any) with command-line overrides applied.
fn resolve_config(args: &CameraArgs) -> Result<CaptureConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config_file(path)?,
        None => CaptureConfig::default(),
    };
    apply_overrides(&mut cfg, args);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut CaptureConfig, args: &CameraArgs) {
    let init = &mut cfg.init;
    if let Some(r) = args.resolution {
        init.resolution = r;
    }
    if let Some(fps) = args.fps {
        init.fps = fps;
    }
    if let Some(mode) = args.depth_mode {
        init.depth_mode = mode;
    }
    if let Some(unit) = args.unit {
        init.unit = unit;
    }
    if let Some(device) = &args.device {
        init.input = InputSource::Live {
            device: device.clone(),
        };
    }
    if let Some(path) = &args.playback {
        init.input = InputSource::Playback { path: path.clone() };
    }
    if let Some(c) = args.confidence {
        cfg.runtime.confidence_threshold = c;
    }
}

fn open_camera(init: InitParameters) -> Result<Camera<SyntheticCamera>> {
    Camera::open(init).map_err(|e| {
        error!(error = %e, "camera open failed");
        anyhow::anyhow!("camera open failed: {e}")
    })
}

fn snapshot(cfg: CaptureConfig) -> Result<()> {
    let mut camera = open_camera(cfg.init.clone())?;
    println!(
        "Hello! This is my serial number: {}",
        camera.camera_information()?.serial_number
    );

    let [x, y] = cfg.sample.unwrap_or([1000, 600]);
    let opts = SnapshotOptions {
        runtime: cfg.runtime,
        sample: (x, y),
        out_dir: cfg.out_dir.clone(),
        out_ply: cfg.out_ply.clone(),
    };

    let snap = match capture_snapshot(&mut camera, &opts) {
        Ok(snap) => snap,
        Err(e) if e.kind() == ErrorKind::Capture => {
            warn!(error = %e, "grab failed; skipping retrieval and export");
            camera.close();
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, x, y, "snapshot failed; nothing exported");
            camera.close();
            return Err(anyhow::anyhow!("snapshot failed: {e}"));
        }
    };

    println!(
        "Image resolution: {} x {} || Image timestamp: {}\n",
        snap.image.width(),
        snap.image.height(),
        snap.timestamp.as_millis()
    );
    let depth = &snap.depth;
    println!(
        "{}\n{}\n{}\n{}",
        depth.pixel_bytes(),
        depth
            .data_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "n/a".into()),
        depth.infos(),
        depth.step_bytes()
    );
    let (rows, cols, channels) = depth.shape();
    if channels == 1 {
        println!("({rows}, {cols})");
    } else {
        println!("({rows}, {cols}, {channels})");
    }
    println!("{}", <f32 as Element>::NAME);
    println!("The depth of the {} {} is {}", x, y, snap.sample);

    if cfg.display {
        for (title, image) in [("LEFT View", &snap.image), ("Depth View", &snap.depth_view)] {
            if let Err(e) = stereo_capture::display::show_until_key(title, image) {
                warn!(window = title, error = %e, "display skipped");
            }
        }
    }

    if let Some(path) = &snap.depth_file {
        println!("depth matrix written to {}", path.display());
    }
    if let (Some(path), Some(n)) = (&cfg.out_ply, snap.ply_points) {
        println!("point cloud ({n} points) written to {}", path.display());
    }

    camera.close();
    Ok(())
}

fn grab_frames(cfg: CaptureConfig, count: u32) -> Result<()> {
    let mut camera = open_camera(cfg.init.clone())?;
    let fps = camera.camera_information()?.fps;
    let mut pacer = FramePacer::new(fps);
    println!("frame\tts_ms\tutc\tdelta_ms\tdropped");

    for i in 0..count {
        if let Err(e) = camera.grab(&cfg.runtime) {
            warn!(frame = i, error = %e, "grab failed; stopping");
            break;
        }
        let ts = camera.timestamp(TimeReference::Image)?;
        let report = pacer.observe(ts);
        println!(
            "{}\t{}\t{}\t{}\t{}",
            i,
            ts.as_millis(),
            format_utc(ts),
            report
                .map(|r| format!("{:.3}", r.delta_ns as f64 / 1e6))
                .unwrap_or_else(|| "-".into()),
            report.map(|r| r.dropped).unwrap_or(0)
        );
    }
    info!(
        frames = pacer.frames(),
        dropped = pacer.dropped_total(),
        "grab finished"
    );
    camera.close();
    Ok(())
}

fn format_utc(ts: Timestamp) -> String {
    ts.to_datetime()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| "-".into())
}

fn camera_info(cfg: CaptureConfig) -> Result<()> {
    let mut camera = open_camera(cfg.init)?;
    let yaml = serde_yaml::to_string(camera.camera_information()?)?;
    print!("{yaml}");
    camera.close();
    Ok(())
}

fn record_scene(
    out: &Path,
    resolution: Resolution,
    fps: u32,
    frames: u64,
    start_ns: Option<u64>,
) -> Result<()> {
    let rec = Recording {
        serial_number: stereo_capture::SYNTHETIC_SERIAL,
        resolution,
        fps,
        frame_count: frames,
        start_ns: start_ns.unwrap_or_else(|| Timestamp::now().as_nanos()),
        scene: Scene::default(),
    };
    rec.validate()
        .map_err(|e| anyhow::anyhow!("invalid scene: {e}"))?;
    rec.save(out)
        .map_err(|e| anyhow::anyhow!("write scene failed: {e}"))?;
    println!("scene written to {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_capture::RuntimeParameters;

    #[test]
    fn test_cli_parses_snapshot() {
        let cli = Cli::try_parse_from([
            "depth",
            "snapshot",
            "--resolution",
            "hd1080",
            "--fps",
            "30",
            "--depth-mode",
            "performance",
            "--unit",
            "mm",
            "--x",
            "1000",
            "--y",
            "600",
        ])
        .unwrap();
        match cli.command {
            Commands::Snapshot { camera, x, y, .. } => {
                assert_eq!(camera.resolution, Some(Resolution::Hd1080));
                assert_eq!(camera.unit, Some(Unit::Millimeter));
                assert_eq!((x, y), (Some(1000), Some(600)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_device_conflicts_with_playback() {
        let res = Cli::try_parse_from([
            "depth",
            "info",
            "--device",
            "0",
            "--playback",
            "scene.yaml",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut cfg = CaptureConfig::default();
        cfg.init.resolution = Resolution::Vga;
        cfg.runtime.confidence_threshold = 10;
        let args = CameraArgs {
            resolution: Some(Resolution::Hd720),
            playback: Some(PathBuf::from("rec.yaml")),
            confidence: Some(70),
            ..Default::default()
        };
        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.init.resolution, Resolution::Hd720);
        assert_eq!(
            cfg.init.input,
            InputSource::Playback {
                path: PathBuf::from("rec.yaml")
            }
        );
        assert_eq!(cfg.runtime.confidence_threshold, 70);
        assert_eq!(
            cfg.runtime,
            RuntimeParameters {
                confidence_threshold: 70,
                enable_depth: true
            }
        );
    }

    #[test]
    fn test_open_unknown_device_fails() {
        let init = InitParameters {
            input: InputSource::Live {
                device: "9".into(),
            },
            ..Default::default()
        };
        assert!(open_camera(init).is_err());
    }

    #[test]
    fn test_record_scene_then_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("scene.yaml");
        record_scene(&scene, Resolution::Vga, 30, 2, Some(1_000_000_000)).unwrap();

        let mut cfg = CaptureConfig::default();
        cfg.init.input = InputSource::Playback { path: scene };
        cfg.sample = Some([100, 100]);
        cfg.out_dir = Some(dir.path().to_path_buf());
        snapshot(cfg).unwrap();
        assert!(dir.path().join("1000.txt").exists());
    }
}
