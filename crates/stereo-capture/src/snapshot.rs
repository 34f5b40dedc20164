//! One-shot capture: grab, retrieve every output, sample a pixel, mark it, export.

use crate::export::{export_depth_txt, write_point_cloud_ply};
use crate::overlay::draw_circle;
use crate::sample::{sample_depth, DepthSample};
use crate::{
    Camera, DepthBackend, Mat, Measure, Result, RuntimeParameters, TimeReference, Timestamp, View,
};
use std::path::PathBuf;
use tracing::{debug, info};

pub const MARKER_RADIUS: u32 = 5;
/// BGR.
pub const MARKER_COLOR: [u8; 3] = [0, 0, 255];

#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    pub runtime: RuntimeParameters,
    /// Pixel whose depth is sampled and marked.
    pub sample: (u32, u32),
    /// Directory for `<timestamp_ms>.txt`; `None` skips the text export.
    pub out_dir: Option<PathBuf>,
    pub out_ply: Option<PathBuf>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            runtime: RuntimeParameters::default(),
            sample: (1000, 600),
            out_dir: Some(PathBuf::from(".")),
            out_ply: None,
        }
    }
}

/// Everything one grab produced.
#[derive(Debug)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    /// Left image with the sample marker drawn.
    pub image: Mat<u8>,
    pub depth: Mat<f32>,
    pub depth_view: Mat<u8>,
    pub point_cloud: Mat<f32>,
    pub sample: DepthSample,
    pub depth_file: Option<PathBuf>,
    pub ply_points: Option<usize>,
}

/// Run the capture workflow on an open camera.
///
/// A grab failure returns before anything is retrieved. A sample outside the
/// image returns the range error before anything is written.
pub fn capture_snapshot<B: DepthBackend>(
    camera: &mut Camera<B>,
    opts: &SnapshotOptions,
) -> Result<Snapshot> {
    camera.grab(&opts.runtime)?;

    let mut image = Mat::new();
    let mut depth = Mat::new();
    let mut depth_view = Mat::new();
    let mut point_cloud = Mat::new();
    camera.retrieve_image(&mut image, View::Left)?;
    camera.retrieve_measure(&mut depth, Measure::Depth)?;
    camera.retrieve_image(&mut depth_view, View::Depth)?;
    camera.retrieve_measure(&mut point_cloud, Measure::XyzRgba)?;
    let timestamp = camera.timestamp(TimeReference::Image)?;
    debug!(ts = %timestamp, width = image.width(), height = image.height(), "frame retrieved");

    let (x, y) = opts.sample;
    let sample = sample_depth(&depth, x, y)?;
    info!(x, y, depth = sample.value, "depth sampled");

    draw_circle(&mut image, (x, y), MARKER_RADIUS, MARKER_COLOR, 1)?;

    let depth_file = match &opts.out_dir {
        Some(dir) => Some(export_depth_txt(dir, &depth, timestamp)?),
        None => None,
    };
    let ply_points = match &opts.out_ply {
        Some(path) => Some(write_point_cloud_ply(path, &point_cloud)?),
        None => None,
    };

    Ok(Snapshot {
        timestamp,
        image,
        depth,
        depth_view,
        point_cloud,
        sample,
        depth_file,
        ply_points,
    })
}
