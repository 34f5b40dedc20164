use crate::export::pack_rgba;
use crate::{
    CameraInformation, DepthBackend, Error, InitParameters, Mat, MatType, Measure, Result,
    RuntimeParameters, TimeReference, Timestamp, View,
};
use tracing::{debug, info, warn};

/// Bundle kept from the last successful grab, already filtered and in the configured unit.
struct Frame {
    timestamp: Timestamp,
    width: u32,
    height: u32,
    left_bgra: Vec<u8>,
    /// `None` when the grab ran with depth disabled.
    depth: Option<Vec<f32>>,
}

/// A capture session. Closing is idempotent and also happens on drop.
pub struct Camera<B: DepthBackend> {
    backend: Option<B>,
    params: InitParameters,
    info: CameraInformation,
    frame: Option<Frame>,
    last_timestamp: Option<Timestamp>,
}

impl<B: DepthBackend> Camera<B> {
    /// Validate `params` and open the backend. No grab is attempted on failure.
    pub fn open(params: InitParameters) -> Result<Self> {
        params.validate()?;
        let backend = B::open(&params)?;
        let mut info = backend.information();
        info.calibration.baseline = params.unit.from_millimeters(info.calibration.baseline);
        info!(
            serial = info.serial_number,
            resolution = %info.resolution,
            fps = info.fps,
            depth_mode = params.depth_mode.as_str(),
            unit = params.unit.as_str(),
            "camera opened"
        );
        Ok(Self {
            backend: Some(backend),
            params,
            info,
            frame: None,
            last_timestamp: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn init_parameters(&self) -> &InitParameters {
        &self.params
    }

    /// Device information; baseline is in the configured unit.
    pub fn camera_information(&self) -> Result<&CameraInformation> {
        self.ensure_open()?;
        Ok(&self.info)
    }

    pub fn backend(&self) -> Result<&B> {
        self.backend.as_ref().ok_or(Error::Closed)
    }

    /// Capture one synchronized frame. On failure the previous frame is discarded.
    pub fn grab(&mut self, runtime: &RuntimeParameters) -> Result<()> {
        self.frame = None;
        runtime.validate()?;
        let backend = self.backend.as_mut().ok_or(Error::Closed)?;
        let raw = backend.grab(runtime)?;

        if let Some(prev) = self.last_timestamp {
            if raw.timestamp <= prev {
                return Err(Error::Capture(format!(
                    "timestamp {} not after previous {}",
                    raw.timestamp, prev
                )));
            }
        }
        let expected = raw.width as usize * raw.height as usize;
        if raw.depth_mm.len() != expected
            || raw.confidence.len() != expected
            || raw.left_bgra.len() != expected * 4
        {
            return Err(Error::Capture("backend returned inconsistent buffers".into()));
        }

        let depth = runtime.enable_depth.then(|| {
            let (min_mm, max_mm) = self.params.depth_range_mm();
            let unit = self.params.unit;
            raw.depth_mm
                .iter()
                .zip(&raw.confidence)
                .map(|(&z, &conf)| {
                    if z.is_finite() && z >= min_mm && z <= max_mm && runtime.keeps(conf) {
                        unit.from_millimeters(z)
                    } else {
                        f32::NAN
                    }
                })
                .collect::<Vec<f32>>()
        });

        debug!(ts = %raw.timestamp, depth = depth.is_some(), "grab ok");
        self.last_timestamp = Some(raw.timestamp);
        self.frame = Some(Frame {
            timestamp: raw.timestamp,
            width: raw.width,
            height: raw.height,
            left_bgra: raw.left_bgra,
            depth,
        });
        Ok(())
    }

    pub fn timestamp(&self, reference: TimeReference) -> Result<Timestamp> {
        self.ensure_open()?;
        match reference {
            TimeReference::Current => Ok(Timestamp::now()),
            TimeReference::Image => self
                .frame
                .as_ref()
                .map(|f| f.timestamp)
                .ok_or(Error::NoFrame("no successful grab")),
        }
    }

    /// Copy an image view of the last frame into `out` (BGRA).
    pub fn retrieve_image(&self, out: &mut Mat<u8>, view: View) -> Result<()> {
        let frame = self.current_frame()?;
        let depth = match view {
            View::Left => None,
            View::Depth => Some(
                frame
                    .depth
                    .as_deref()
                    .ok_or(Error::NoFrame("depth disabled for this grab"))?,
            ),
        };
        out.reset(frame.width, frame.height, MatType::U8C4)?;
        match depth {
            None => out.data_mut().copy_from_slice(&frame.left_bgra),
            Some(depth) => render_depth_view(depth, out.data_mut()),
        }
        out.set_timestamp(frame.timestamp);
        Ok(())
    }

    /// Copy a measure of the last frame into `out`.
    pub fn retrieve_measure(&self, out: &mut Mat<f32>, measure: Measure) -> Result<()> {
        let frame = self.current_frame()?;
        let depth = frame
            .depth
            .as_deref()
            .ok_or(Error::NoFrame("depth disabled for this grab"))?;
        match measure {
            Measure::Depth => {
                out.reset(frame.width, frame.height, MatType::F32C1)?;
                out.data_mut().copy_from_slice(depth);
            }
            Measure::XyzRgba => {
                out.reset(frame.width, frame.height, MatType::F32C4)?;
                let calib = &self.info.calibration;
                let w = frame.width as usize;
                let points = out.data_mut().chunks_exact_mut(4);
                for (i, (&z, px)) in depth.iter().zip(points).enumerate() {
                    let u = (i % w) as f32;
                    let v = (i / w) as f32;
                    let b = &frame.left_bgra[i * 4..i * 4 + 4];
                    let colour = pack_rgba([b[2], b[1], b[0], b[3]]);
                    if z.is_finite() {
                        px[0] = (u - calib.cx) * z / calib.fx;
                        px[1] = (v - calib.cy) * z / calib.fy;
                        px[2] = z;
                    } else {
                        px[..3].fill(f32::NAN);
                    }
                    px[3] = colour;
                }
            }
        }
        out.set_timestamp(frame.timestamp);
        Ok(())
    }

    /// Release the session. Further calls fail with [`Error::Closed`].
    pub fn close(&mut self) {
        self.frame = None;
        if let Some(mut backend) = self.backend.take() {
            backend.close();
            info!(serial = self.info.serial_number, "camera closed");
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.backend.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn current_frame(&self) -> Result<&Frame> {
        self.ensure_open()?;
        self.frame.as_ref().ok_or(Error::NoFrame("no successful grab"))
    }
}

impl<B: DepthBackend> Drop for Camera<B> {
    fn drop(&mut self) {
        if self.backend.is_some() {
            warn!("camera dropped without close; closing");
            self.close();
        }
    }
}

/// Gray BGRA rendering: nearest valid depth is white, farthest is dark, unresolved is black.
fn render_depth_view(depth: &[f32], out: &mut [u8]) {
    let (lo, hi) = depth
        .iter()
        .filter(|z| z.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &z| {
            (lo.min(z), hi.max(z))
        });
    let span = hi - lo;
    for (&z, px) in depth.iter().zip(out.chunks_exact_mut(4)) {
        let g = if !z.is_finite() {
            0
        } else if span <= 0.0 {
            255
        } else {
            (30.0 + 225.0 * (1.0 - (z - lo) / span)).round() as u8
        };
        px.copy_from_slice(&[g, g, g, 255]);
    }
}
