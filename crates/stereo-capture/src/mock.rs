use crate::recording::{Recording, Scene};
use crate::traits::RawFrame;
use crate::{
    CalibrationParameters, CameraInformation, DepthBackend, Error, InitParameters, InputSource,
    Resolution, Result, RuntimeParameters, Timestamp,
};
use tracing::{debug, warn};

/// Serial number reported by the synthetic live device.
pub const SYNTHETIC_SERIAL: u32 = 30_635_524;
const MODEL: &str = "synthetic-stereo";
const FIRMWARE_VERSION: u32 = 1523;
const HFOV_DEG: f32 = 110.0;
const BASELINE_MM: f32 = 120.0;
/// Sub-pixel disparity error of the fastest depth mode.
const DISPARITY_NOISE_PX: f32 = 0.1;

/// Left-eye intrinsics for a resolution, millimetre baseline.
pub fn intrinsics(resolution: Resolution) -> CalibrationParameters {
    let (w, h) = resolution.dimensions();
    let fx = (w as f32 / 2.0) / (HFOV_DEG / 2.0).to_radians().tan();
    CalibrationParameters {
        fx,
        fy: fx,
        cx: w as f32 / 2.0,
        cy: h as f32 / 2.0,
        baseline: BASELINE_MM,
    }
}

/// Ray-casting backend. Opens live device `"0"` (or its serial number) or a
/// recorded scene file, and renders a wall, a floor and a sphere.
pub struct SyntheticCamera {
    info: CameraInformation,
    scene: Scene,
    start: Timestamp,
    period_ns: u64,
    frame_index: u64,
    frame_limit: Option<u64>,
    noise_factor: f32,
}

impl SyntheticCamera {
    pub fn frames_grabbed(&self) -> u64 {
        self.frame_index
    }
}

impl DepthBackend for SyntheticCamera {
    fn open(params: &InitParameters) -> Result<Self> {
        let (serial, resolution, fps, start, frame_limit, scene) = match &params.input {
            InputSource::Live { device } => {
                if device != "0" && *device != SYNTHETIC_SERIAL.to_string() {
                    return Err(Error::NotFound(device.clone()));
                }
                (
                    SYNTHETIC_SERIAL,
                    params.resolution,
                    params.effective_fps(),
                    Timestamp::now(),
                    None,
                    Scene::default(),
                )
            }
            InputSource::Playback { path } => {
                let rec = Recording::load(path)?;
                if rec.resolution != params.resolution {
                    warn!(
                        requested = %params.resolution,
                        recorded = %rec.resolution,
                        "playback uses the recorded resolution"
                    );
                }
                (
                    rec.serial_number,
                    rec.resolution,
                    rec.fps,
                    Timestamp::from_nanos(rec.start_ns),
                    Some(rec.frame_count),
                    rec.scene,
                )
            }
        };

        Ok(Self {
            info: CameraInformation {
                serial_number: serial,
                model: MODEL.to_string(),
                firmware_version: FIRMWARE_VERSION,
                resolution,
                fps,
                calibration: intrinsics(resolution),
            },
            scene,
            start,
            period_ns: 1_000_000_000 / u64::from(fps.max(1)),
            frame_index: 0,
            frame_limit,
            noise_factor: params.depth_mode.noise_factor(),
        })
    }

    fn information(&self) -> CameraInformation {
        self.info.clone()
    }

    fn grab(&mut self, _runtime: &RuntimeParameters) -> Result<RawFrame> {
        if let Some(limit) = self.frame_limit {
            if self.frame_index >= limit {
                return Err(Error::EndOfRecording);
            }
        }
        let timestamp = self
            .frame_index
            .checked_mul(self.period_ns)
            .and_then(|offset| self.start.as_nanos().checked_add(offset))
            .map(Timestamp::from_nanos)
            .ok_or_else(|| {
                Error::Capture(format!(
                    "frame {} timestamp overflows from start {}",
                    self.frame_index, self.start
                ))
            })?;
        let frame = render(
            &self.scene,
            self.info.resolution,
            &self.info.calibration,
            self.frame_index,
            self.noise_factor,
            timestamp,
        );
        debug!(frame = self.frame_index, ts = %timestamp, "synthetic frame rendered");
        self.frame_index += 1;
        Ok(frame)
    }
}

enum Surface {
    Wall,
    Floor,
    Sphere,
}

fn render(
    scene: &Scene,
    resolution: Resolution,
    calib: &CalibrationParameters,
    frame_index: u64,
    noise_factor: f32,
    timestamp: Timestamp,
) -> RawFrame {
    let (w, h) = resolution.dimensions();
    let n = w as usize * h as usize;
    let mut left_bgra = vec![0u8; n * 4];
    let mut depth_mm = vec![f32::NAN; n];
    let mut confidence = vec![0u8; n];

    let [sx, sy, sz] = scene.sphere_center_mm;
    let r = scene.sphere_radius_mm;
    let c_dot_c = sx * sx + sy * sy + sz * sz;
    let light = normalize([-0.4, -0.6, -0.7]);
    let [px0, py0, px1, py1] = scene.blank_patch;

    for v in 0..h {
        let dy = (v as f32 - calib.cy) / calib.fy;
        for u in 0..w {
            let dx = (u as f32 - calib.cx) / calib.fx;
            let idx = v as usize * w as usize + u as usize;

            // Direction has z = 1, so the ray parameter is the Z distance.
            let mut z = scene.wall_mm;
            let mut surface = Surface::Wall;
            let mut rim = 1.0f32;

            if dy > 0.0 {
                let t = scene.floor_mm / dy;
                if t < z {
                    z = t;
                    surface = Surface::Floor;
                }
            }

            let a = dx * dx + dy * dy + 1.0;
            let b = dx * sx + dy * sy + sz;
            let disc = b * b - a * (c_dot_c - r * r);
            if disc >= 0.0 {
                let t = (b - disc.sqrt()) / a;
                if t > 0.0 && t < z {
                    z = t;
                    surface = Surface::Sphere;
                    rim = disc.sqrt() / (r * a.sqrt());
                }
            }

            let (bgr, conf) = match surface {
                Surface::Wall => {
                    let nu = u as f32 / w as f32;
                    let nv = v as f32 / h as f32;
                    if nu >= px0 && nu < px1 && nv >= py0 && nv < py1 {
                        ([200, 200, 200], 0)
                    } else {
                        let g = checker(dx * z, dy * z, 200.0, 180, 60);
                        ([g, g, g], 80)
                    }
                }
                Surface::Floor => {
                    let g = checker(dx * z, z, 250.0, 150, 90);
                    let conf = (95.0 - z / 100.0).clamp(10.0, 90.0) as u8;
                    ([(g as f32 * 0.8) as u8, g, (g as f32 * 0.9) as u8], conf)
                }
                Surface::Sphere => {
                    let p = [dx * z - sx, dy * z - sy, z - sz];
                    let nrm = normalize(p);
                    let lambert = (nrm[0] * light[0] + nrm[1] * light[1] + nrm[2] * light[2])
                        .max(0.0);
                    let red = (60.0 + 180.0 * lambert) as u8;
                    let conf = if rim < 0.15 { 20 } else { 90 };
                    ([30, 30, red], conf)
                }
            };

            let sigma =
                z * z / (calib.fx * calib.baseline) * DISPARITY_NOISE_PX * noise_factor;
            let jitter = (unit_hash(u, v, frame_index) - 0.5) * 2.0 * sigma;

            depth_mm[idx] = z + jitter;
            confidence[idx] = conf;
            left_bgra[idx * 4..idx * 4 + 4].copy_from_slice(&[bgr[0], bgr[1], bgr[2], 255]);
        }
    }

    RawFrame {
        timestamp,
        width: w,
        height: h,
        left_bgra,
        depth_mm,
        confidence,
    }
}

fn checker(a: f32, b: f32, cell: f32, light: u8, dark: u8) -> u8 {
    let parity = ((a / cell).floor() as i64 + (b / cell).floor() as i64).rem_euclid(2);
    if parity == 0 {
        light
    } else {
        dark
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return v;
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Deterministic value in `[0, 1)` for a pixel of a given frame.
fn unit_hash(u: u32, v: u32, frame: u64) -> f32 {
    let mut x = ((u64::from(u) << 32) | u64::from(v)) ^ frame.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    (x >> 40) as f32 / (1u64 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn vga() -> InitParameters {
        InitParameters {
            resolution: Resolution::Vga,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_unknown_device_fails() {
        let params = InitParameters {
            input: InputSource::Live {
                device: "7".into(),
            },
            ..vga()
        };
        assert!(matches!(
            SyntheticCamera::open(&params),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_open_by_serial() {
        let params = InitParameters {
            input: InputSource::Live {
                device: SYNTHETIC_SERIAL.to_string(),
            },
            ..vga()
        };
        let cam = SyntheticCamera::open(&params).unwrap();
        assert_eq!(cam.information().serial_number, SYNTHETIC_SERIAL);
        assert_eq!(cam.information().fps, 100);
    }

    #[test]
    fn test_grab_frame_shape_and_period() {
        let mut cam = SyntheticCamera::open(&vga()).unwrap();
        let rt = RuntimeParameters::default();
        let f1 = cam.grab(&rt).unwrap();
        let f2 = cam.grab(&rt).unwrap();
        assert_eq!((f1.width, f1.height), (672, 376));
        assert_eq!(f1.depth_mm.len(), 672 * 376);
        assert_eq!(f1.left_bgra.len(), 672 * 376 * 4);
        assert_eq!(f2.timestamp.as_nanos() - f1.timestamp.as_nanos(), 10_000_000);
        assert_eq!(cam.frames_grabbed(), 2);
    }

    #[test]
    fn test_center_pixel_sees_sphere() {
        let mut cam = SyntheticCamera::open(&vga()).unwrap();
        let f = cam.grab(&RuntimeParameters::default()).unwrap();
        let idx = (376 / 2) * 672 + 672 / 2;
        let z = f.depth_mm[idx];
        // Sphere front surface is about 1.18 m away on the optical axis.
        assert!(z > 1100.0 && z < 1200.0, "z = {z}");
        assert_eq!(f.confidence[idx], 90);
        assert!(f.left_bgra[idx * 4 + 2] > 60);
    }

    #[test]
    fn test_blank_patch_has_zero_confidence() {
        let mut cam = SyntheticCamera::open(&vga()).unwrap();
        let f = cam.grab(&RuntimeParameters::default()).unwrap();
        let (u, v) = ((0.8 * 672.0) as usize, (0.2 * 376.0) as usize);
        assert_eq!(f.confidence[v * 672 + u], 0);
    }

    #[test]
    fn test_playback_end_of_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("rec.yaml");
        Recording {
            serial_number: 42,
            resolution: Resolution::Vga,
            fps: 15,
            frame_count: 2,
            start_ns: 1_000,
            scene: Scene::default(),
        }
        .save(&path)
        .unwrap();

        let params = InitParameters {
            input: InputSource::Playback { path },
            ..vga()
        };
        let mut cam = SyntheticCamera::open(&params).unwrap();
        let rt = RuntimeParameters::default();
        assert_eq!(cam.grab(&rt).unwrap().timestamp.as_nanos(), 1_000);
        assert!(cam.grab(&rt).is_ok());
        assert!(matches!(cam.grab(&rt), Err(Error::EndOfRecording)));
    }

    #[test]
    fn test_timestamp_overflow_is_capture_error() {
        let mut cam = SyntheticCamera::open(&vga()).unwrap();
        cam.start = Timestamp::from_nanos(u64::MAX - 10);
        let rt = RuntimeParameters::default();
        assert!(cam.grab(&rt).is_ok());
        let err = cam.grab(&rt).unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
        assert_eq!(cam.frames_grabbed(), 1);
    }

    #[test]
    fn test_unit_hash_range() {
        for i in 0..1000u32 {
            let h = unit_hash(i, i * 7, u64::from(i));
            assert!((0.0..1.0).contains(&h));
        }
    }
}
