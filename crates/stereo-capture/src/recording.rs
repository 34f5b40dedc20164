use crate::{Error, Resolution, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;

/// Geometry of the synthetic scene, millimetres in camera coordinates
/// (X right, Y down, Z forward).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Distance of the back wall.
    pub wall_mm: f32,
    /// Height of the camera above the floor.
    pub floor_mm: f32,
    pub sphere_center_mm: [f32; 3],
    pub sphere_radius_mm: f32,
    /// Textureless wall patch in normalized image coordinates `[x0, y0, x1, y1]`.
    pub blank_patch: [f32; 4],
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            wall_mm: 3000.0,
            floor_mm: 1200.0,
            sphere_center_mm: [0.0, 150.0, 1500.0],
            sphere_radius_mm: 350.0,
            blank_patch: [0.70, 0.08, 0.92, 0.30],
        }
    }
}

/// A recorded capture replayed by the synthetic backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub serial_number: u32,
    pub resolution: Resolution,
    pub fps: u32,
    pub frame_count: u64,
    /// Timestamp of the first frame, ns since the Unix epoch.
    pub start_ns: u64,
    #[serde(default)]
    pub scene: Scene,
}

impl Recording {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::InvalidRecording(format!("{}: {e}", path.display())),
        })?;
        let rec: Recording = serde_yaml::from_str(&raw)
            .map_err(|e| Error::InvalidRecording(format!("{}: {e}", path.display())))?;
        rec.validate()?;
        Ok(rec)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).map_err(|e| Error::Io(e.to_string()))?;
        fs::write(path, yaml).map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    /// Nanoseconds between consecutive frames.
    pub fn period_ns(&self) -> u64 {
        1_000_000_000 / u64::from(self.fps.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.resolution.supported_fps().contains(&self.fps) {
            return Err(Error::InvalidRecording(format!(
                "{} fps not valid for {}",
                self.fps, self.resolution
            )));
        }
        if self.frame_count == 0 {
            return Err(Error::InvalidRecording("recording has no frames".into()));
        }
        let end = self
            .frame_count
            .checked_mul(self.period_ns())
            .and_then(|span| self.start_ns.checked_add(span));
        if end.is_none() {
            return Err(Error::InvalidRecording(format!(
                "{} frames from start_ns {} overflow the timestamp range",
                self.frame_count, self.start_ns
            )));
        }
        let s = &self.scene;
        if !(s.wall_mm > 0.0 && s.floor_mm > 0.0 && s.sphere_radius_mm > 0.0) {
            return Err(Error::InvalidRecording(
                "scene distances must be positive".into(),
            ));
        }
        Ok(())
    }
}
