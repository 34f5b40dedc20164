use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use time::OffsetDateTime;

/// Sensor resolution tiers. Dimensions are per eye.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Hd2k,
    Hd1080,
    Hd720,
    Vga,
}

impl Resolution {
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Hd2k => (2208, 1242),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd720 => (1280, 720),
            Resolution::Vga => (672, 376),
        }
    }

    pub const fn width(self) -> u32 {
        self.dimensions().0
    }

    pub const fn height(self) -> u32 {
        self.dimensions().1
    }

    pub const fn supported_fps(self) -> &'static [u32] {
        match self {
            Resolution::Hd2k => &[15],
            Resolution::Hd1080 => &[15, 30],
            Resolution::Hd720 => &[15, 30, 60],
            Resolution::Vga => &[15, 30, 60, 100],
        }
    }

    /// Highest supported rate; used when the requested fps is 0.
    pub const fn default_fps(self) -> u32 {
        match self {
            Resolution::Hd2k => 15,
            Resolution::Hd1080 => 30,
            Resolution::Hd720 => 60,
            Resolution::Vga => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Hd2k => "hd2k",
            Resolution::Hd1080 => "hd1080",
            Resolution::Hd720 => "hd720",
            Resolution::Vga => "vga",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hd2k" | "2k" => Ok(Resolution::Hd2k),
            "hd1080" | "1080" | "1080p" => Ok(Resolution::Hd1080),
            "hd720" | "720" | "720p" => Ok(Resolution::Hd720),
            "vga" => Ok(Resolution::Vga),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown resolution: {other}"
            ))),
        }
    }
}

/// Depth computation tier, trading speed for accuracy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    /// Fastest, noisiest.
    Performance,
    Quality,
    Ultra,
    /// Slowest, cleanest.
    Neural,
}

impl DepthMode {
    /// Relative depth noise; 1.0 for the fastest tier.
    pub fn noise_factor(self) -> f32 {
        match self {
            DepthMode::Performance => 1.0,
            DepthMode::Quality => 0.6,
            DepthMode::Ultra => 0.35,
            DepthMode::Neural => 0.2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DepthMode::Performance => "performance",
            DepthMode::Quality => "quality",
            DepthMode::Ultra => "ultra",
            DepthMode::Neural => "neural",
        }
    }
}

impl FromStr for DepthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "performance" => Ok(DepthMode::Performance),
            "quality" => Ok(DepthMode::Quality),
            "ultra" => Ok(DepthMode::Ultra),
            "neural" => Ok(DepthMode::Neural),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown depth mode: {other}"
            ))),
        }
    }
}

/// Distance unit for depth and point cloud values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Millimeter,
    Centimeter,
    Meter,
    Inch,
    Foot,
}

impl Unit {
    pub fn millimeters_per_unit(self) -> f32 {
        match self {
            Unit::Millimeter => 1.0,
            Unit::Centimeter => 10.0,
            Unit::Meter => 1000.0,
            Unit::Inch => 25.4,
            Unit::Foot => 304.8,
        }
    }

    pub fn from_millimeters(self, mm: f32) -> f32 {
        mm / self.millimeters_per_unit()
    }

    pub fn to_millimeters(self, value: f32) -> f32 {
        value * self.millimeters_per_unit()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Meter => "meter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mm" | "millimeter" => Ok(Unit::Millimeter),
            "cm" | "centimeter" => Ok(Unit::Centimeter),
            "m" | "meter" => Ok(Unit::Meter),
            "in" | "inch" => Ok(Unit::Inch),
            "ft" | "foot" => Ok(Unit::Foot),
            other => Err(Error::InvalidConfiguration(format!("unknown unit: {other}"))),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Device index (e.g. "0") or serial number.
    Live { device: String },
    /// Recorded scene file.
    Playback { path: PathBuf },
}

impl Default for InputSource {
    fn default() -> Self {
        InputSource::Live {
            device: "0".to_string(),
        }
    }
}

/// Default minimum measurable distance, millimetres.
pub const DEFAULT_MIN_DEPTH_MM: f32 = 300.0;
/// Default maximum measurable distance, millimetres.
pub const DEFAULT_MAX_DEPTH_MM: f32 = 20_000.0;

/// Options fixed at open time. The session never hands out a mutable reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitParameters {
    pub resolution: Resolution,
    /// 0 selects the resolution's default rate.
    pub fps: u32,
    pub depth_mode: DepthMode,
    pub unit: Unit,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub input: InputSource,
    /// In `unit`.
    pub depth_minimum_distance: Option<f32>,
    /// In `unit`.
    pub depth_maximum_distance: Option<f32>,
}

impl Default for InitParameters {
    fn default() -> Self {
        Self {
            resolution: Resolution::Hd720,
            fps: 0,
            depth_mode: DepthMode::Performance,
            unit: Unit::Millimeter,
            input: InputSource::default(),
            depth_minimum_distance: None,
            depth_maximum_distance: None,
        }
    }
}

impl InitParameters {
    pub fn validate(&self) -> Result<()> {
        if self.fps != 0 && !self.resolution.supported_fps().contains(&self.fps) {
            return Err(Error::InvalidConfiguration(format!(
                "{} fps not supported at {} (supported: {:?})",
                self.fps,
                self.resolution,
                self.resolution.supported_fps()
            )));
        }
        for (name, v) in [
            ("depth_minimum_distance", self.depth_minimum_distance),
            ("depth_maximum_distance", self.depth_maximum_distance),
        ] {
            if let Some(v) = v {
                if !v.is_finite() || v <= 0.0 {
                    return Err(Error::InvalidConfiguration(format!(
                        "{name} must be positive, got {v}"
                    )));
                }
            }
        }
        let (min_mm, max_mm) = self.depth_range_mm();
        if min_mm >= max_mm {
            return Err(Error::InvalidConfiguration(format!(
                "minimum distance {min_mm} mm is not below maximum {max_mm} mm"
            )));
        }
        Ok(())
    }

    pub fn effective_fps(&self) -> u32 {
        if self.fps == 0 {
            self.resolution.default_fps()
        } else {
            self.fps
        }
    }

    /// Measurable range converted to millimetres.
    pub fn depth_range_mm(&self) -> (f32, f32) {
        let min = self
            .depth_minimum_distance
            .map(|v| self.unit.to_millimeters(v))
            .unwrap_or(DEFAULT_MIN_DEPTH_MM);
        let max = self
            .depth_maximum_distance
            .map(|v| self.unit.to_millimeters(v))
            .unwrap_or(DEFAULT_MAX_DEPTH_MM);
        (min, max)
    }
}

/// Per-grab options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeParameters {
    pub enable_depth: bool,
    /// 0..=100. A pixel keeps its depth when its confidence is at least `100 - threshold`.
    pub confidence_threshold: u8,
}

impl Default for RuntimeParameters {
    fn default() -> Self {
        Self {
            enable_depth: true,
            confidence_threshold: 95,
        }
    }
}

impl RuntimeParameters {
    pub fn validate(&self) -> Result<()> {
        if self.confidence_threshold > 100 {
            return Err(Error::Capture(format!(
                "confidence threshold {} outside 0..=100",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    pub fn keeps(&self, confidence: u8) -> bool {
        u16::from(confidence) + u16::from(self.confidence_threshold) >= 100
    }
}

/// Capture time in nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let ns = OffsetDateTime::now_utc().unix_timestamp_nanos();
        Timestamp(u64::try_from(ns).unwrap_or(0))
    }

    pub const fn from_nanos(ns: u64) -> Self {
        Timestamp(ns)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0)).ok()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeReference {
    /// Timestamp of the last grabbed frame.
    Image,
    /// Wall clock at call time.
    Current,
}

/// Image views available through `retrieve_image`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum View {
    Left,
    /// Gray-scale rendering of the depth map.
    Depth,
}

/// Measures available through `retrieve_measure`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Measure {
    Depth,
    /// X, Y, Z and packed RGBA colour.
    XyzRgba,
}

/// Left-eye pinhole intrinsics and stereo baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameters {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    /// In the configured unit.
    pub baseline: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraInformation {
    pub serial_number: u32,
    pub model: String,
    pub firmware_version: u32,
    pub resolution: Resolution,
    pub fps: u32,
    pub calibration: CalibrationParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse_and_dims() {
        let r: Resolution = "HD1080".parse().unwrap();
        assert_eq!(r, Resolution::Hd1080);
        assert_eq!(r.dimensions(), (1920, 1080));
        assert!("8k".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_validate_rejects_unsupported_fps() {
        let params = InitParameters {
            resolution: Resolution::Hd2k,
            fps: 60,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidConfiguration(_))
        ));

        let params = InitParameters {
            resolution: Resolution::Hd1080,
            fps: 30,
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.effective_fps(), 30);
    }

    #[test]
    fn test_validate_depth_range() {
        let params = InitParameters {
            unit: Unit::Meter,
            depth_minimum_distance: Some(5.0),
            depth_maximum_distance: Some(2.0),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = InitParameters {
            unit: Unit::Meter,
            depth_minimum_distance: Some(0.5),
            ..Default::default()
        };
        assert!(params.validate().is_ok());
        assert_eq!(params.depth_range_mm(), (500.0, DEFAULT_MAX_DEPTH_MM));
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(Unit::Meter.from_millimeters(1500.0), 1.5);
        assert_eq!(Unit::Centimeter.to_millimeters(2.0), 20.0);
        assert!((Unit::Inch.from_millimeters(254.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_confidence_threshold() {
        let rt = RuntimeParameters::default();
        assert!(rt.keeps(90));
        assert!(rt.keeps(5));
        assert!(!rt.keeps(4));
        let strict = RuntimeParameters {
            confidence_threshold: 50,
            ..Default::default()
        };
        assert!(!strict.keeps(30));
        let bad = RuntimeParameters {
            confidence_threshold: 101,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_timestamp_millis() {
        let ts = Timestamp::from_nanos(1_709_651_329_565_919_300);
        assert_eq!(ts.as_millis(), 1_709_651_329_565);
        assert!(ts.to_datetime().is_some());
    }

    #[test]
    fn test_init_parameters_yaml() {
        let yaml = "resolution: hd1080\nfps: 30\ninput:\n  playback:\n    path: scene.yaml\n";
        let params: InitParameters = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(params.resolution, Resolution::Hd1080);
        assert_eq!(params.unit, Unit::Millimeter);
        assert_eq!(
            params.input,
            InputSource::Playback {
                path: PathBuf::from("scene.yaml")
            }
        );
    }
}
