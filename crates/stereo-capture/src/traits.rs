use crate::{CameraInformation, InitParameters, Result, RuntimeParameters, Timestamp};

/// One synchronized capture as delivered by a backend, before unit conversion
/// and confidence filtering.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub timestamp: Timestamp,
    pub width: u32,
    pub height: u32,
    /// Left image, BGRA, row-major.
    pub left_bgra: Vec<u8>,
    /// Z distance in millimetres, NaN where matching failed.
    pub depth_mm: Vec<f32>,
    /// Matching confidence 0..=100 per pixel.
    pub confidence: Vec<u8>,
}

/// The depth engine behind a [`Camera`](crate::Camera) session.
pub trait DepthBackend {
    /// Open a device or recording described by `params`.
    fn open(params: &InitParameters) -> Result<Self>
    where
        Self: Sized;

    /// Static device information. Calibration values are in millimetres.
    fn information(&self) -> CameraInformation;

    /// Capture one synchronized frame.
    fn grab(&mut self, runtime: &RuntimeParameters) -> Result<RawFrame>;

    /// Release device resources. Called at most once.
    fn close(&mut self) {}
}
