use crate::{Error, Mat, Result};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DepthStatus {
    Valid,
    /// No depth at this pixel: occluded, textureless, or outside the measurable range.
    Unresolved,
}

/// Depth read at one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthSample {
    pub x: u32,
    pub y: u32,
    pub value: f32,
    pub status: DepthStatus,
}

impl DepthSample {
    pub fn classify(value: f32) -> DepthStatus {
        if value.is_finite() {
            DepthStatus::Valid
        } else {
            DepthStatus::Unresolved
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == DepthStatus::Valid
    }
}

impl fmt::Display for DepthSample {
    /// Renders like `(SUCCESS, 709.83843994)`; unresolved pixels print `nan`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(SUCCESS, {})", crate::export::format_value(self.value))
    }
}

/// Read the depth at `(x, y)` from a single-channel depth map.
///
/// In-bounds pixels always succeed, possibly with a NaN value.
pub fn sample_depth(depth: &Mat<f32>, x: u32, y: u32) -> Result<DepthSample> {
    if depth.channels() != 1 {
        return Err(Error::Unsupported("depth sampling needs a single-channel map"));
    }
    let value = depth.value(x, y)?;
    Ok(DepthSample {
        x,
        y,
        value,
        status: DepthSample::classify(value),
    })
}
