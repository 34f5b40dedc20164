//! stereo-capture: depth camera session, frame buffers, depth sampling and export
//!
//! A [`Camera`] wraps a [`DepthBackend`] and enforces the session life cycle:
//! open, grab, retrieve, close. The default build enables a `mock` backend
//! ([`SyntheticCamera`]) that renders a synthetic scene so the workflow runs
//! on any host without a device.

mod types;
pub use types::{
    CalibrationParameters, CameraInformation, DepthMode, InitParameters, InputSource, Measure,
    Resolution, RuntimeParameters, TimeReference, Timestamp, Unit, View, DEFAULT_MAX_DEPTH_MM,
    DEFAULT_MIN_DEPTH_MM,
};

mod error;
pub use error::{Error, ErrorKind, Result};

mod traits;
pub use traits::{DepthBackend, RawFrame};

mod mat;
pub use mat::{Element, Mat, MatType};

mod session;
pub use session::Camera;

pub mod display;
pub mod export;
pub mod overlay;
pub mod pacing;
pub mod recording;
pub mod sample;
pub mod snapshot;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{intrinsics, SyntheticCamera, SYNTHETIC_SERIAL};
