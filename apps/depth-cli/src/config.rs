use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stereo_capture::{InitParameters, Resolution, RuntimeParameters};

/// Settings file for `depth snapshot` and `depth grab`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub init: InitParameters,
    pub runtime: RuntimeParameters,
    /// Pixel `[x, y]` to sample.
    pub sample: Option<[u32; 2]>,
    pub out_dir: Option<PathBuf>,
    pub out_ply: Option<PathBuf>,
    pub display: bool,
}

impl Default for CaptureConfig {
    /// HD1080 at the resolution's default rate; the rest follows the library defaults.
    fn default() -> Self {
        Self {
            init: InitParameters {
                resolution: Resolution::Hd1080,
                ..Default::default()
            },
            runtime: RuntimeParameters::default(),
            sample: None,
            out_dir: None,
            out_ply: None,
            display: false,
        }
    }
}

pub fn load_config_file(path: impl AsRef<Path>) -> anyhow::Result<CaptureConfig> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading config: {}", path.display()))?;
    let cfg: CaptureConfig =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing yaml: {}", path.display()))?;
    Ok(cfg)
}
