use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blurring::domain::blur_params::BlurParams;
use crate::shared::constants::{
    DEFAULT_BLUR_KERNEL_SIZE, DEFAULT_BLUR_SIGMA, DEFAULT_CAMERA, DEFAULT_FRAME_RATE,
    DEFAULT_VIRTUAL_DEVICE,
};
use crate::shared::error::PipelineError;

/// Run configuration, fixed once the pipeline starts.
///
/// Missing keys in a JSON file fall back to the defaults; unknown keys are
/// rejected so typos don't silently do nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub blur_kernel_size: i64,
    pub blur_sigma: f64,
    pub show_preview: bool,
    pub frame_rate: f64,
    pub camera: String,
    pub virtual_device: String,
    pub capture_width: Option<u32>,
    pub capture_height: Option<u32>,
    pub model_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: DEFAULT_BLUR_KERNEL_SIZE,
            blur_sigma: DEFAULT_BLUR_SIGMA,
            show_preview: true,
            frame_rate: DEFAULT_FRAME_RATE,
            camera: DEFAULT_CAMERA.to_string(),
            virtual_device: DEFAULT_VIRTUAL_DEVICE.to_string(),
            capture_width: None,
            capture_height: None,
            model_path: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let json = fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| PipelineError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Checks everything that can be checked without touching a device.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.blur_params()?;
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "Frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.camera.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("Camera must not be empty".into()));
        }
        if self.virtual_device.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Virtual device must not be empty".into(),
            ));
        }
        match (self.capture_width, self.capture_height) {
            (Some(0), _) | (_, Some(0)) => Err(PipelineError::InvalidConfig(
                "Capture size must be non-zero".into(),
            )),
            (Some(_), None) | (None, Some(_)) => Err(PipelineError::InvalidConfig(
                "Capture width and height must be given together".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Blur parameters with the kernel size normalized to odd >= 1.
    pub fn blur_params(&self) -> Result<BlurParams, PipelineError> {
        BlurParams::new(self.blur_kernel_size, self.blur_sigma).map_err(PipelineError::InvalidConfig)
    }

    pub fn capture_size(&self) -> Option<(u32, u32)> {
        self.capture_width.zip(self.capture_height)
    }
}
