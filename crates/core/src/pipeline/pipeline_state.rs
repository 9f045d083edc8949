use crate::blurring::domain::blur_params::BlurParams;

/// Whether faces are being redacted right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlurToggle {
    #[default]
    BlurOn,
    BlurOff,
}

impl BlurToggle {
    pub fn toggled(self) -> Self {
        match self {
            Self::BlurOn => Self::BlurOff,
            Self::BlurOff => Self::BlurOn,
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::BlurOn
    }
}

/// Mutable state owned by a single pipeline run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineState {
    pub blur: BlurToggle,
    pub params: BlurParams,
    pub show_preview: bool,
}

impl PipelineState {
    pub fn new(params: BlurParams, show_preview: bool) -> Self {
        Self {
            blur: BlurToggle::default(),
            params,
            show_preview,
        }
    }

    /// Flips the toggle and returns the new state.
    pub fn toggle(&mut self) -> BlurToggle {
        self.blur = self.blur.toggled();
        self.blur
    }
}
