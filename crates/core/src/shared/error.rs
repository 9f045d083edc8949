use thiserror::Error;

/// Boxed error returned across capability and adapter seams.
pub type BoxError = Box<dyn std::error::Error>;

/// Failures that end a pipeline run.
///
/// End of stream and mid-run read errors are deliberately absent: they
/// terminate the loop cleanly instead of surfacing to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{device} unavailable: {source}")]
    DeviceUnavailable {
        device: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("virtual camera rejected frame: {0}")]
    SinkError(#[source] BoxError),
    #[error("face detection failed: {0}")]
    Detection(#[source] BoxError),
    #[error("redaction failed: {0}")]
    Redaction(#[source] BoxError),
    #[error("control surface failed: {0}")]
    Control(#[source] BoxError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub fn camera_unavailable(source: BoxError) -> Self {
        Self::DeviceUnavailable {
            device: "camera",
            source,
        }
    }

    pub fn virtual_camera_unavailable(source: BoxError) -> Self {
        Self::DeviceUnavailable {
            device: "virtual camera",
            source,
        }
    }
}
