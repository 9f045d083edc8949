use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const DEFAULT_BLUR_KERNEL_SIZE: i64 = 51;
pub const DEFAULT_BLUR_SIGMA: f64 = 30.0;
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Capture device used when none is configured (first camera).
pub const DEFAULT_CAMERA: &str = "0";

/// Conventional v4l2loopback node created with `video_nr=10`.
pub const DEFAULT_VIRTUAL_DEVICE: &str = "/dev/video10";

/// Upper bound on each per-frame key poll.
pub const KEY_POLL_TIMEOUT: Duration = Duration::from_millis(1);

pub const PREVIEW_WINDOW_TITLE: &str = "BlurCam (B=toggle blur, Q=quit)";
