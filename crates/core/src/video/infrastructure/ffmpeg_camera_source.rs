use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// libavdevice demuxer used for cameras on this platform.
#[cfg(target_os = "linux")]
const CAPTURE_BACKEND: &str = "video4linux2";
#[cfg(target_os = "macos")]
const CAPTURE_BACKEND: &str = "avfoundation";
#[cfg(target_os = "windows")]
const CAPTURE_BACKEND: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_BACKEND: &str = "video4linux2";

/// Captures frames from a physical camera via ffmpeg-next (libavdevice).
///
/// Decoded frames are converted to BGR24 and wrapped in a [`Frame`].
pub struct FfmpegCameraSource {
    device: String,
    capture_size: Option<(u32, u32)>,
    frame_rate: Option<f64>,
    capture: Option<Capture>,
    frame_index: usize,
}

struct Capture {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    stream_index: usize,
    draining: bool,
}

impl FfmpegCameraSource {
    /// `device` is a camera index (`"0"`), a device path, or a
    /// backend-specific device name.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            capture_size: None,
            frame_rate: None,
            capture: None,
            frame_index: 0,
        }
    }

    /// Requests a capture resolution from the driver.
    pub fn with_capture_size(mut self, width: u32, height: u32) -> Self {
        self.capture_size = Some((width, height));
        self
    }

    /// Requests a capture frame rate from the driver.
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    fn device_options(&self) -> ffmpeg_next::Dictionary<'static> {
        let mut opts = ffmpeg_next::Dictionary::new();
        if let Some((w, h)) = self.capture_size {
            opts.set("video_size", &format!("{w}x{h}"));
        }
        if let Some(fps) = self.frame_rate {
            opts.set("framerate", &format!("{fps}"));
        }
        opts
    }
}

impl FrameSource for FfmpegCameraSource {
    fn open(&mut self) -> Result<(), BoxError> {
        ffmpeg_next::init()?;

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name().split(',').any(|n| n == CAPTURE_BACKEND))
            .ok_or_else(|| format!("capture backend {CAPTURE_BACKEND} not available"))?;

        let url = device_url(&self.device);
        log::debug!("Opening {url} with {CAPTURE_BACKEND}");
        let ictx = ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::Format::Input(format),
            self.device_options(),
        )
        .map_err(|e| format!("cannot open camera {url}: {e}"))?
        .input();

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("camera exposes no video stream")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        log::info!(
            "Camera {url} opened ({}x{}, {:?})",
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        self.capture = Some(Capture {
            ictx,
            decoder,
            scaler: None,
            stream_index,
            draining: false,
        });
        self.frame_index = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        let capture = self.capture.as_mut().ok_or("FfmpegCameraSource: not opened")?;

        loop {
            if let Some(pixels) = capture.receive()? {
                let (data, width, height) = pixels;
                let frame = Frame::new(data, width, height, 3, self.frame_index);
                self.frame_index += 1;
                return Ok(Some(frame));
            }
            if capture.draining {
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut capture.ictx) {
                Ok(()) => {
                    if packet.stream() == capture.stream_index {
                        capture.decoder.send_packet(&packet)?;
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    capture.decoder.send_eof()?;
                    capture.draining = true;
                }
                Err(e) => return Err(Box::new(e)),
            }
        }
    }

    fn close(&mut self) {
        if self.capture.take().is_some() {
            log::info!("Camera {} released", self.device);
        }
    }
}

impl Capture {
    /// Pulls one decoded frame, if the decoder has one ready.
    fn receive(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>, BoxError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if !frame_ready(self.decoder.receive_frame(&mut decoded))? {
            return Ok(None);
        }

        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg_next::format::Pixel::BGR24,
                decoded.width(),
                decoded.height(),
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?);
        }
        let scaler = self.scaler.as_mut().ok_or("scaler not initialized")?;

        let mut bgr = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut bgr)?;
        let (width, height) = (bgr.width(), bgr.height());
        Ok(Some((packed_pixels(&bgr), width, height)))
    }
}

/// Interprets a decoder `receive_frame` result.
///
/// `EAGAIN` (needs more input) and `Eof` (fully drained) mean no frame yet;
/// anything else is a decode fault and ends the read with an error.
fn frame_ready(result: Result<(), ffmpeg_next::Error>) -> Result<bool, BoxError> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
            Ok(false)
        }
        Err(e) => Err(format!("camera decode failed: {e}").into()),
    }
}

/// Maps a user-facing device string to the URL the capture backend expects.
fn device_url(device: &str) -> String {
    let is_index = !device.is_empty() && device.chars().all(|c| c.is_ascii_digit());
    match CAPTURE_BACKEND {
        "video4linux2" if is_index => format!("/dev/video{device}"),
        "dshow" if !device.starts_with("video=") => format!("video={device}"),
        _ => device.to_string(),
    }
}

/// Copies a 3-byte-per-pixel ffmpeg frame into a tightly-packed buffer.
///
/// ffmpeg frames may pad each row (stride > width*3); the padding is dropped.
fn packed_pixels(frame: &ffmpeg_next::util::frame::video::Video) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let row_bytes = frame.width() as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * frame.height() as usize);
    for row in 0..frame.height() as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
