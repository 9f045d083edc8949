use crate::shared::error::BoxError;
use crate::shared::frame::Frame;
use crate::shared::stream_format::{PixelFormat, StreamFormat};
use crate::video::domain::frame_pacer::FramePacer;
use crate::video::domain::frame_sink::FrameSink;

/// libavdevice muxer that writes to a v4l2loopback node.
const OUTPUT_BACKEND: &str = "v4l2";

/// Pixel layout written to the loopback device; the one consumers accept most widely.
const DEVICE_PIXEL: ffmpeg_next::format::Pixel = ffmpeg_next::format::Pixel::YUV420P;

/// Publishes frames to a v4l2loopback virtual camera via ffmpeg-next.
///
/// Frames arrive as packed BGR24, are converted to YUV420P with swscale and
/// written as rawvideo packets, one per frame.
pub struct FfmpegVirtualCamera {
    device: String,
    output: Option<Output>,
    format: Option<StreamFormat>,
    pacer: Option<FramePacer>,
    frame_count: i64,
}

struct Output {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    time_base: ffmpeg_next::Rational,
}

impl FfmpegVirtualCamera {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            output: None,
            format: None,
            pacer: None,
            frame_count: 0,
        }
    }
}

impl FrameSink for FfmpegVirtualCamera {
    fn open(&mut self, format: &StreamFormat) -> Result<(), BoxError> {
        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output_as(&self.device, OUTPUT_BACKEND)
            .map_err(|e| format!("cannot open virtual camera {}: {e}", self.device))?;

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::RAWVIDEO)
            .ok_or("rawvideo encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let frame_rate = device_rate(format.fps);
        let time_base = frame_rate.invert();
        encoder_ctx.set_width(format.width);
        encoder_ctx.set_height(format.height);
        encoder_ctx.set_format(DEVICE_PIXEL);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(frame_rate));

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_pixel(format.pixel_format),
            format.width,
            format.height,
            DEVICE_PIXEL,
            format.width,
            format.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let pacer = FramePacer::new(format.fps);
        log::info!(
            "Virtual camera started: {} ({}x{} @ {} fps, one frame every {:?}, {} -> {:?})",
            self.device,
            format.width,
            format.height,
            format.fps,
            pacer.interval(),
            format.pixel_format,
            DEVICE_PIXEL
        );

        self.output = Some(Output {
            octx,
            encoder,
            scaler,
            time_base,
        });
        self.pacer = Some(pacer);
        self.format = Some(format.clone());
        self.frame_count = 0;
        Ok(())
    }

    fn send(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let (Some(output), Some(format)) = (self.output.as_mut(), self.format.as_ref()) else {
            return Err("FfmpegVirtualCamera: not opened".into());
        };
        check_frame(format, frame)?;

        let mut src = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_pixel(format.pixel_format),
            format.width,
            format.height,
        );
        let stride = src.stride(0);
        let row_bytes = format.width as usize * 3;
        let dst = src.data_mut(0);
        for (row, pixels) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(pixels);
        }

        let mut converted = ffmpeg_next::util::frame::video::Video::empty();
        output.scaler.run(&src, &mut converted)?;
        converted.set_pts(Some(self.frame_count));

        output.encoder.send_frame(&converted)?;
        output.drain()?;

        self.frame_count += 1;
        Ok(())
    }

    fn pace(&mut self) {
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait();
        }
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let Some(mut output) = self.output.take() else {
            return Ok(());
        };
        self.format = None;
        self.pacer = None;

        output.encoder.send_eof()?;
        output.drain()?;
        output.octx.write_trailer()?;
        log::info!(
            "Virtual camera {} closed after {} frames",
            self.device,
            self.frame_count
        );
        Ok(())
    }
}

impl Output {
    fn drain(&mut self) -> Result<(), BoxError> {
        let stream_tb = self
            .octx
            .stream(0)
            .ok_or("virtual camera stream missing")?
            .time_base();
        let mut packet = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.time_base, stream_tb);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

/// Rejects frames that don't match the negotiated geometry.
fn check_frame(format: &StreamFormat, frame: &Frame) -> Result<(), String> {
    if format.matches(frame) {
        Ok(())
    } else {
        Err(format!(
            "frame is {}x{}x{}, virtual camera expects {}x{}x{}",
            frame.width(),
            frame.height(),
            frame.channels(),
            format.width,
            format.height,
            format.pixel_format.channels()
        ))
    }
}

fn ffmpeg_pixel(format: PixelFormat) -> ffmpeg_next::format::Pixel {
    match format {
        PixelFormat::Bgr24 => ffmpeg_next::format::Pixel::BGR24,
    }
}

/// Exact rational form of the configured rate, e.g. 29.97 -> 2997/100.
fn device_rate(fps: f64) -> ffmpeg_next::Rational {
    ffmpeg_next::Rational::from(fps)
}
