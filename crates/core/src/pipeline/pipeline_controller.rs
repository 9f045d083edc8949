use std::time::Instant;

use crate::blurring::domain::region_redactor::RegionRedactor;
use crate::control::domain::control_action::ControlAction;
use crate::control::domain::control_surface::ControlSurface;
use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::constants::KEY_POLL_TIMEOUT;
use crate::shared::error::PipelineError;
use crate::shared::frame::Frame;
use crate::shared::stream_format::{PixelFormat, StreamFormat};
use crate::video::domain::frame_sink::FrameSink;
use crate::video::domain::frame_source::FrameSource;

use super::pipeline_config::PipelineConfig;
use super::pipeline_logger::PipelineLogger;
use super::pipeline_state::PipelineState;

/// Counters for one pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames delivered to the sink.
    pub frames: usize,
    /// Frames in which at least one region was redacted.
    pub redacted_frames: usize,
    /// Total redactor calls.
    pub redactions: usize,
    pub toggles: usize,
}

/// Drives frames from the camera through detection and redaction into the
/// virtual camera, one frame at a time.
///
/// Both devices are released on every exit path: the source is always
/// closed once it has been asked to open, the sink once it has been asked to
/// open.
pub struct PipelineController {
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    locator: Box<dyn FaceLocator>,
    redactor: Box<dyn RegionRedactor>,
    control: Box<dyn ControlSurface>,
    logger: Box<dyn PipelineLogger>,
}

impl PipelineController {
    pub fn new(
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        locator: Box<dyn FaceLocator>,
        redactor: Box<dyn RegionRedactor>,
        control: Box<dyn ControlSurface>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            sink,
            locator,
            redactor,
            control,
            logger,
        }
    }

    /// Runs until quit, end of stream, or a fatal error.
    ///
    /// End of stream and camera read errors end the run successfully.
    pub fn run_loop(&mut self, config: &PipelineConfig) -> Result<RunStats, PipelineError> {
        config.validate()?;
        let mut state = PipelineState::new(config.blur_params()?, config.show_preview);

        if let Err(e) = self.source.open() {
            self.source.close();
            return Err(PipelineError::camera_unavailable(e));
        }

        let Some(first) = self.next_frame() else {
            self.source.close();
            self.logger.info("Camera produced no frames; virtual camera not started");
            return Ok(RunStats::default());
        };

        let format = StreamFormat::for_frame(&first, config.frame_rate, PixelFormat::Bgr24);
        let result = match self.sink.open(&format) {
            Ok(()) => {
                self.logger.info(&format!(
                    "Streaming {}x{} at {} fps (blur kernel {}, sigma {})",
                    format.width,
                    format.height,
                    format.fps,
                    state.params.kernel_size(),
                    state.params.sigma()
                ));
                self.stream(first, &mut state)
            }
            Err(e) => Err(PipelineError::virtual_camera_unavailable(e)),
        };

        let sink_closed = self.sink.close();
        self.source.close();
        self.logger.summary();

        match (result, sink_closed) {
            (Ok(stats), Ok(())) => Ok(stats),
            (Ok(_), Err(e)) => Err(PipelineError::SinkError(e)),
            (Err(e), Err(close_err)) => {
                log::warn!("Virtual camera did not close cleanly: {close_err}");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    fn stream(
        &mut self,
        first: Frame,
        state: &mut PipelineState,
    ) -> Result<RunStats, PipelineError> {
        let mut stats = RunStats::default();
        let mut frame = first;

        loop {
            let output = self.redact_frame(&frame, state, &mut stats)?;

            let mut action = None;
            if state.show_preview {
                self.control
                    .present(&output)
                    .map_err(PipelineError::Control)?;
                action = self
                    .control
                    .poll(KEY_POLL_TIMEOUT)
                    .map_err(PipelineError::Control)?;
            }

            let t = Instant::now();
            self.sink.send(&output).map_err(PipelineError::SinkError)?;
            self.logger.timing("send", elapsed_ms(t));

            let t = Instant::now();
            self.sink.pace();
            self.logger.timing("pace", elapsed_ms(t));

            stats.frames += 1;
            self.logger.frame_delivered(stats.frames);

            if !state.show_preview {
                action = self
                    .control
                    .poll(KEY_POLL_TIMEOUT)
                    .map_err(PipelineError::Control)?;
            }

            match action {
                Some(ControlAction::Toggle) => {
                    let blur = state.toggle();
                    stats.toggles += 1;
                    self.logger.info(if blur.is_on() {
                        "Blur enabled"
                    } else {
                        "Blur disabled"
                    });
                }
                Some(ControlAction::Quit) => {
                    self.logger.info("Quit requested");
                    break;
                }
                None => {}
            }

            match self.next_frame() {
                Some(next) => frame = next,
                None => break,
            }
        }

        Ok(stats)
    }

    /// Returns a copy of `frame` with every located face redacted.
    ///
    /// Detection always runs on the untouched capture; redaction works on
    /// the copy, so overlapping boxes may be blurred more than once.
    fn redact_frame(
        &mut self,
        frame: &Frame,
        state: &PipelineState,
        stats: &mut RunStats,
    ) -> Result<Frame, PipelineError> {
        let mut output = frame.clone();
        if !state.blur.is_on() {
            return Ok(output);
        }

        let t = Instant::now();
        let boxes = self
            .locator
            .locate(frame)
            .map_err(PipelineError::Detection)?;
        self.logger.timing("detect", elapsed_ms(t));
        self.logger.metric("faces", boxes.len() as f64);

        let t = Instant::now();
        let mut redacted = 0;
        for bbox in &boxes {
            let Some(rect) = bbox.clamp_to(frame.width(), frame.height()) else {
                log::debug!("Frame {}: skipping degenerate box {bbox:?}", frame.index());
                continue;
            };
            let region = output.crop(&rect);
            let blurred = self
                .redactor
                .redact(&region, &state.params)
                .map_err(PipelineError::Redaction)?;
            output
                .paste(&rect, &blurred)
                .map_err(|e| PipelineError::Redaction(e.into()))?;
            redacted += 1;
        }

        if redacted > 0 {
            self.logger.timing("redact", elapsed_ms(t));
            stats.redacted_frames += 1;
            stats.redactions += redacted;
        }
        Ok(output)
    }

    /// Pulls the next frame; `None` ends the run.
    fn next_frame(&mut self) -> Option<Frame> {
        match self.source.read_frame() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                self.logger.info("Camera stream ended");
                None
            }
            Err(e) => {
                log::warn!("Camera read failed, stopping: {e}");
                None
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blurring::domain::blur_params::BlurParams;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::error::BoxError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // --- Stubs ---

    #[derive(Default)]
    struct SourceLog {
        opens: usize,
        reads: usize,
        closes: usize,
    }

    struct StubSource {
        frames: VecDeque<Result<Frame, String>>,
        fail_open: bool,
        log: Arc<Mutex<SourceLog>>,
    }

    impl FrameSource for StubSource {
        fn open(&mut self) -> Result<(), BoxError> {
            self.log.lock().unwrap().opens += 1;
            if self.fail_open {
                return Err("no camera".into());
            }
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Option<Frame>, BoxError> {
            self.log.lock().unwrap().reads += 1;
            match self.frames.pop_front() {
                Some(Ok(frame)) => Ok(Some(frame)),
                Some(Err(e)) => Err(e.into()),
                None => Ok(None),
            }
        }

        fn close(&mut self) {
            self.log.lock().unwrap().closes += 1;
        }
    }

    #[derive(Default)]
    struct SinkLog {
        opened: Vec<StreamFormat>,
        sent: Vec<Frame>,
        paces: usize,
        closes: usize,
    }

    #[derive(Default)]
    struct StubSink {
        fail_open: bool,
        fail_send_at: Option<usize>,
        fail_close: bool,
        log: Arc<Mutex<SinkLog>>,
    }

    impl FrameSink for StubSink {
        fn open(&mut self, format: &StreamFormat) -> Result<(), BoxError> {
            if self.fail_open {
                return Err("no loopback device".into());
            }
            self.log.lock().unwrap().opened.push(format.clone());
            Ok(())
        }

        fn send(&mut self, frame: &Frame) -> Result<(), BoxError> {
            let mut log = self.log.lock().unwrap();
            if self.fail_send_at == Some(log.sent.len()) {
                return Err("device gone".into());
            }
            log.sent.push(frame.clone());
            Ok(())
        }

        fn pace(&mut self) {
            self.log.lock().unwrap().paces += 1;
        }

        fn close(&mut self) -> Result<(), BoxError> {
            self.log.lock().unwrap().closes += 1;
            if self.fail_close {
                return Err("close failed".into());
            }
            Ok(())
        }
    }

    struct StubLocator {
        boxes: HashMap<usize, Vec<BoundingBox>>,
        fail_at: Option<usize>,
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl FaceLocator for StubLocator {
        fn locate(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, BoxError> {
            self.calls.lock().unwrap().push(frame.index());
            if self.fail_at == Some(frame.index()) {
                return Err("model crashed".into());
            }
            Ok(self.boxes.get(&frame.index()).cloned().unwrap_or_default())
        }
    }

    /// Blacks out the region and records the parameters it was given.
    struct BlackoutRedactor {
        fail: bool,
        calls: Arc<Mutex<Vec<(usize, BlurParams)>>>,
    }

    impl RegionRedactor for BlackoutRedactor {
        fn redact(&self, region: &Frame, params: &BlurParams) -> Result<Frame, BoxError> {
            self.calls.lock().unwrap().push((region.index(), *params));
            if self.fail {
                return Err("filter failed".into());
            }
            Ok(Frame::filled(
                region.width(),
                region.height(),
                region.channels(),
                0,
                region.index(),
            ))
        }
    }

    /// Replays actions keyed by poll number.
    struct ScriptedControl {
        actions: HashMap<usize, ControlAction>,
        polls: Arc<Mutex<usize>>,
        presented: Arc<Mutex<Vec<usize>>>,
    }

    impl ControlSurface for ScriptedControl {
        fn present(&mut self, frame: &Frame) -> Result<(), BoxError> {
            self.presented.lock().unwrap().push(frame.index());
            Ok(())
        }

        fn poll(&mut self, timeout: Duration) -> Result<Option<ControlAction>, BoxError> {
            assert_eq!(timeout, KEY_POLL_TIMEOUT);
            let mut polls = self.polls.lock().unwrap();
            let action = self.actions.get(&*polls).copied();
            *polls += 1;
            Ok(action)
        }
    }

    // --- Harness ---

    const W: u32 = 100;
    const H: u32 = 80;
    const GRAY: u8 = 128;

    fn frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::filled(W, H, 3, GRAY, i))
            .collect()
    }

    struct Harness {
        source: StubSource,
        sink: StubSink,
        locator: StubLocator,
        redactor: BlackoutRedactor,
        control: ScriptedControl,
        source_log: Arc<Mutex<SourceLog>>,
        sink_log: Arc<Mutex<SinkLog>>,
        locate_calls: Arc<Mutex<Vec<usize>>>,
        #[allow(clippy::type_complexity)]
        redact_calls: Arc<Mutex<Vec<(usize, BlurParams)>>>,
        polls: Arc<Mutex<usize>>,
        presented: Arc<Mutex<Vec<usize>>>,
    }

    impl Harness {
        fn new(frames: Vec<Frame>) -> Self {
            Self::with_reads(frames.into_iter().map(Ok).collect())
        }

        fn with_reads(reads: Vec<Result<Frame, String>>) -> Self {
            let source_log = Arc::new(Mutex::new(SourceLog::default()));
            let sink_log = Arc::new(Mutex::new(SinkLog::default()));
            let locate_calls = Arc::new(Mutex::new(Vec::new()));
            let redact_calls = Arc::new(Mutex::new(Vec::new()));
            let polls = Arc::new(Mutex::new(0));
            let presented = Arc::new(Mutex::new(Vec::new()));
            Self {
                source: StubSource {
                    frames: reads.into(),
                    fail_open: false,
                    log: source_log.clone(),
                },
                sink: StubSink {
                    log: sink_log.clone(),
                    ..Default::default()
                },
                locator: StubLocator {
                    boxes: HashMap::new(),
                    fail_at: None,
                    calls: locate_calls.clone(),
                },
                redactor: BlackoutRedactor {
                    fail: false,
                    calls: redact_calls.clone(),
                },
                control: ScriptedControl {
                    actions: HashMap::new(),
                    polls: polls.clone(),
                    presented: presented.clone(),
                },
                source_log,
                sink_log,
                locate_calls,
                redact_calls,
                polls,
                presented,
            }
        }

        fn boxes(mut self, index: usize, boxes: Vec<BoundingBox>) -> Self {
            self.locator.boxes.insert(index, boxes);
            self
        }

        fn action(mut self, poll: usize, action: ControlAction) -> Self {
            self.control.actions.insert(poll, action);
            self
        }

        fn run(self, config: &PipelineConfig) -> (Result<RunStats, PipelineError>, Observed) {
            let observed = Observed {
                source: self.source_log,
                sink: self.sink_log,
                locate_calls: self.locate_calls,
                redact_calls: self.redact_calls,
                polls: self.polls,
                presented: self.presented,
            };
            let mut controller = PipelineController::new(
                Box::new(self.source),
                Box::new(self.sink),
                Box::new(self.locator),
                Box::new(self.redactor),
                Box::new(self.control),
                Box::new(NullPipelineLogger),
            );
            (controller.run_loop(config), observed)
        }
    }

    struct Observed {
        source: Arc<Mutex<SourceLog>>,
        sink: Arc<Mutex<SinkLog>>,
        locate_calls: Arc<Mutex<Vec<usize>>>,
        #[allow(clippy::type_complexity)]
        redact_calls: Arc<Mutex<Vec<(usize, BlurParams)>>>,
        polls: Arc<Mutex<usize>>,
        presented: Arc<Mutex<Vec<usize>>>,
    }

    impl Observed {
        fn sent(&self) -> Vec<Frame> {
            self.sink.lock().unwrap().sent.clone()
        }

        fn assert_closed_once(&self) {
            assert_eq!(self.source.lock().unwrap().closes, 1);
            assert_eq!(self.sink.lock().unwrap().closes, 1);
        }
    }

    fn headless() -> PipelineConfig {
        PipelineConfig {
            show_preview: false,
            ..Default::default()
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> &[u8] {
        let start = ((y * frame.width() + x) * 3) as usize;
        &frame.data()[start..start + 3]
    }

    // --- Redaction ---

    #[test]
    fn test_single_box_on_third_of_five_frames() {
        let input = frames(5);
        let (result, observed) = Harness::new(input.clone())
            .boxes(2, vec![BoundingBox::new(10, 10, 50, 50)])
            .run(&headless());

        let stats = result.unwrap();
        assert_eq!(stats.frames, 5);
        assert_eq!(stats.redactions, 1);
        assert_eq!(stats.redacted_frames, 1);

        let sent = observed.sent();
        assert_eq!(sent.len(), 5);
        for i in [0, 1, 3, 4] {
            assert_eq!(sent[i], input[i], "frame {i} should be untouched");
        }
        for y in 0..H {
            for x in 0..W {
                let inside = (10..50).contains(&x) && (10..50).contains(&y);
                let expected = if inside { [0, 0, 0] } else { [GRAY; 3] };
                assert_eq!(pixel(&sent[2], x, y), expected, "pixel ({x},{y})");
            }
        }
        assert_eq!(observed.redact_calls.lock().unwrap().len(), 1);
        assert_eq!(*observed.locate_calls.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pixels_outside_clamped_boxes_are_untouched() {
        let mut data = Vec::with_capacity((W * H * 3) as usize);
        for i in 0..(W * H * 3) {
            data.push((i % 251) as u8 | 1);
        }
        let input = Frame::new(data, W, H, 3, 0);
        let boxes = vec![
            BoundingBox::new(-20, -20, 15, 10),
            BoundingBox::new(90, 70, 400, 400),
            BoundingBox::new(30, 30, 60, 50),
            BoundingBox::new(40, 40, 70, 60),
        ];
        let clamped: Vec<_> = boxes.iter().filter_map(|b| b.clamp_to(W, H)).collect();

        let (result, observed) = Harness::new(vec![input.clone()])
            .boxes(0, boxes)
            .run(&headless());

        assert_eq!(result.unwrap().redactions, 4);
        let out = &observed.sent()[0];
        for y in 0..H {
            for x in 0..W {
                if clamped.iter().any(|r| r.contains(x, y)) {
                    assert_eq!(pixel(out, x, y), [0, 0, 0]);
                } else {
                    assert_eq!(pixel(out, x, y), pixel(&input, x, y), "pixel ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn test_degenerate_and_outside_boxes_are_skipped() {
        let input = frames(1);
        let (result, observed) = Harness::new(input.clone())
            .boxes(
                0,
                vec![
                    BoundingBox::new(50, 50, 40, 60),
                    BoundingBox::new(10, 10, 10, 30),
                    BoundingBox::new(200, 200, 300, 300),
                    BoundingBox::new(-50, -50, -1, -1),
                ],
            )
            .run(&headless());

        let stats = result.unwrap();
        assert_eq!(stats.redactions, 0);
        assert_eq!(stats.redacted_frames, 0);
        assert_eq!(observed.sent(), input);
        assert!(observed.redact_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_configured_params_reach_redactor_normalized() {
        let config = PipelineConfig {
            blur_kernel_size: 50,
            blur_sigma: 4.0,
            ..headless()
        };
        let (result, observed) = Harness::new(frames(1))
            .boxes(0, vec![BoundingBox::new(0, 0, 10, 10)])
            .run(&config);

        result.unwrap();
        let calls = observed.redact_calls.lock().unwrap();
        assert_eq!(calls[0].1, BlurParams::new(51, 4.0).unwrap());
    }

    // --- Toggle and quit ---

    #[test]
    fn test_toggle_disables_blur_from_next_frame() {
        let input = frames(3);
        let face = vec![BoundingBox::new(10, 10, 30, 30)];
        let (result, observed) = Harness::new(input.clone())
            .boxes(0, face.clone())
            .boxes(1, face.clone())
            .boxes(2, face)
            .action(0, ControlAction::Toggle)
            .run(&headless());

        let stats = result.unwrap();
        assert_eq!(stats.toggles, 1);
        assert_eq!(stats.redactions, 1);

        let sent = observed.sent();
        assert_ne!(sent[0], input[0]);
        assert_eq!(sent[1], input[1]);
        assert_eq!(sent[2], input[2]);
        assert_eq!(*observed.locate_calls.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_toggle_twice_re_enables_blur() {
        let face = vec![BoundingBox::new(10, 10, 30, 30)];
        let mut harness = Harness::new(frames(4));
        for i in 0..4 {
            harness = harness.boxes(i, face.clone());
        }
        let (result, observed) = harness
            .action(0, ControlAction::Toggle)
            .action(1, ControlAction::Toggle)
            .run(&headless());

        let stats = result.unwrap();
        assert_eq!(stats.toggles, 2);
        assert_eq!(stats.redacted_frames, 3);
        assert_eq!(*observed.locate_calls.lock().unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn test_quit_stops_after_delivering_current_frame() {
        let (result, observed) = Harness::new(frames(5))
            .action(1, ControlAction::Quit)
            .run(&headless());

        assert_eq!(result.unwrap().frames, 2);
        assert_eq!(observed.sent().len(), 2);
        assert_eq!(observed.sink.lock().unwrap().paces, 2);
        assert_eq!(observed.source.lock().unwrap().reads, 2);
        observed.assert_closed_once();
    }

    #[test]
    fn test_preview_presents_each_frame_and_polls_before_send() {
        let config = PipelineConfig {
            show_preview: true,
            ..Default::default()
        };
        let (result, observed) = Harness::new(frames(3))
            .action(0, ControlAction::Quit)
            .run(&config);

        assert_eq!(result.unwrap().frames, 1);
        assert_eq!(*observed.presented.lock().unwrap(), vec![0]);
        assert_eq!(*observed.polls.lock().unwrap(), 1);
        assert_eq!(observed.sent().len(), 1);
    }

    #[test]
    fn test_headless_polls_once_per_frame_without_presenting() {
        let (result, observed) = Harness::new(frames(3)).run(&headless());

        assert_eq!(result.unwrap().frames, 3);
        assert!(observed.presented.lock().unwrap().is_empty());
        assert_eq!(*observed.polls.lock().unwrap(), 3);
        assert_eq!(observed.sink.lock().unwrap().paces, 3);
    }

    // --- Lifecycle ---

    #[test]
    fn test_source_open_failure_never_touches_sink() {
        let mut harness = Harness::new(frames(3));
        harness.source.fail_open = true;
        let (result, observed) = harness.run(&headless());

        match result {
            Err(PipelineError::DeviceUnavailable { device, .. }) => assert_eq!(device, "camera"),
            other => panic!("expected DeviceUnavailable, got {other:?}"),
        }
        let sink = observed.sink.lock().unwrap();
        assert!(sink.opened.is_empty());
        assert_eq!(sink.closes, 0);
        assert_eq!(observed.source.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_sink_open_failure_is_device_unavailable() {
        let mut harness = Harness::new(frames(3));
        harness.sink.fail_open = true;
        let (result, observed) = harness.run(&headless());

        match result {
            Err(PipelineError::DeviceUnavailable { device, .. }) => {
                assert_eq!(device, "virtual camera")
            }
            other => panic!("expected DeviceUnavailable, got {other:?}"),
        }
        assert!(observed.sent().is_empty());
        observed.assert_closed_once();
    }

    #[test]
    fn test_empty_stream_exits_cleanly_without_sink() {
        let (result, observed) = Harness::new(Vec::new()).run(&headless());

        assert_eq!(result.unwrap(), RunStats::default());
        let sink = observed.sink.lock().unwrap();
        assert!(sink.opened.is_empty());
        assert_eq!(sink.closes, 0);
        assert_eq!(observed.source.lock().unwrap().closes, 1);
    }

    #[test]
    fn test_sink_negotiated_from_first_frame() {
        let config = PipelineConfig {
            frame_rate: 25.0,
            ..headless()
        };
        let (result, observed) = Harness::new(frames(2)).run(&config);

        result.unwrap();
        let sink = observed.sink.lock().unwrap();
        assert_eq!(
            sink.opened,
            vec![StreamFormat {
                width: W,
                height: H,
                fps: 25.0,
                pixel_format: PixelFormat::Bgr24,
            }]
        );
    }

    #[test]
    fn test_end_of_stream_closes_both_devices_once() {
        let (result, observed) = Harness::new(frames(4)).run(&headless());

        assert_eq!(result.unwrap().frames, 4);
        assert_eq!(observed.source.lock().unwrap().opens, 1);
        observed.assert_closed_once();
    }

    #[test]
    fn test_read_error_ends_run_cleanly() {
        let reads = vec![
            Ok(Frame::filled(W, H, 3, GRAY, 0)),
            Ok(Frame::filled(W, H, 3, GRAY, 1)),
            Err("usb unplugged".to_string()),
            Ok(Frame::filled(W, H, 3, GRAY, 2)),
        ];
        let (result, observed) = Harness::with_reads(reads).run(&headless());

        assert_eq!(result.unwrap().frames, 2);
        assert_eq!(observed.sent().len(), 2);
        observed.assert_closed_once();
    }

    #[test]
    fn test_sink_send_failure_is_sink_error() {
        let mut harness = Harness::new(frames(5));
        harness.sink.fail_send_at = Some(2);
        let (result, observed) = harness.run(&headless());

        assert!(matches!(result, Err(PipelineError::SinkError(_))));
        assert_eq!(observed.sent().len(), 2);
        assert_eq!(observed.source.lock().unwrap().reads, 3);
        observed.assert_closed_once();
    }

    #[test]
    fn test_locator_failure_aborts_before_send() {
        let mut harness = Harness::new(frames(5));
        harness.locator.fail_at = Some(1);
        let (result, observed) = harness.run(&headless());

        assert!(matches!(result, Err(PipelineError::Detection(_))));
        assert_eq!(observed.sent().len(), 1);
        observed.assert_closed_once();
    }

    #[test]
    fn test_redactor_failure_aborts_before_send() {
        let mut harness = Harness::new(frames(3)).boxes(0, vec![BoundingBox::new(0, 0, 5, 5)]);
        harness.redactor.fail = true;
        let (result, observed) = harness.run(&headless());

        assert!(matches!(result, Err(PipelineError::Redaction(_))));
        assert!(observed.sent().is_empty());
        observed.assert_closed_once();
    }

    #[test]
    fn test_sink_close_failure_after_clean_run_is_sink_error() {
        let mut harness = Harness::new(frames(2));
        harness.sink.fail_close = true;
        let (result, observed) = harness.run(&headless());

        assert!(matches!(result, Err(PipelineError::SinkError(_))));
        assert_eq!(observed.sent().len(), 2);
        observed.assert_closed_once();
    }

    #[test]
    fn test_sink_close_failure_does_not_mask_run_error() {
        let mut harness = Harness::new(frames(3));
        harness.sink.fail_close = true;
        harness.locator.fail_at = Some(0);
        let (result, _) = harness.run(&headless());

        assert!(matches!(result, Err(PipelineError::Detection(_))));
    }

    #[test]
    fn test_invalid_config_rejected_before_devices() {
        let config = PipelineConfig {
            blur_sigma: -2.0,
            ..headless()
        };
        let (result, observed) = Harness::new(frames(2)).run(&config);

        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
        let source = observed.source.lock().unwrap();
        assert_eq!(source.opens, 0);
        assert_eq!(source.closes, 0);
    }
}
