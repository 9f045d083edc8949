use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for pipeline events.
///
/// The controller reports stage timings and per-frame metrics here instead
/// of logging directly, so callers choose how much of it they see.
pub trait PipelineLogger {
    /// Called once per delivered frame with the running total.
    fn frame_delivered(&mut self, delivered: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a per-frame metric (e.g. face count).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used in tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_delivered(&mut self, _delivered: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Aggregates timings and metrics and reports them through the `log` crate.
///
/// A heartbeat line is written every `heartbeat_frames` frames; a live
/// stream has no total to report progress against.
pub struct LogPipelineLogger {
    heartbeat_frames: usize,
    timings: BTreeMap<String, StageStats>,
    metrics: BTreeMap<String, StageStats>,
    start_time: Instant,
    frames: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct StageStats {
    count: usize,
    total: f64,
    max: f64,
}

impl StageStats {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        self.max = self.max.max(value);
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

impl LogPipelineLogger {
    pub fn new(heartbeat_frames: usize) -> Self {
        Self {
            heartbeat_frames: heartbeat_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Run summary ({} frames, {elapsed_s:.1}s):",
            self.frames
        )];

        for (stage, stats) in &self.timings {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                stats.average(),
                stats.max,
                stats.total
            ));
        }
        for (name, stats) in &self.metrics {
            lines.push(format!(
                "  {name}: avg {:.1}  max {:.0}",
                stats.average(),
                stats.max
            ));
        }
        if self.frames > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn average_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(StageStats::average)
    }

    pub fn average_metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(StageStats::average)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn frame_delivered(&mut self, delivered: usize) {
        self.frames = delivered;
        if delivered % self.heartbeat_frames == 0 {
            log::info!("Streaming: {delivered} frames delivered");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
