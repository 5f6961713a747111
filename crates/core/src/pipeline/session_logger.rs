use std::collections::HashMap;
use std::time::Instant;

/// Observer for capture-session events.
///
/// The capture worker reports through this instead of logging directly, so
/// the CLI can print a timing summary while the GUI stays quiet.
pub trait SessionLogger: Send {
    /// Called once per captured frame with its capture index.
    fn frame(&mut self, index: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time value (e.g. detections per frame).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logs through the `log` facade and keeps per-stage timings for a summary.
///
/// Frame progress is only logged every `throttle_frames` frames.
pub struct StdoutSessionLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
}

impl StdoutSessionLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = vec![format!(
            "Session summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} calls)",
                durations.len()
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let max = values.iter().cloned().fold(0.0, f64::max);
            lines.push(format!("  {name}: avg {:.1}  max {max:.0}", mean(values)));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutSessionLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl SessionLogger for StdoutSessionLogger {
    fn frame(&mut self, index: usize) {
        self.frames += 1;
        if self.frames % self.throttle_frames == 0 {
            log::info!("Captured {} frames (latest #{index})", self.frames);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.frame(0);
        logger.timing("detect", 5.0);
        logger.metric("detections", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("annotate", 5.0);

        assert_eq!(logger.timings["detect"], vec![20.0, 30.0]);
        assert_eq!(logger.timings["annotate"], vec![5.0]);
        assert!(!logger.timings.contains_key("missing"));
    }

    #[test]
    fn test_metric_average() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.metric("detections", 3.0);
        logger.metric("detections", 4.0);

        assert_relative_eq!(mean(&logger.metrics["detections"]), 3.5);
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutSessionLogger::new(10);
        for i in 0..4 {
            logger.frame(i);
        }
        logger.timing("detect", 12.0);
        logger.metric("detections", 2.0);
        logger.metric("detections", 6.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Session summary (4 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("detections: avg 4.0  max 6"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutSessionLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_frame_counts_every_call() {
        let mut logger = StdoutSessionLogger::new(7);
        for i in 0..20 {
            logger.frame(i);
        }
        assert_eq!(logger.frames, 20);
    }

    #[test]
    fn test_default_throttle() {
        let logger = StdoutSessionLogger::default();
        assert_eq!(logger.throttle_frames, 30);
    }

    #[test]
    fn test_zero_throttle_is_clamped() {
        let logger = StdoutSessionLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
    }
}
