use crate::detection::domain::acne_detector::AcneDetector;
use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Decorator that runs detection every N frames, replaying the most recent
/// result in between.
///
/// Bounds per-frame latency in a live session: with N = 2 only every other
/// frame pays for inference, while overlays stay on screen.
pub struct SkipFrameDetector {
    inner: Box<dyn AcneDetector>,
    skip_interval: usize,
    frame_count: usize,
    last_detections: Vec<Detection>,
}

impl SkipFrameDetector {
    pub fn new(inner: Box<dyn AcneDetector>, skip_interval: usize) -> Result<Self, &'static str> {
        if skip_interval < 1 {
            return Err("skip_interval must be >= 1");
        }
        Ok(Self {
            inner,
            skip_interval,
            frame_count: 0,
            last_detections: Vec::new(),
        })
    }

    /// True when the next call to `detect` will run the wrapped detector.
    pub fn will_infer(&self) -> bool {
        self.frame_count % self.skip_interval == 0
    }

    /// Returns the wrapped detector, dropping the replay state.
    pub fn into_inner(self) -> Box<dyn AcneDetector> {
        self.inner
    }
}

impl AcneDetector for SkipFrameDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        if self.will_infer() {
            self.last_detections = self.inner.detect(frame)?;
        }
        self.frame_count += 1;
        Ok(self.last_detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeDetector {
        results: Vec<Vec<Detection>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeDetector {
        fn new(results: Vec<Vec<Detection>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    results,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl AcneDetector for FakeDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.results[n % self.results.len()].clone())
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 10 * 10 * 3], 10, 10, 3, index)
    }

    fn detection(x1: f64) -> Detection {
        Detection {
            x1,
            y1: 0.0,
            x2: x1 + 5.0,
            y2: 5.0,
            confidence: 0.8,
            class_id: 0,
            label: "acne".to_string(),
        }
    }

    #[test]
    fn test_interval_1_delegates_every_frame() {
        let (inner, calls) = FakeDetector::new(vec![vec![detection(1.0)]]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 1).unwrap();

        for i in 0..3 {
            assert_eq!(detector.detect(&frame(i)).unwrap().len(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_interval_2_skips_alternate_frames() {
        let (inner, calls) = FakeDetector::new(vec![vec![detection(1.0)], vec![detection(2.0)]]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 2).unwrap();

        let r0 = detector.detect(&frame(0)).unwrap();
        let r1 = detector.detect(&frame(1)).unwrap(); // replayed
        let r2 = detector.detect(&frame(2)).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(r0, r1);
        assert_eq!(r2[0].x1, 2.0);
    }

    #[test]
    fn test_will_infer_tracks_interval() {
        let (inner, _) = FakeDetector::new(vec![vec![]]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 3).unwrap();

        let pattern: Vec<bool> = (0..6)
            .map(|i| {
                let infer = detector.will_infer();
                detector.detect(&frame(i)).unwrap();
                infer
            })
            .collect();
        assert_eq!(pattern, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn test_empty_result_replayed_as_empty() {
        let (inner, _) = FakeDetector::new(vec![vec![]]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 2).unwrap();

        assert!(detector.detect(&frame(0)).unwrap().is_empty());
        assert!(detector.detect(&frame(1)).unwrap().is_empty());
    }

    #[test]
    fn test_skip_interval_0_errors() {
        let (inner, _) = FakeDetector::new(vec![vec![]]);
        assert!(SkipFrameDetector::new(Box::new(inner), 0).is_err());
    }

    #[test]
    fn test_into_inner_runs_unthrottled() {
        let (inner, calls) = FakeDetector::new(vec![vec![detection(1.0)]]);
        let mut detector = SkipFrameDetector::new(Box::new(inner), 2).unwrap();
        detector.detect(&frame(0)).unwrap();

        let mut inner = detector.into_inner();
        inner.detect(&frame(1)).unwrap();
        inner.detect(&frame(2)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
