use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::acne_detector::AcneDetector;
use crate::detection::domain::detection::Detection;
use crate::pipeline::session_error::SessionError;
use crate::pipeline::session_logger::SessionLogger;
use crate::report::domain::acne_report::AcneReport;
use crate::report::domain::image_writer::ImageWriter;
use crate::report::domain::report_writer::ReportWriter;
use crate::shared::constants::{ANNOTATED_IMAGE_NAME, REPORT_FILE_NAME};
use crate::shared::frame::Frame;

/// Where the annotated image and the text report are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub image_path: PathBuf,
    pub report_path: PathBuf,
}

impl OutputPaths {
    /// Fixed file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            image_path: dir.join(ANNOTATED_IMAGE_NAME),
            report_path: dir.join(REPORT_FILE_NAME),
        }
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self::in_dir(Path::new("."))
    }
}

/// Outcome of one full-quality detection pass.
#[derive(Clone, Debug)]
pub struct DetectionSummary {
    pub annotated: Frame,
    pub detections: Vec<Detection>,
    pub report: AcneReport,
    pub paths: OutputPaths,
}

/// Final detection pass: detect → annotate a copy → report → write both files.
pub struct FinalReportUseCase {
    image_writer: Box<dyn ImageWriter>,
    report_writer: Box<dyn ReportWriter>,
    paths: OutputPaths,
}

impl FinalReportUseCase {
    pub fn new(
        image_writer: Box<dyn ImageWriter>,
        report_writer: Box<dyn ReportWriter>,
        paths: OutputPaths,
    ) -> Self {
        Self {
            image_writer,
            report_writer,
            paths,
        }
    }

    pub fn execute(
        &self,
        detector: &mut dyn AcneDetector,
        annotator: &dyn FrameAnnotator,
        logger: &mut dyn SessionLogger,
        frame: &Frame,
    ) -> Result<DetectionSummary, SessionError> {
        let t0 = Instant::now();
        let detections = detector
            .detect(frame)
            .map_err(|e| SessionError::Detection(e.to_string()))?;
        logger.timing("final_detect", t0.elapsed().as_secs_f64() * 1000.0);

        let mut annotated = frame.clone();
        annotator
            .annotate(&mut annotated, &detections)
            .map_err(|e| SessionError::Annotation(e.to_string()))?;

        let report = AcneReport::from_detections(&detections);

        self.image_writer
            .write(&self.paths.image_path, &annotated)
            .map_err(|e| SessionError::Write {
                path: self.paths.image_path.clone(),
                reason: e.to_string(),
            })?;
        self.report_writer
            .write(&self.paths.report_path, &report)
            .map_err(|e| SessionError::Write {
                path: self.paths.report_path.clone(),
                reason: e.to_string(),
            })?;

        logger.info(&format!(
            "Detected {} acne(s); results saved to {}",
            report.total(),
            self.paths.report_path.display()
        ));

        Ok(DetectionSummary {
            annotated,
            detections,
            report,
            paths: self.paths.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::session_logger::NullSessionLogger;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubDetector {
        detections: Vec<Detection>,
    }

    impl AcneDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(self.detections.clone())
        }
    }

    struct FailingDetector;

    impl AcneDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Err("model exploded".into())
        }
    }

    /// Marks every pixel of the frame with the number of detections.
    struct CountingAnnotator;

    impl FrameAnnotator for CountingAnnotator {
        fn annotate(
            &self,
            frame: &mut Frame,
            detections: &[Detection],
        ) -> Result<(), Box<dyn std::error::Error>> {
            frame.data_mut().fill(detections.len() as u8);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Written {
        images: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
        reports: Arc<Mutex<Vec<(PathBuf, String)>>>,
    }

    struct StubImageWriter(Written);

    impl ImageWriter for StubImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.0
                .images
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    struct StubReportWriter(Written);

    impl ReportWriter for StubReportWriter {
        fn write(&self, path: &Path, report: &AcneReport) -> Result<(), Box<dyn std::error::Error>> {
            self.0
                .reports
                .lock()
                .unwrap()
                .push((path.to_path_buf(), report.render()));
            Ok(())
        }
    }

    struct FailingReportWriter;

    impl ReportWriter for FailingReportWriter {
        fn write(&self, _path: &Path, _report: &AcneReport) -> Result<(), Box<dyn std::error::Error>> {
            Err("disk full".into())
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![7u8; 4 * 4 * 3], 4, 4, 3, 0)
    }

    fn detection(w: f64, h: f64) -> Detection {
        Detection {
            x1: 0.0,
            y1: 0.0,
            x2: w,
            y2: h,
            confidence: 0.8,
            class_id: 0,
            label: "acne".to_string(),
        }
    }

    fn use_case(written: &Written) -> FinalReportUseCase {
        FinalReportUseCase::new(
            Box::new(StubImageWriter(written.clone())),
            Box::new(StubReportWriter(written.clone())),
            OutputPaths::in_dir(Path::new("/out")),
        )
    }

    // --- Tests ---

    #[test]
    fn test_output_paths_use_fixed_names() {
        let paths = OutputPaths::in_dir(Path::new("/tmp/run"));
        assert_eq!(paths.image_path, Path::new("/tmp/run/result.png"));
        assert_eq!(
            paths.report_path,
            Path::new("/tmp/run/acne_detection_results.txt")
        );
    }

    #[test]
    fn test_writes_annotated_image_and_report() {
        let written = Written::default();
        let mut detector = StubDetector {
            detections: vec![detection(3.0, 2.0), detection(1.5, 1.5)],
        };

        let summary = use_case(&written)
            .execute(&mut detector, &CountingAnnotator, &mut NullSessionLogger, &frame())
            .unwrap();

        assert_eq!(summary.report.total(), 2);
        assert!(summary.annotated.data().iter().all(|&b| b == 2));

        let images = written.images.lock().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].0, Path::new("/out/result.png"));
        assert!(images[0].1.data().iter().all(|&b| b == 2));

        let reports = written.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, Path::new("/out/acne_detection_results.txt"));
        assert!(reports[0].1.contains("Acne 1: Width = 3px, Height = 2px"));
        assert!(reports[0].1.contains("Acne 2: Width = 1px, Height = 1px"));
        assert!(reports[0].1.ends_with("Total acne(s) detected: 2\n"));
    }

    #[test]
    fn test_source_frame_is_not_annotated_in_place() {
        let written = Written::default();
        let mut detector = StubDetector {
            detections: vec![detection(1.0, 1.0)],
        };
        let input = frame();
        use_case(&written)
            .execute(&mut detector, &CountingAnnotator, &mut NullSessionLogger, &input)
            .unwrap();
        assert!(input.data().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_zero_detections_still_writes_report() {
        let written = Written::default();
        let mut detector = StubDetector { detections: vec![] };

        let summary = use_case(&written)
            .execute(&mut detector, &CountingAnnotator, &mut NullSessionLogger, &frame())
            .unwrap();

        assert_eq!(summary.report.total(), 0);
        let reports = written.reports.lock().unwrap();
        assert!(!reports[0].1.contains("Acne 1"));
        assert!(reports[0].1.ends_with("Total acne(s) detected: 0\n"));
    }

    #[test]
    fn test_detector_error_writes_nothing() {
        let written = Written::default();
        let err = use_case(&written)
            .execute(&mut FailingDetector, &CountingAnnotator, &mut NullSessionLogger, &frame())
            .unwrap_err();

        assert!(matches!(err, SessionError::Detection(_)));
        assert!(written.images.lock().unwrap().is_empty());
        assert!(written.reports.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_error_names_the_file() {
        let written = Written::default();
        let use_case = FinalReportUseCase::new(
            Box::new(StubImageWriter(written.clone())),
            Box::new(FailingReportWriter),
            OutputPaths::in_dir(Path::new("/out")),
        );
        let mut detector = StubDetector { detections: vec![] };

        let err = use_case
            .execute(&mut detector, &CountingAnnotator, &mut NullSessionLogger, &frame())
            .unwrap_err();
        match err {
            SessionError::Write { path, reason } => {
                assert_eq!(path, Path::new("/out/acne_detection_results.txt"));
                assert_eq!(reason, "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
