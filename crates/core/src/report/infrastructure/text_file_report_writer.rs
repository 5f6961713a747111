use std::path::Path;

use crate::report::domain::acne_report::AcneReport;
use crate::report::domain::report_writer::ReportWriter;

/// Writes the rendered report as UTF-8 text, replacing any previous file.
#[derive(Default)]
pub struct TextFileReportWriter;

impl TextFileReportWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportWriter for TextFileReportWriter {
    fn write(&self, path: &Path, report: &AcneReport) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, report.render())?;
        log::debug!("Wrote report ({} entries) to {}", report.total(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Detection;

    #[test]
    fn test_writes_rendered_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acne_detection_results.txt");
        let report = AcneReport::from_detections(&[Detection {
            x1: 1.0,
            y1: 2.0,
            x2: 8.5,
            y2: 6.0,
            confidence: 0.7,
            class_id: 0,
            label: "acne".to_string(),
        }]);

        TextFileReportWriter::new().write(&path, &report).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, report.render());
        assert!(text.contains("Acne 1: Width = 7px, Height = 4px"));
    }

    #[test]
    fn test_overwrites_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "stale contents that are much longer than a report").unwrap();

        let report = AcneReport::from_detections(&[]);
        TextFileReportWriter::new().write(&path, &report).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), report.render());
    }

    #[test]
    fn test_unwritable_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let report = AcneReport::default();
        assert!(TextFileReportWriter::new()
            .write(&blocker.join("report.txt"), &report)
            .is_err());
    }
}
