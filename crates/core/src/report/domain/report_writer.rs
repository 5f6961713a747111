use std::path::Path;

use super::acne_report::AcneReport;

/// Domain interface for persisting a rendered detection report.
pub trait ReportWriter: Send {
    fn write(&self, path: &Path, report: &AcneReport) -> Result<(), Box<dyn std::error::Error>>;
}
