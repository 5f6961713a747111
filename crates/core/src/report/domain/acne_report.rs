use std::fmt::Write;

use crate::detection::domain::detection::Detection;

const TITLE: &str = "Acne Detection Results";

/// Pixel size of one detected lesion, as it appears in the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcneMeasurement {
    pub width: u32,
    pub height: u32,
}

/// Per-box sizes of one detection pass, in detection order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AcneReport {
    measurements: Vec<AcneMeasurement>,
}

impl AcneReport {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let measurements = detections
            .iter()
            .map(|d| AcneMeasurement {
                width: d.width_px(),
                height: d.height_px(),
            })
            .collect();
        Self { measurements }
    }

    pub fn measurements(&self) -> &[AcneMeasurement] {
        &self.measurements
    }

    pub fn total(&self) -> usize {
        self.measurements.len()
    }

    /// Renders the plain-text report.
    ///
    /// ```text
    /// Acne Detection Results
    /// ======================
    ///
    /// Acne 1: Width = 12px, Height = 9px
    ///
    /// Total acne(s) detected: 1
    /// ```
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{TITLE}");
        let _ = writeln!(out, "{}", "=".repeat(TITLE.len()));
        out.push('\n');
        for (i, m) in self.measurements.iter().enumerate() {
            let _ = writeln!(
                out,
                "Acne {}: Width = {}px, Height = {}px",
                i + 1,
                m.width,
                m.height
            );
        }
        out.push('\n');
        let _ = writeln!(out, "Total acne(s) detected: {}", self.total());
        out
    }
}
