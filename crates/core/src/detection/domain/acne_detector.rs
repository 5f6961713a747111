use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for acne detection.
///
/// Implementations may keep per-frame state (e.g. frame skipping),
/// hence `&mut self`.
pub trait AcneDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
