use std::path::Path;

use crate::shared::frame::Frame;

/// Domain interface for saving a single frame as an image.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
