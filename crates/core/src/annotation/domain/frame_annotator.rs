use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for drawing detection overlays onto a frame.
///
/// Implementations modify the frame in-place (`&mut Frame`) to avoid allocation.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
