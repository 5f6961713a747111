use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("frame source is not open")]
    NotOpen,
    #[error("failed to decode frame: {0}")]
    Decode(String),
}

/// Properties of an opened source.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate; `None` for still images.
    pub fps: Option<f64>,
    pub description: String,
}

/// A camera or still image producing RGB frames.
///
/// `open` is called on the controlling thread so failures surface before any
/// worker starts; the opened source is then moved to the capture worker.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, CaptureError>;

    /// Next frame, or `None` once the source is exhausted.
    fn read(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Releases the device. Safe to call more than once.
    fn close(&mut self);
}
