use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("skip interval must be at least 1, got {0}")]
    InvalidSkipInterval(usize),
    #[error("a capture session is already running")]
    Busy,
    #[error("capture worker panicked")]
    WorkerPanicked,
    #[error("detector is no longer available")]
    DetectorLost,
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("annotation failed: {0}")]
    Annotation(String),
    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}
