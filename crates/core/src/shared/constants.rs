pub const MODEL_NAME: &str = "acne_yolo11n.onnx";

/// Environment variable consulted for a model download URL when none is given.
pub const MODEL_URL_ENV: &str = "ACNESCAN_MODEL_URL";

/// Class labels used when the caller does not provide any.
pub const DEFAULT_LABELS: &[&str] = &["acne"];

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Run inference on every Nth frame of a live session.
pub const DEFAULT_SKIP_INTERVAL: usize = 2;

pub const DEFAULT_CAMERA_INDEX: u32 = 0;

pub const ANNOTATED_IMAGE_NAME: &str = "result.png";
pub const REPORT_FILE_NAME: &str = "acne_detection_results.txt";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
