use iced::widget::{column, text, Space};
use iced::Element;

use acnescan_core::detection::infrastructure::model_resolver::model_cache_dir;
use acnescan_core::shared::constants::{ANNOTATED_IMAGE_NAME, MODEL_NAME, REPORT_FILE_NAME};

use crate::app::{scaled, Message};

pub fn view(fs: f32) -> Element<'static, Message> {
    let version = env!("CARGO_PKG_VERSION");
    let cache = model_cache_dir()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|_| "unavailable".to_string());

    column![
        text("AcneScan").size(scaled(22.0, fs)),
        Space::new().height(4),
        text(format!("Version {version}")).size(scaled(13.0, fs)),
        Space::new().height(12),
        text(
            "Detects acne on a webcam feed or a photo with a YOLO model. \
             Stopping a capture saves the annotated frame and a size report."
        )
        .size(scaled(13.0, fs)),
        Space::new().height(16),
        text(format!("Model: {MODEL_NAME}")).size(scaled(13.0, fs)),
        text(format!("Model cache: {cache}")).size(scaled(13.0, fs)),
        text(format!("Outputs: {ANNOTATED_IMAGE_NAME}, {REPORT_FILE_NAME}")).size(scaled(13.0, fs)),
        Space::new().height(16),
        text("Results are not a medical diagnosis.").size(scaled(12.0, fs)),
    ]
    .spacing(2)
    .into()
}
