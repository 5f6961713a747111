use iced::widget::{button, checkbox, column, row, slider, text, Space};
use iced::{Element, Length};

use crate::app::{scaled, Message};
use crate::settings::{Settings, MAX_CAMERA_INDEX, MAX_SKIP_INTERVAL};

pub fn view<'a>(settings: &Settings, running: bool) -> Element<'a, Message> {
    let fs = settings.font_scale;
    let output_dir = settings.output_dir().display().to_string();

    let labeled = |label: &'a str, value: String, control: Element<'a, Message>| {
        row![
            text(label).size(scaled(13.0, fs)).width(Length::Fixed(130.0)),
            control,
            text(value).size(scaled(13.0, fs)).width(Length::Fixed(80.0)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center)
    };

    let mut content = column![
        text("Camera").size(scaled(16.0, fs)),
        Space::new().height(8),
        labeled(
            "Camera index",
            settings.camera_index.to_string(),
            slider(0..=MAX_CAMERA_INDEX, settings.camera_index, Message::CameraIndexChanged)
                .into(),
        ),
        Space::new().height(20),
        text("Detection").size(scaled(16.0, fs)),
        Space::new().height(8),
        labeled(
            "Confidence",
            format!("{}%", settings.confidence),
            slider(1..=100, settings.confidence, Message::ConfidenceChanged)
                .on_release(Message::ConfidenceReleased)
                .into(),
        ),
        Space::new().height(8),
        labeled(
            "Detect every",
            format!("{} frame(s)", settings.skip_interval),
            slider(
                1..=MAX_SKIP_INTERVAL,
                settings.skip_interval,
                Message::SkipIntervalChanged,
            )
            .into(),
        ),
        Space::new().height(8),
        checkbox(settings.hold_overlays)
            .label("Keep boxes on skipped frames")
            .on_toggle(Message::HoldOverlaysChanged)
            .text_size(scaled(13.0, fs)),
        Space::new().height(20),
        text("Results").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text(output_dir).size(scaled(13.0, fs)),
            button(text("Change\u{2026}").size(scaled(13.0, fs)))
                .on_press(Message::SelectOutputDir)
                .style(button::secondary),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        Space::new().height(24),
        button(text("Restore Defaults").size(scaled(13.0, fs)))
            .on_press(Message::RestoreDefaults)
            .style(button::secondary),
    ]
    .spacing(0);

    if running {
        content = content.push(Space::new().height(12)).push(
            text("Changes take effect when detection stops.").size(scaled(12.0, fs)),
        );
    }

    content.into()
}
