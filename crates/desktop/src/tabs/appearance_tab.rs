use iced::widget::{checkbox, column, pick_list, row, slider, text, Space};
use iced::{Element, Length};

use crate::app::{scaled, Message};
use crate::settings::{Appearance, Settings};

pub fn view<'a>(settings: &Settings) -> Element<'a, Message> {
    let fs = settings.font_scale;

    let mode = row![
        text("Mode").size(scaled(13.0, fs)).width(Length::Fixed(130.0)),
        pick_list(Appearance::ALL, Some(settings.appearance), Message::AppearanceChanged)
            .text_size(scaled(13.0, fs)),
    ]
    .spacing(12)
    .align_y(iced::Alignment::Center);

    let text_size = row![
        text("Text size").size(scaled(13.0, fs)).width(Length::Fixed(130.0)),
        slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
        text(format!("{:.0}%", settings.font_scale * 100.0)).size(scaled(13.0, fs)),
    ]
    .spacing(12)
    .align_y(iced::Alignment::Center);

    column![
        text("Appearance").size(scaled(16.0, fs)),
        Space::new().height(8),
        mode,
        Space::new().height(12),
        checkbox(settings.high_contrast)
            .label("High contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(scaled(13.0, fs)),
        Space::new().height(12),
        text_size,
        Space::new().height(16),
        text("Acne 1: Width = 12px, Height = 9px")
            .size(scaled(12.0, fs))
            .font(iced::Font::MONOSPACE),
    ]
    .spacing(0)
    .into()
}
