use iced::widget::{button, column, container, image, row, scrollable, text, Space};
use iced::{Color, ContentFit, Element, Length};

use crate::app::{scaled, LastResult, Message, ModelState, Status};

/// Everything the Detect tab renders, borrowed from the app state.
pub struct DetectView<'a> {
    pub fs: f32,
    pub muted: Color,
    pub danger: Color,
    pub model_state: &'a ModelState,
    pub running: bool,
    pub live_frame: Option<&'a image::Handle>,
    pub live_detections: usize,
    pub result: Option<&'a LastResult>,
    pub status: &'a Status,
}

pub fn view<'a>(v: DetectView<'a>) -> Element<'a, Message> {
    let fs = v.fs;
    let ready = *v.model_state == ModelState::Ready;

    let controls = row![
        button(text("Start").size(scaled(14.0, fs)))
            .on_press_maybe((ready && !v.running).then_some(Message::Start))
            .style(button::primary)
            .padding([8, 20]),
        button(text("Stop").size(scaled(14.0, fs)))
            .on_press_maybe(v.running.then_some(Message::Stop))
            .style(button::danger)
            .padding([8, 20]),
        Space::new().width(Length::Fill),
        button(text("Open Image\u{2026}").size(scaled(14.0, fs)))
            .on_press_maybe((ready && !v.running).then_some(Message::OpenImage))
            .style(button::secondary)
            .padding([8, 16]),
        button(text("Show Report").size(scaled(14.0, fs)))
            .on_press_maybe(v.result.map(|_| Message::ShowReport))
            .style(button::secondary)
            .padding([8, 16]),
    ]
    .spacing(8)
    .align_y(iced::Alignment::Center);

    let status_line = status_text(&v);

    let body: Element<'a, Message> = if v.running {
        live_panel(fs, v.muted, v.live_frame, v.live_detections)
    } else if let Some(result) = v.result {
        result_panel(fs, result)
    } else {
        placeholder(fs, v.muted, "Press Start to detect acne on the webcam, or open an image.")
    };

    column![controls, status_line, body]
        .spacing(14)
        .width(Length::Fill)
        .into()
}

fn status_text<'a>(v: &DetectView<'a>) -> Element<'a, Message> {
    let fs = v.fs;
    let (message, color) = match (v.model_state, v.status) {
        (ModelState::Failed(e), _) => (format!("Model unavailable: {e}"), v.danger),
        (ModelState::Loading { downloaded, total }, _) if *total > 0 => {
            let pct = *downloaded as f64 / *total as f64 * 100.0;
            (format!("Downloading model\u{2026} {pct:.0}%"), v.muted)
        }
        (ModelState::Loading { .. }, _) => ("Loading model\u{2026}".to_string(), v.muted),
        (ModelState::Ready, Status::Error(e)) => (e.clone(), v.danger),
        (ModelState::Ready, Status::Info(m)) => (m.clone(), v.muted),
        (ModelState::Ready, Status::Idle) => ("Ready".to_string(), v.muted),
    };
    text(message).size(scaled(13.0, fs)).color(color).into()
}

fn live_panel<'a>(
    fs: f32,
    muted: Color,
    frame: Option<&'a image::Handle>,
    detections: usize,
) -> Element<'a, Message> {
    let Some(handle) = frame else {
        return placeholder(fs, muted, "Waiting for the camera\u{2026}");
    };
    column![
        image(handle.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill),
        text(format!("{detections} acne(s) in view"))
            .size(scaled(13.0, fs))
            .color(muted),
    ]
    .spacing(6)
    .into()
}

fn result_panel<'a>(fs: f32, result: &'a LastResult) -> Element<'a, Message> {
    let report = container(
        scrollable(
            text(result.report_text.as_str())
                .size(scaled(12.0, fs))
                .font(iced::Font::MONOSPACE),
        )
        .height(Length::Fill),
    )
    .padding(10)
    .width(Length::FillPortion(2))
    .height(Length::Fixed(scaled(320.0, fs)))
    .style(container::rounded_box);

    row![
        image(result.image.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::FillPortion(3)),
        report,
    ]
    .spacing(12)
    .into()
}

fn placeholder<'a>(fs: f32, muted: Color, message: &'a str) -> Element<'a, Message> {
    container(text(message).size(scaled(14.0, fs)).color(muted))
        .width(Length::Fill)
        .height(Length::Fixed(scaled(320.0, fs)))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(scaled(320.0, fs)))
        .style(container::rounded_box)
        .into()
}
