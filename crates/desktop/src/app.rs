use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, image, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use acnescan_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use acnescan_core::capture::infrastructure::ffmpeg_camera_source::{CameraConfig, FfmpegCameraSource};
use acnescan_core::capture::infrastructure::image_file_reader::read_image;
use acnescan_core::detection::domain::acne_detector::AcneDetector;
use acnescan_core::pipeline::capture_session::{
    CaptureSession, SessionConfig, SessionEvent, StartOutcome, StopOutcome,
};
use acnescan_core::pipeline::final_report_use_case::{
    DetectionSummary, FinalReportUseCase, OutputPaths,
};
use acnescan_core::pipeline::session_error::SessionError;
use acnescan_core::pipeline::session_logger::NullSessionLogger;
use acnescan_core::report::infrastructure::image_file_writer::ImageFileWriter;
use acnescan_core::report::infrastructure::text_file_report_writer::TextFileReportWriter;
use acnescan_core::shared::constants::IMAGE_EXTENSIONS;
use acnescan_core::shared::frame::Frame;

use crate::settings::{Appearance, Settings};
use crate::tabs;
use crate::theme;
use crate::workers::model_cache::{ModelCache, ModelOptions, ModelStatus};

/// Largest size a frame is shown at; bigger frames are downscaled first.
const DISPLAY_MAX_WIDTH: u32 = 960;
const DISPLAY_MAX_HEIGHT: u32 = 720;
const POLL_INTERVAL: Duration = Duration::from_millis(30);

// ---------------------------------------------------------------------------
// Tab enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Detect,
    Settings,
    Appearance,
    About,
}

impl Tab {
    const ALL: &[Tab] = &[Tab::Detect, Tab::Settings, Tab::Appearance, Tab::About];

    fn label(self) -> &'static str {
        match self {
            Tab::Detect => "Detect",
            Tab::Settings => "Settings",
            Tab::Appearance => "Appearance",
            Tab::About => "About",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    Start,
    Stop,
    Tick,
    OpenImage,
    ImageSelected(Option<PathBuf>),
    ShowReport,
    CameraIndexChanged(u32),
    ConfidenceChanged(u32),
    ConfidenceReleased,
    SkipIntervalChanged(u32),
    HoldOverlaysChanged(bool),
    SelectOutputDir,
    OutputDirSelected(Option<PathBuf>),
    RestoreDefaults,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    PollSystemTheme,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Loading { downloaded: u64, total: u64 },
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Info(String),
    Error(String),
}

/// Annotated image and report from the most recent stop or still detection.
pub struct LastResult {
    pub image: image::Handle,
    pub report_text: String,
    pub report_path: PathBuf,
}

pub struct App {
    active_tab: Tab,
    pub settings: Settings,
    model_cache: Option<Arc<ModelCache>>,
    model_state: ModelState,
    session: Option<CaptureSession>,
    events: Option<Receiver<SessionEvent>>,
    live_frame: Option<image::Handle>,
    live_detections: usize,
    result: Option<LastResult>,
    status: Status,
    rebuild_pending: bool,
    reload_pending: bool,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let cache = ModelCache::spawn(ModelOptions::with_confidence(
            settings.confidence_threshold(),
        ));
        (
            Self {
                active_tab: Tab::Detect,
                settings,
                model_cache: Some(cache),
                model_state: ModelState::Loading {
                    downloaded: 0,
                    total: 0,
                },
                session: None,
                events: None,
                live_frame: None,
                live_detections: 0,
                result: None,
                status: Status::Idle,
                rebuild_pending: false,
                reload_pending: false,
            },
            Task::none(),
        )
    }

    fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_running())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::Start => self.start_capture(),
            Message::Stop => self.stop_capture(),
            Message::Tick => {
                self.poll_model();
                self.poll_events();
            }
            Message::OpenImage => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select an image")
                            .add_filter("Images", IMAGE_EXTENSIONS)
                            .pick_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::ImageSelected,
                );
            }
            Message::ImageSelected(Some(path)) => self.detect_image(path),
            Message::ImageSelected(None) => {}
            Message::ShowReport => {
                if let Some(result) = &self.result {
                    if let Err(e) = open::that(&result.report_path) {
                        self.status = Status::Error(format!("Could not open report: {e}"));
                    }
                }
            }
            Message::CameraIndexChanged(index) => {
                self.settings.camera_index = index;
                self.settings.save();
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            Message::ConfidenceReleased => self.request_reload(),
            Message::SkipIntervalChanged(val) => {
                self.settings.skip_interval = val;
                self.settings.save();
                self.request_rebuild();
            }
            Message::HoldOverlaysChanged(enabled) => {
                self.settings.hold_overlays = enabled;
                self.settings.save();
                self.request_rebuild();
            }
            Message::SelectOutputDir => {
                let start_dir = self.settings.output_dir();
                return Task::perform(
                    async move {
                        rfd::AsyncFileDialog::new()
                            .set_title("Save results to")
                            .set_directory(start_dir)
                            .pick_folder()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::OutputDirSelected,
                );
            }
            Message::OutputDirSelected(Some(dir)) => {
                self.settings.output_dir = Some(dir);
                self.settings.save();
                self.request_rebuild();
            }
            Message::OutputDirSelected(None) => {}
            Message::RestoreDefaults => {
                let defaults = Settings::default();
                self.settings.camera_index = defaults.camera_index;
                self.settings.confidence = defaults.confidence;
                self.settings.skip_interval = defaults.skip_interval;
                self.settings.output_dir = defaults.output_dir;
                self.settings.save();
                self.request_reload();
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::PollSystemTheme => {
                // theme() re-resolves on every render
            }
        }
        Task::none()
    }

    // --- Capture ---

    fn start_capture(&mut self) {
        let Some(session) = self.session.as_mut() else {
            self.status = Status::Error("The detection model is not ready yet".to_string());
            return;
        };
        let source = FfmpegCameraSource::new(CameraConfig {
            index: self.settings.camera_index,
            ..CameraConfig::default()
        });
        match session.start(Box::new(source)) {
            Ok(StartOutcome::Started(info)) => {
                self.events = Some(session.events());
                self.live_frame = None;
                self.live_detections = 0;
                self.result = None;
                self.status = Status::Info(format!("Detecting on {}", info.description));
            }
            Ok(StartOutcome::AlreadyRunning) => {}
            Err(e) => self.status = Status::Error(e.to_string()),
        }
    }

    fn stop_capture(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.stop() {
            Ok(StopOutcome::NotRunning) => {}
            Ok(StopOutcome::NoFrameCaptured) => {
                self.status = Status::Error("No frame captured".to_string());
            }
            Ok(StopOutcome::Reported(summary)) => self.show_summary(summary),
            Err(e) => self.status = Status::Error(e.to_string()),
        }
        self.events = None;
        self.live_frame = None;
        self.apply_pending_changes();
    }

    fn poll_events(&mut self) {
        let Some(events) = &self.events else {
            return;
        };
        let mut latest = None;
        let mut ended = None;
        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::Frame { frame, detections } => latest = Some((frame, detections.len())),
                SessionEvent::SourceEnded(error) => ended = Some(error),
            }
        }

        if let Some((frame, count)) = latest {
            self.live_frame = Some(to_handle(&frame));
            self.live_detections = count;
        }
        if let Some(error) = ended {
            self.stop_capture();
            if let Some(error) = error {
                self.status = Status::Error(format!("Camera stopped: {error}"));
            }
        }
    }

    fn detect_image(&mut self, path: PathBuf) {
        let Some(session) = self.session.as_mut() else {
            self.status = Status::Error("The detection model is not ready yet".to_string());
            return;
        };
        let result = read_image(&path)
            .map_err(|e| e.to_string())
            .and_then(|frame| session.detect_still(&frame).map_err(|e| e.to_string()));
        match result {
            Ok(summary) => self.show_summary(summary),
            Err(e) => self.status = Status::Error(e),
        }
    }

    fn show_summary(&mut self, summary: DetectionSummary) {
        self.status = Status::Info(format!(
            "Detected {} acne(s). Results saved to {}",
            summary.report.total(),
            summary.paths.report_path.display()
        ));
        self.result = Some(LastResult {
            image: to_handle(&summary.annotated),
            report_text: summary.report.render(),
            report_path: summary.paths.report_path,
        });
    }

    // --- Model and session lifecycle ---

    fn poll_model(&mut self) {
        let Some(cache) = &self.model_cache else {
            return;
        };
        match cache.poll() {
            ModelStatus::Loading { downloaded, total } => {
                self.model_state = ModelState::Loading { downloaded, total };
            }
            ModelStatus::Ready(detector) => {
                self.model_cache = None;
                match build_session(detector, &self.settings) {
                    Ok(session) => {
                        self.session = Some(session);
                        self.model_state = ModelState::Ready;
                    }
                    Err(e) => self.model_state = ModelState::Failed(e.to_string()),
                }
            }
            ModelStatus::Failed(e) => {
                self.model_cache = None;
                self.model_state = ModelState::Failed(e);
            }
        }
    }

    /// Session settings changed; rebuild around the same detector.
    fn request_rebuild(&mut self) {
        self.rebuild_pending = true;
        if !self.is_running() {
            self.apply_pending_changes();
        }
    }

    /// Detector settings changed; the model has to be loaded again.
    fn request_reload(&mut self) {
        self.reload_pending = true;
        if !self.is_running() {
            self.apply_pending_changes();
        }
    }

    fn apply_pending_changes(&mut self) {
        if std::mem::take(&mut self.reload_pending) {
            self.rebuild_pending = false;
            self.session = None;
            self.model_cache = Some(ModelCache::spawn(ModelOptions::with_confidence(
                self.settings.confidence_threshold(),
            )));
            self.model_state = ModelState::Loading {
                downloaded: 0,
                total: 0,
            };
        } else if std::mem::take(&mut self.rebuild_pending) {
            let Some(detector) = self.session.take().and_then(|s| s.into_detector()) else {
                return;
            };
            match build_session(detector, &self.settings) {
                Ok(session) => self.session = Some(session),
                Err(e) => self.model_state = ModelState::Failed(e.to_string()),
            }
        }
    }

    // --- View ---

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;
        let theme = self.theme();

        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let content: Element<'_, Message> = match self.active_tab {
            Tab::Detect => tabs::detect_tab::view(tabs::detect_tab::DetectView {
                fs,
                muted: theme::muted_color(&theme),
                danger: theme.palette().danger,
                model_state: &self.model_state,
                running: self.is_running(),
                live_frame: self.live_frame.as_ref(),
                live_detections: self.live_detections,
                result: self.result.as_ref(),
                status: &self.status,
            }),
            Tab::Settings => tabs::settings_tab::view(&self.settings, self.is_running()),
            Tab::Appearance => tabs::appearance_tab::view(&self.settings),
            Tab::About => tabs::about_tab::view(fs),
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        column![tab_bar, tab_content]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let polling = if self.model_cache.is_some() || self.is_running() {
            iced::time::every(POLL_INTERVAL).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };
        let system_theme = if self.settings.appearance == Appearance::System {
            iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme)
        } else {
            Subscription::none()
        };
        Subscription::batch([polling, system_theme])
    }
}

fn build_session(
    detector: Box<dyn AcneDetector>,
    settings: &Settings,
) -> Result<CaptureSession, SessionError> {
    let final_report = FinalReportUseCase::new(
        Box::new(ImageFileWriter::new()),
        Box::new(TextFileReportWriter::new()),
        OutputPaths::in_dir(&settings.output_dir()),
    );
    CaptureSession::new(
        detector,
        Box::new(BoxAnnotator::new()),
        Box::new(NullSessionLogger),
        final_report,
        SessionConfig {
            skip_interval: settings.skip_interval as usize,
            hold_overlays: settings.hold_overlays,
            ..SessionConfig::default()
        },
    )
}

fn to_handle(frame: &Frame) -> image::Handle {
    let fitted = frame.fit_within(DISPLAY_MAX_WIDTH, DISPLAY_MAX_HEIGHT);
    image::Handle::from_rgba(fitted.width(), fitted.height(), fitted.to_rgba())
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
