use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::detection::domain::acne_detector::AcneDetector;
use crate::detection::domain::detection::Detection;
use crate::detection::infrastructure::skip_frame_detector::SkipFrameDetector;
use crate::pipeline::final_report_use_case::{DetectionSummary, FinalReportUseCase};
use crate::pipeline::session_error::SessionError;
use crate::pipeline::session_logger::SessionLogger;
use crate::shared::constants::DEFAULT_SKIP_INTERVAL;
use crate::shared::frame::Frame;

/// Events published by the capture worker for a display surface.
#[derive(Debug)]
pub enum SessionEvent {
    /// An annotated live frame and the detections drawn on it.
    Frame {
        frame: Frame,
        detections: Vec<Detection>,
    },
    /// The source stopped producing frames; carries the read error, if any.
    SourceEnded(Option<String>),
}

#[derive(Debug)]
pub enum StartOutcome {
    Started(SourceInfo),
    AlreadyRunning,
}

#[derive(Debug)]
pub enum StopOutcome {
    NotRunning,
    NoFrameCaptured,
    Reported(DetectionSummary),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Run inference on every Nth live frame.
    pub skip_interval: usize,
    /// Live frames buffered for the display before new ones are dropped.
    pub event_capacity: usize,
    /// Redraw the latest boxes on frames that skip inference. When false
    /// those frames are shown raw.
    pub hold_overlays: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            skip_interval: DEFAULT_SKIP_INTERVAL,
            event_capacity: 2,
            hold_overlays: true,
        }
    }
}

/// Collaborators owned by the session while idle and by the worker while running.
struct Engine {
    detector: Box<dyn AcneDetector>,
    annotator: Box<dyn FrameAnnotator>,
    logger: Box<dyn SessionLogger>,
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Engine>,
}

/// Owns the detector and drives live capture.
///
/// Idle until [`CaptureSession::start`] hands the engine to a worker thread;
/// [`CaptureSession::stop`] joins the worker, takes the engine back and runs
/// a full-quality detection on the last captured frame.
pub struct CaptureSession {
    engine: Option<Engine>,
    worker: Option<Worker>,
    final_report: FinalReportUseCase,
    config: SessionConfig,
    last_frame: Arc<Mutex<Option<Frame>>>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
}

impl CaptureSession {
    pub fn new(
        detector: Box<dyn AcneDetector>,
        annotator: Box<dyn FrameAnnotator>,
        logger: Box<dyn SessionLogger>,
        final_report: FinalReportUseCase,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if config.skip_interval < 1 {
            return Err(SessionError::InvalidSkipInterval(config.skip_interval));
        }
        let (events_tx, events_rx) = crossbeam_channel::bounded(config.event_capacity.max(1));
        Ok(Self {
            engine: Some(Engine {
                detector,
                annotator,
                logger,
            }),
            worker: None,
            final_report,
            config,
            last_frame: Arc::new(Mutex::new(None)),
            events_tx,
            events_rx,
        })
    }

    /// True from a successful start until [`CaptureSession::stop`], even if
    /// the source has already ended and sent [`SessionEvent::SourceEnded`].
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Receiver for live frames; clones share the same queue.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Opens `source` and starts the capture worker.
    ///
    /// While a worker is running this is a no-op and `source` is dropped
    /// unopened. If the source fails to open no worker is started.
    pub fn start(&mut self, mut source: Box<dyn FrameSource>) -> Result<StartOutcome, SessionError> {
        if self.worker.is_some() {
            log::debug!("Start ignored: capture already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if self.engine.is_none() {
            return Err(SessionError::DetectorLost);
        }

        let info = source
            .open()
            .map_err(|e| SessionError::CameraUnavailable(e.to_string()))?;

        let Some(engine) = self.engine.take() else {
            return Err(SessionError::DetectorLost);
        };
        let Engine {
            detector,
            annotator,
            mut logger,
        } = engine;
        let detector = SkipFrameDetector::new(detector, self.config.skip_interval)
            .map_err(|_| SessionError::InvalidSkipInterval(self.config.skip_interval))?;

        *lock_slot(&self.last_frame) = None;
        while self.events_rx.try_recv().is_ok() {}
        logger.info(&format!("Capture started: {}", info.description));

        let stop = Arc::new(AtomicBool::new(false));
        let live = LiveLoop {
            source,
            detector,
            annotator,
            logger,
            hold_overlays: self.config.hold_overlays,
            stop: stop.clone(),
            last_frame: self.last_frame.clone(),
            events: self.events_tx.clone(),
            stale: self.events_rx.clone(),
        };
        let handle = thread::Builder::new()
            .name("acnescan-capture".to_string())
            .spawn(move || live.run())
            .map_err(|e| {
                SessionError::CameraUnavailable(format!("cannot start capture thread: {e}"))
            })?;

        self.worker = Some(Worker { stop, handle });
        Ok(StartOutcome::Started(info))
    }

    /// Stops the worker, waits for it to exit and reports on the last frame.
    pub fn stop(&mut self) -> Result<StopOutcome, SessionError> {
        let Some(worker) = self.worker.take() else {
            log::debug!("Stop ignored: capture not running");
            return Ok(StopOutcome::NotRunning);
        };

        worker.stop.store(true, Ordering::Release);
        let engine = worker.handle.join().map_err(|_| SessionError::WorkerPanicked)?;
        engine.logger.summary();
        self.engine = Some(engine);
        while self.events_rx.try_recv().is_ok() {}

        let Some(frame) = lock_slot(&self.last_frame).take() else {
            return Ok(StopOutcome::NoFrameCaptured);
        };
        self.run_final_report(&frame).map(StopOutcome::Reported)
    }

    /// Full-quality detection on a still frame, writing the same outputs
    /// as a stopped session.
    pub fn detect_still(&mut self, frame: &Frame) -> Result<DetectionSummary, SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::Busy);
        }
        self.run_final_report(frame)
    }

    /// Stops any running worker and releases the detector, e.g. to rebuild
    /// the session with new settings.
    pub fn into_detector(mut self) -> Option<Box<dyn AcneDetector>> {
        self.shutdown_worker();
        self.engine.take().map(|engine| engine.detector)
    }

    fn shutdown_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Release);
            match worker.handle.join() {
                Ok(engine) => self.engine = Some(engine),
                Err(_) => log::error!("Capture worker panicked during shutdown"),
            }
        }
    }

    fn run_final_report(&mut self, frame: &Frame) -> Result<DetectionSummary, SessionError> {
        let engine = self.engine.as_mut().ok_or(SessionError::DetectorLost)?;
        self.final_report.execute(
            engine.detector.as_mut(),
            engine.annotator.as_ref(),
            engine.logger.as_mut(),
            frame,
        )
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown_worker();
    }
}

fn lock_slot(slot: &Mutex<Option<Frame>>) -> MutexGuard<'_, Option<Frame>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State moved into the capture thread.
struct LiveLoop {
    source: Box<dyn FrameSource>,
    detector: SkipFrameDetector,
    annotator: Box<dyn FrameAnnotator>,
    logger: Box<dyn SessionLogger>,
    hold_overlays: bool,
    stop: Arc<AtomicBool>,
    last_frame: Arc<Mutex<Option<Frame>>>,
    events: Sender<SessionEvent>,
    /// Used only to evict queued frames when the end event must get through.
    stale: Receiver<SessionEvent>,
}

impl LiveLoop {
    fn run(mut self) -> Engine {
        let mut dropped = 0usize;
        let ended = loop {
            if self.stop.load(Ordering::Acquire) {
                break None;
            }

            let frame = match self.source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break Some(None),
                Err(e) => {
                    log::warn!("Capture read failed: {e}");
                    break Some(Some(e.to_string()));
                }
            };
            self.logger.frame(frame.index());
            *lock_slot(&self.last_frame) = Some(frame.clone());

            let t0 = Instant::now();
            let inferred = self.detector.will_infer();
            let detections = match self.detector.detect(&frame) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Live detection failed: {e}");
                    break Some(Some(format!("detection failed: {e}")));
                }
            };
            if inferred {
                self.logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);
                self.logger.metric("detections", detections.len() as f64);
            }
            let detections = if inferred || self.hold_overlays {
                detections
            } else {
                Vec::new()
            };

            let mut annotated = frame;
            let t1 = Instant::now();
            if let Err(e) = self.annotator.annotate(&mut annotated, &detections) {
                log::warn!("Annotation failed: {e}");
            }
            self.logger.timing("annotate", t1.elapsed().as_secs_f64() * 1000.0);

            match self.events.try_send(SessionEvent::Frame {
                frame: annotated,
                detections,
            }) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(_)) => dropped += 1,
            }
        };

        self.source.close();
        if dropped > 0 {
            self.logger.metric("dropped_frames", dropped as f64);
        }
        if let Some(error) = ended {
            self.publish_end(error);
        }

        Engine {
            detector: self.detector.into_inner(),
            annotator: self.annotator,
            logger: self.logger,
        }
    }

    /// Delivers `SourceEnded` even when the display has fallen behind, by
    /// dropping the oldest queued frames.
    fn publish_end(&self, error: Option<String>) {
        let mut event = SessionEvent::SourceEnded(error);
        loop {
            match self.events.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    let _ = self.stale.try_recv();
                    event = back;
                }
            }
        }
    }
}
