use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use acnescan_core::detection::domain::acne_detector::AcneDetector;
use acnescan_core::detection::infrastructure::model_resolver::{self, ModelRequest};
use acnescan_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use acnescan_core::shared::constants::{DEFAULT_LABELS, MODEL_NAME, MODEL_URL_ENV};

/// What the background loader should load.
#[derive(Clone, Debug)]
pub struct ModelOptions {
    pub request: ModelRequest,
    pub labels: Vec<String>,
    pub confidence: f64,
}

impl ModelOptions {
    /// Default model lookup with the given threshold.
    pub fn with_confidence(confidence: f64) -> Self {
        Self {
            request: ModelRequest {
                name: MODEL_NAME.to_string(),
                path: None,
                bundled_dir: bundled_model_dir(),
                url: std::env::var(MODEL_URL_ENV).ok(),
            },
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            confidence,
        }
    }
}

/// `models/` next to the executable, or in the app bundle's resources.
fn bundled_model_dir() -> Option<PathBuf> {
    let exe_dir = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let resources = exe_dir.join("../Resources/models");
    if cfg!(target_os = "macos") && resources.is_dir() {
        Some(resources)
    } else {
        Some(exe_dir.join("models"))
    }
}

pub enum ModelStatus {
    Loading { downloaded: u64, total: u64 },
    Ready(Box<dyn AcneDetector>),
    Failed(String),
}

enum Slot {
    Pending,
    Ready(Box<dyn AcneDetector>),
    Failed(String),
    Taken,
}

/// Resolves and loads the detection model on a background thread.
///
/// The UI polls [`ModelCache::poll`]; the detector is handed out exactly once.
pub struct ModelCache {
    slot: Mutex<Slot>,
    progress: Mutex<(u64, u64)>,
}

impl ModelCache {
    pub fn spawn(options: ModelOptions) -> Arc<Self> {
        let cache = Arc::new(Self {
            slot: Mutex::new(Slot::Pending),
            progress: Mutex::new((0, 0)),
        });

        let worker = cache.clone();
        thread::spawn(move || {
            let result = worker.load(&options);
            if let Err(ref e) = result {
                log::error!("Model loading failed: {e}");
            }
            *lock(&worker.slot) = match result {
                Ok(detector) => Slot::Ready(detector),
                Err(e) => Slot::Failed(e),
            };
        });

        cache
    }

    fn load(self: &Arc<Self>, options: &ModelOptions) -> Result<Box<dyn AcneDetector>, String> {
        let progress_sink = self.clone();
        let path = model_resolver::resolve(
            &options.request,
            Some(Box::new(move |downloaded, total| {
                *lock(&progress_sink.progress) = (downloaded, total);
            })),
        )
        .map_err(|e| e.to_string())?;

        let detector = OnnxYoloDetector::new(&path, options.labels.clone(), options.confidence)
            .map_err(|e| format!("Could not load {}: {e}", path.display()))?;
        Ok(Box::new(detector))
    }

    pub fn poll(&self) -> ModelStatus {
        let mut slot = lock(&self.slot);
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Pending => {
                *slot = Slot::Pending;
                let (downloaded, total) = *lock(&self.progress);
                ModelStatus::Loading { downloaded, total }
            }
            Slot::Ready(detector) => ModelStatus::Ready(detector),
            Slot::Failed(e) => {
                *slot = Slot::Failed(e.clone());
                ModelStatus::Failed(e)
            }
            Slot::Taken => ModelStatus::Failed("model already handed out".to_string()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
