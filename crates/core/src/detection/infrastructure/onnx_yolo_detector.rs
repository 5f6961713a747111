/// YOLO acne detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, class selection and NMS
/// post-processing for detection-head exports (`[1, 4 + classes, anchors]`).
use std::path::Path;

use crate::detection::domain::acne_detector::AcneDetector;
use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of box values preceding the class scores in each output row.
const BOX_VALUES: usize = 4;

/// YOLO acne detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    labels: Vec<String>,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(
        model_path: &Path,
        labels: Vec<String>,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded {} (input {input_size}x{input_size}, {} label(s))",
            model_path.display(),
            labels.len()
        );

        Ok(Self {
            session,
            labels,
            confidence,
            input_size,
        })
    }
}

impl AcneDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let layout = OutputLayout::from_shape(&shape)?;
        let candidates = decode(data, &layout, self.confidence, letterbox, &self.labels);

        Ok(nms(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|d| d.clamped(frame.width(), frame.height()))
            .collect())
    }
}

fn label_for(labels: &[String], class_id: usize) -> String {
    labels
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class {class_id}"))
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping from letterboxed model coordinates back to the source frame.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size`.
///
/// Returns the NCHW float32 tensor and the mapping needed to undo it.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is YOLO gray 114
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Shape of the raw output: `[1, features, anchors]` (ultralytics default)
/// or `[1, anchors, features]`.
#[derive(Debug, PartialEq)]
struct OutputLayout {
    anchors: usize,
    features: usize,
    transposed: bool,
}

impl OutputLayout {
    fn from_shape(shape: &[usize]) -> Result<Self, Box<dyn std::error::Error>> {
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (anchors, features) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if features <= BOX_VALUES {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }
        Ok(Self {
            anchors,
            features,
            transposed,
        })
    }

    fn value(&self, data: &[f32], anchor: usize, feature: usize) -> f32 {
        if self.transposed {
            data[feature * self.anchors + anchor]
        } else {
            data[anchor * self.features + feature]
        }
    }
}

/// Rows are `[cx, cy, w, h, score_0, score_1, ...]` in letterbox pixels.
/// Rows with non-finite values are dropped.
fn decode(
    data: &[f32],
    layout: &OutputLayout,
    confidence: f64,
    letterbox: Letterbox,
    labels: &[String],
) -> Vec<Detection> {
    let mut dets = Vec::new();
    for i in 0..layout.anchors {
        let (class_id, score) = (BOX_VALUES..layout.features)
            .map(|f| (f - BOX_VALUES, layout.value(data, i, f)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        let score = score as f64;
        if score < confidence {
            continue;
        }

        let cx = layout.value(data, i, 0) as f64;
        let cy = layout.value(data, i, 1) as f64;
        let w = layout.value(data, i, 2) as f64;
        let h = layout.value(data, i, 3) as f64;
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
            continue;
        }

        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        dets.push(Detection {
            x1,
            y1,
            x2,
            y2,
            confidence: score,
            class_id,
            label: label_for(labels, class_id),
        });
    }
    dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Class-aware greedy NMS: sort by confidence descending, suppress boxes of
/// the same class that overlap a kept box.
fn nms(mut dets: Vec<Detection>, iou_thresh: f64) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..dets.len() {
            if suppressed[j] || dets[j].class_id != dets[i].class_id {
                continue;
            }
            if dets[i].iou(&dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
        keep.push(dets[i].clone());
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64, class_id: usize) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
            label: String::new(),
        }
    }

    fn acne_labels() -> Vec<String> {
        vec!["acne".to_string()]
    }

    const IDENTITY: Letterbox = Letterbox {
        scale: 1.0,
        pad_x: 0,
        pad_y: 0,
    };

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 -> scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 0.01);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        let y = lb.pad_y as usize + 1;
        let x = lb.pad_x as usize + 1;
        assert_relative_eq!(tensor[[0, 0, y, x]], 1.0, epsilon = 0.01);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 0.01);
    }

    #[test]
    fn test_letterbox_maps_back_to_frame() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        let (x, y) = lb.to_frame(100.0, 140.0);
        assert_relative_eq!(x, 50.0);
        assert_relative_eq!(y, 50.0);
    }

    #[test]
    fn test_layout_detects_transposed_output() {
        let layout = OutputLayout::from_shape(&[1, 5, 8400]).unwrap();
        assert_eq!(
            layout,
            OutputLayout {
                anchors: 8400,
                features: 5,
                transposed: true
            }
        );
    }

    #[test]
    fn test_layout_rejects_unexpected_rank() {
        assert!(OutputLayout::from_shape(&[8400, 5]).is_err());
    }

    #[test]
    fn test_layout_rejects_missing_class_scores() {
        assert!(OutputLayout::from_shape(&[1, 4, 8400]).is_err());
    }

    #[test]
    fn test_decode_transposed_filters_by_confidence() {
        // Two anchors, one class; feature-major layout [1, 5, 2]
        let data = [
            50.0, 10.0, // cx
            50.0, 10.0, // cy
            20.0, 4.0, // w
            10.0, 4.0, // h
            0.9, 0.2, // score
        ];
        let layout = OutputLayout::from_shape(&[1, 5, 2]).unwrap();
        let dets = decode(&data, &layout, 0.5, IDENTITY, &acne_labels());

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "acne");
        assert_relative_eq!(dets[0].x1, 40.0);
        assert_relative_eq!(dets[0].y1, 45.0);
        assert_relative_eq!(dets[0].x2, 60.0);
        assert_relative_eq!(dets[0].y2, 55.0);
        assert_relative_eq!(dets[0].confidence, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_picks_highest_class_score() {
        // Row-major layout [1, 1, 6]: box + two class scores
        let data = [10.0, 10.0, 4.0, 4.0, 0.6, 0.8];
        let layout = OutputLayout {
            anchors: 1,
            features: 6,
            transposed: false,
        };
        let dets = decode(&data, &layout, 0.5, IDENTITY, &acne_labels());
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].label, "class 1");
        assert_relative_eq!(dets[0].confidence, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_drops_non_finite_rows() {
        // Row-major [1, 3, 5]: NaN centre, infinite width, then a valid row
        let data = [
            f32::NAN, 10.0, 4.0, 4.0, 0.9, //
            10.0, 10.0, f32::INFINITY, 4.0, 0.9, //
            10.0, 10.0, 4.0, 4.0, 0.9,
        ];
        let layout = OutputLayout {
            anchors: 3,
            features: 5,
            transposed: false,
        };
        let dets = decode(&data, &layout, 0.5, IDENTITY, &acne_labels());
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].x1, 8.0);
    }

    #[test]
    fn test_decode_drops_nan_scores() {
        let data = [10.0, 10.0, 4.0, 4.0, f32::NAN];
        let layout = OutputLayout {
            anchors: 1,
            features: 5,
            transposed: false,
        };
        assert!(decode(&data, &layout, 0.5, IDENTITY, &acne_labels()).is_empty());
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let dets = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.8, 0),
            raw(5.0, 5.0, 105.0, 105.0, 0.9, 0),
        ];
        let kept = nms(dets, 0.45);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_nms_keeps_overlapping_different_classes() {
        let dets = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.9, 0),
            raw(5.0, 5.0, 105.0, 105.0, 0.8, 1),
        ];
        assert_eq!(nms(dets, 0.45).len(), 2);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let dets = vec![
            raw(0.0, 0.0, 50.0, 50.0, 0.9, 0),
            raw(200.0, 200.0, 250.0, 250.0, 0.8, 0),
        ];
        assert_eq!(nms(dets, 0.45).len(), 2);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(nms(Vec::new(), 0.45).is_empty());
    }

    #[test]
    fn test_label_for_unknown_class() {
        let labels = vec!["acne".to_string()];
        assert_eq!(label_for(&labels, 0), "acne");
        assert_eq!(label_for(&labels, 3), "class 3");
    }
}
