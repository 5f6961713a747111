use ab_glyph::{FontRef, PxScale};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Per-class box colors, cycled by class id.
const PALETTE: &[[u8; 3]] = &[
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
];

/// Fraction of the mean frame side used as line width.
const LINE_WIDTH_RATIO: f64 = 0.003;
const MIN_LINE_WIDTH: u32 = 2;
const MIN_FONT_PX: f32 = 12.0;

static LABEL_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans-Bold.ttf");

/// Draws each detection as a hollow rectangle with a `label confidence`
/// tag above it, e.g. `acne 0.87`.
pub struct BoxAnnotator {
    line_width: Option<u32>,
}

impl BoxAnnotator {
    pub fn new() -> Self {
        Self { line_width: None }
    }

    /// Fixed line width instead of one scaled to the frame.
    pub fn with_line_width(line_width: u32) -> Self {
        Self {
            line_width: Some(line_width.max(1)),
        }
    }

    fn line_width_for(&self, width: u32, height: u32) -> u32 {
        self.line_width.unwrap_or_else(|| {
            let lw = ((width + height) as f64 / 2.0 * LINE_WIDTH_RATIO).round() as u32;
            lw.max(MIN_LINE_WIDTH)
        })
    }
}

fn label_text(det: &Detection) -> String {
    format!("{} {:.2}", det.label, det.confidence)
}

/// Black on light class colors, white otherwise.
fn text_color(background: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = background.map(f64::from);
    if 0.299 * r + 0.587 * g + 0.114 * b > 160.0 {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn class_color(class_id: usize) -> [u8; 3] {
    PALETTE[class_id % PALETTE.len()]
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if detections.is_empty() {
            return Ok(());
        }
        if frame.channels() != 3 {
            return Err(format!("expected an RGB frame, got {} channels", frame.channels()).into());
        }

        let (width, height) = (frame.width(), frame.height());
        let lw = self.line_width_for(width, height);
        let font = FontRef::try_from_slice(LABEL_FONT)?;
        let scale = PxScale::from((lw as f32 * 6.0).max(MIN_FONT_PX));
        let mut img = image::RgbImage::from_raw(width, height, frame.data().to_vec())
            .ok_or("frame data does not match its dimensions")?;

        for det in detections {
            let color = image::Rgb(class_color(det.class_id));
            let x = det.x1.floor() as i32;
            let y = det.y1.floor() as i32;
            let w = det.width_px();
            let h = det.height_px();

            for inset in 0..lw {
                let (iw, ih) = (w.saturating_sub(2 * inset), h.saturating_sub(2 * inset));
                if iw == 0 || ih == 0 {
                    break;
                }
                let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(iw, ih);
                draw_hollow_rect_mut(&mut img, rect, color);
            }

            // Tag sits above the box, or inside its top edge when clipped
            let text = label_text(det);
            let (text_w, text_h) = text_size(scale, &font, &text);
            let (tab_w, tab_h) = (text_w + 2 * lw, text_h + 2 * lw);
            let tab_y = if y >= tab_h as i32 { y - tab_h as i32 } else { y };
            draw_filled_rect_mut(&mut img, Rect::at(x, tab_y).of_size(tab_w, tab_h), color);
            draw_text_mut(
                &mut img,
                image::Rgb(text_color(color.0)),
                x + lw as i32,
                tab_y + lw as i32,
                scale,
                &font,
                &text,
            );
        }

        frame.data_mut().copy_from_slice(img.as_raw());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn detection(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id: 0,
            label: "acne".to_string(),
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    #[test]
    fn test_no_detections_leaves_frame_untouched() {
        let mut f = frame(20, 20);
        BoxAnnotator::new().annotate(&mut f, &[]).unwrap();
        assert!(f.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_draws_box_outline_not_interior() {
        let mut f = frame(100, 100);
        let annotator = BoxAnnotator::with_line_width(1);
        annotator
            .annotate(&mut f, &[detection(20.0, 40.0, 60.0, 80.0, 0.5)])
            .unwrap();

        let red = class_color(0);
        assert_eq!(pixel(&f, 20, 60), red); // left edge
        assert_eq!(pixel(&f, 59, 60), red); // right edge
        assert_eq!(pixel(&f, 40, 79), red); // bottom edge
        assert_eq!(pixel(&f, 40, 60), [0, 0, 0]); // interior
    }

    #[test]
    fn test_label_tag_drawn_above_box() {
        let mut f = frame(200, 100);
        let annotator = BoxAnnotator::with_line_width(1);
        annotator
            .annotate(&mut f, &[detection(20.0, 40.0, 60.0, 80.0, 0.87)])
            .unwrap();

        let red = class_color(0);
        assert_eq!(pixel(&f, 20, 39), red); // tag background meets the box
        assert_eq!(pixel(&f, 20, 20), [0, 0, 0]); // nothing above the tag

        // White glyph pixels inside the tag
        let glyphs = (24..40)
            .flat_map(|y| (20..120).map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(&f, x, y)[1] > 150)
            .count();
        assert!(glyphs > 0);
    }

    #[test]
    fn test_label_tag_moves_inside_box_at_top_edge() {
        let mut f = frame(200, 100);
        BoxAnnotator::with_line_width(1)
            .annotate(&mut f, &[detection(10.0, 0.0, 150.0, 90.0, 0.5)])
            .unwrap();

        // Tag background fills the otherwise black interior below the top edge
        let red = class_color(0);
        let tagged = (1..8)
            .flat_map(|y| (11..60).map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(&f, x, y) == red)
            .count();
        assert!(tagged > 50);
    }

    #[test]
    fn test_label_text_format() {
        assert_eq!(label_text(&detection(0.0, 0.0, 1.0, 1.0, 0.8749)), "acne 0.87");
    }

    #[test]
    fn test_text_color_contrasts_with_tag() {
        assert_eq!(text_color([255, 56, 56]), [255, 255, 255]);
        assert_eq!(text_color([207, 210, 49]), [0, 0, 0]);
    }

    #[test]
    fn test_box_at_frame_edge_does_not_panic() {
        let mut f = frame(50, 50);
        BoxAnnotator::new()
            .annotate(&mut f, &[detection(0.0, 0.0, 50.0, 50.0, 1.0)])
            .unwrap();
        assert_eq!(f.data().len(), 50 * 50 * 3);
    }

    #[test]
    fn test_line_width_scales_with_frame() {
        let annotator = BoxAnnotator::new();
        assert_eq!(annotator.line_width_for(100, 100), MIN_LINE_WIDTH);
        assert_eq!(annotator.line_width_for(1920, 1080), 5);
    }

    #[test]
    fn test_class_color_cycles() {
        assert_eq!(class_color(0), class_color(PALETTE.len()));
        assert_ne!(class_color(0), class_color(1));
    }
}
