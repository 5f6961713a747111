/// One detected object in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    /// Box width in whole pixels: `floor(x2 - x1)`, never negative.
    pub fn width_px(&self) -> u32 {
        (self.x2 - self.x1).floor().max(0.0) as u32
    }

    /// Box height in whole pixels: `floor(y2 - y1)`, never negative.
    pub fn height_px(&self) -> u32 {
        (self.y2 - self.y1).floor().max(0.0) as u32
    }

    pub fn iou(&self, other: &Detection) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let area_a = (self.x2 - self.x1) * (self.y2 - self.y1);
        let area_b = (other.x2 - other.x1) * (other.y2 - other.y1);
        inter / (area_a + area_b - inter)
    }

    /// Clamps the box into `[0, width] x [0, height]` and restores
    /// `x2 >= x1`, `y2 >= y1`.
    pub fn clamped(mut self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        self.x1 = self.x1.clamp(0.0, w);
        self.y1 = self.y1.clamp(0.0, h);
        self.x2 = self.x2.min(w).max(self.x1);
        self.y2 = self.y2.min(h).max(self.y1);
        self
    }
}
