use ndarray::ArrayView3;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// Capture sources convert to RGB at the I/O boundary; display surfaces
/// ask for RGBA through [`Frame::to_rgba`].
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// RGBA copy of the pixel data, alpha fully opaque.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(self.channels as usize) {
            rgba.extend_from_slice(&px[..3]);
            rgba.push(255);
        }
        rgba
    }

    /// Downscales to fit inside `max_width` x `max_height`, keeping the
    /// aspect ratio. Frames that already fit are returned unchanged.
    pub fn fit_within(&self, max_width: u32, max_height: u32) -> Frame {
        if self.width <= max_width && self.height <= max_height {
            return self.clone();
        }
        let scale = (max_width as f64 / self.width as f64).min(max_height as f64 / self.height as f64);
        let new_w = ((self.width as f64 * scale).round() as u32).max(1);
        let new_h = ((self.height as f64 * scale).round() as u32).max(1);

        let Some(img) = image::RgbImage::from_raw(self.width, self.height, self.data.clone()) else {
            return self.clone();
        };
        let resized = image::imageops::resize(&img, new_w, new_h, image::imageops::FilterType::Triangle);
        Frame::new(resized.into_raw(), new_w, new_h, 3, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = Frame::new(vec![100u8; 12], 2, 2, 3, 0);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // row=1, col=0 is red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_to_rgba_appends_opaque_alpha() {
        let frame = Frame::new(vec![10, 20, 30, 40, 50, 60], 2, 1, 3, 0);
        assert_eq!(frame.to_rgba(), vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }

    #[test]
    fn test_fit_within_keeps_small_frames() {
        let frame = Frame::new(vec![7u8; 4 * 3 * 3], 4, 3, 3, 2);
        let fitted = frame.fit_within(640, 480);
        assert_eq!((fitted.width(), fitted.height()), (4, 3));
        assert_eq!(fitted.index(), 2);
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        let frame = Frame::new(vec![7u8; 200 * 100 * 3], 200, 100, 3, 9);
        let fitted = frame.fit_within(100, 100);
        assert_eq!(fitted.width(), 100);
        assert_eq!(fitted.height(), 50);
        assert_eq!(fitted.data().len(), 100 * 50 * 3);
        assert_eq!(fitted.index(), 9);
    }
}
