use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::frame_source::CaptureError;
use crate::shared::frame::Frame;

/// Video decoder paired with an RGB24 converter for one input stream.
pub(crate) struct RgbDecoder {
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    width: u32,
    height: u32,
}

impl RgbDecoder {
    pub(crate) fn for_stream(
        stream: &ffmpeg_next::format::stream::Stream,
    ) -> Result<Self, ffmpeg_next::Error> {
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;
        Ok(Self {
            decoder,
            scaler,
            width,
            height,
        })
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn send_packet(&mut self, packet: &ffmpeg_next::Packet) -> Result<(), CaptureError> {
        self.decoder
            .send_packet(packet)
            .map_err(|e| CaptureError::Decode(e.to_string()))
    }

    pub(crate) fn send_eof(&mut self) {
        let _ = self.decoder.send_eof();
    }

    /// Pulls one decoded frame if the decoder has one ready.
    pub(crate) fn receive(&mut self, index: usize) -> Result<Option<Frame>, CaptureError> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| CaptureError::Decode(e.to_string()))?;
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, 3, index)))
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg rows may carry padding (stride > width*3); it is stripped here.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
