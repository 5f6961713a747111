use crate::capture::domain::frame_source::{CaptureError, FrameSource, SourceInfo};
use crate::shared::constants::DEFAULT_CAMERA_INDEX;
use crate::shared::frame::Frame;

use super::ffmpeg_decode::RgbDecoder;

/// Which camera to open and how.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub index: u32,
    /// Overrides the device name derived from `index` (required for
    /// DirectShow, which addresses cameras by name).
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_CAMERA_INDEX,
            device: None,
            width: None,
            height: None,
            fps: None,
        }
    }
}

impl CameraConfig {
    /// libavdevice demuxer for the platform camera API.
    pub fn input_format() -> &'static str {
        if cfg!(target_os = "macos") {
            "avfoundation"
        } else if cfg!(target_os = "windows") {
            "dshow"
        } else {
            "v4l2"
        }
    }

    /// Device URL as understood by [`CameraConfig::input_format`].
    pub fn device_url(&self) -> String {
        if let Some(device) = &self.device {
            return device.clone();
        }
        if cfg!(target_os = "macos") {
            format!("{}:none", self.index)
        } else if cfg!(target_os = "windows") {
            format!("video={}", self.index)
        } else {
            format!("/dev/video{}", self.index)
        }
    }

    fn demuxer_options(&self) -> Vec<(&'static str, String)> {
        let mut opts = Vec::new();
        if let (Some(w), Some(h)) = (self.width, self.height) {
            opts.push(("video_size", format!("{w}x{h}")));
        }
        if let Some(fps) = self.fps {
            opts.push(("framerate", fps.to_string()));
        }
        opts
    }
}

/// Webcam capture through libavdevice, decoded to RGB24 frames.
pub struct FfmpegCameraSource {
    config: CameraConfig,
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<RgbDecoder>,
    video_stream_index: usize,
    frame_index: usize,
}

// Safety: the source is opened on the controlling thread and then moved to
// the capture worker; it is never used from two threads at once.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            input_ctx: None,
            decoder: None,
            video_stream_index: 0,
            frame_index: 0,
        }
    }
}

impl FrameSource for FfmpegCameraSource {
    fn open(&mut self) -> Result<SourceInfo, CaptureError> {
        ffmpeg_next::init().map_err(|e| CaptureError::Unavailable(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let format_name = CameraConfig::input_format();
        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == format_name)
            .ok_or_else(|| {
                CaptureError::Unavailable(format!("ffmpeg was built without {format_name} support"))
            })?;

        let url = self.config.device_url();
        let mut options = ffmpeg_next::Dictionary::new();
        for (key, value) in self.config.demuxer_options() {
            options.set(key, &value);
        }

        let ictx = match ffmpeg_next::format::open_with(&url, &format, options) {
            Ok(ffmpeg_next::format::context::Context::Input(ictx)) => ictx,
            Ok(_) => return Err(CaptureError::Unavailable(format!("{url} is not an input device"))),
            Err(e) => return Err(CaptureError::Unavailable(format!("cannot open {url}: {e}"))),
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::Unavailable(format!("{url} has no video stream")))?;
        let video_stream_index = stream.index();
        let rate = stream.avg_frame_rate();
        let fps = (rate.denominator() != 0)
            .then(|| rate.numerator() as f64 / rate.denominator() as f64);
        let decoder = RgbDecoder::for_stream(&stream)
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;

        let info = SourceInfo {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            description: format!("{format_name}:{url}"),
        };
        log::info!(
            "Opened camera {} ({}x{})",
            info.description,
            info.width,
            info.height
        );

        self.video_stream_index = video_stream_index;
        self.decoder = Some(decoder);
        self.input_ctx = Some(ictx);
        self.frame_index = 0;
        Ok(info)
    }

    fn read(&mut self) -> Result<Option<Frame>, CaptureError> {
        let (Some(ictx), Some(decoder)) = (self.input_ctx.as_mut(), self.decoder.as_mut()) else {
            return Err(CaptureError::NotOpen);
        };

        loop {
            if let Some(frame) = decoder.receive(self.frame_index)? {
                self.frame_index += 1;
                return Ok(Some(frame));
            }

            let Some((stream, packet)) = ictx.packets().next() else {
                decoder.send_eof();
                let frame = decoder.receive(self.frame_index)?;
                if frame.is_some() {
                    self.frame_index += 1;
                }
                return Ok(frame);
            };

            if stream.index() != self.video_stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
        }
    }

    fn close(&mut self) {
        if self.input_ctx.take().is_some() {
            log::info!("Released camera {}", self.config.device_url());
        }
        self.decoder = None;
    }
}
