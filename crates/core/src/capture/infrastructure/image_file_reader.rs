use std::path::Path;

use crate::capture::domain::frame_source::CaptureError;
use crate::shared::frame::Frame;

use super::ffmpeg_decode::RgbDecoder;

/// Decodes one still image to an RGB frame.
///
/// Uses ffmpeg rather than the pure-Rust decoders, which are noticeably
/// slower on large camera JPEGs.
pub fn read_image(path: &Path) -> Result<Frame, CaptureError> {
    let open_err = |reason: String| CaptureError::Open {
        path: path.to_path_buf(),
        reason,
    };

    ffmpeg_next::init().map_err(|e| open_err(e.to_string()))?;
    let mut ictx = ffmpeg_next::format::input(path).map_err(|e| open_err(e.to_string()))?;

    let stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or_else(|| open_err("no image data found".to_string()))?;
    let video_stream_index = stream.index();
    let mut decoder = RgbDecoder::for_stream(&stream).map_err(|e| open_err(e.to_string()))?;

    for (stream, packet) in ictx.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if let Some(frame) = decoder.receive(0)? {
            return Ok(frame);
        }
    }

    // Some formats buffer the single frame until flushed
    decoder.send_eof();
    decoder
        .receive(0)?
        .ok_or_else(|| CaptureError::Decode(format!("{} produced no frame", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_png(dir: &Path, width: u32, height: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join("cheek.png");
        image::RgbImage::from_pixel(width, height, image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_reads_dimensions_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 64, 48, [200, 100, 50]);

        let frame = read_image(&path).unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[200, 100, 50]);
        assert_eq!(frame.index(), 0);
    }

    #[test]
    fn test_missing_file_errors() {
        let err = read_image(Path::new("/nonexistent/breakout.jpg")).unwrap_err();
        assert!(matches!(err, CaptureError::Open { .. }));
    }

    #[test]
    fn test_non_image_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(read_image(&path).is_err());
    }
}
