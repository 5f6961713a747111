pub mod ffmpeg_camera_source;
mod ffmpeg_decode;
pub mod image_file_reader;
