pub mod image_file_writer;
pub mod text_file_report_writer;
