pub mod acne_report;
pub mod image_writer;
pub mod report_writer;
