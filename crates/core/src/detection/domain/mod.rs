pub mod acne_detector;
pub mod detection;
