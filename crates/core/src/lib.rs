pub mod annotation;
pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod report;
pub mod shared;
