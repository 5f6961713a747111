pub mod capture_session;
pub mod final_report_use_case;
pub mod session_error;
pub mod session_logger;
