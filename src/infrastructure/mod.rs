pub mod jwt;
pub mod log_redact;
pub mod logging;
