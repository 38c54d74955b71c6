pub mod scan_log;

pub use scan_log::{write_json_atomic, ScanLog, SCAN_LOG_FILE, SUMMARY_FILE};
