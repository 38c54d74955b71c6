use crate::models::TargetType;

/// Progress messages sent from the orchestrator to a display.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Scan accepted, directories ready
    ScanStarted {
        scan_id: String,
        total_targets: usize,
    },
    /// A target is about to be scanned
    TargetStarted {
        target_type: TargetType,
        target_id: String,
        index: usize,
    },
    /// All of a target's tools finished
    TargetCompleted {
        target_type: TargetType,
        target_id: String,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
    /// The target could not be scanned at all
    TargetFailed {
        target_type: TargetType,
        target_id: String,
        error: String,
    },
    ScanCompleted {
        scan_id: String,
        failed_tools: usize,
        duration_ms: u64,
    },
}
