pub mod discovery;
pub mod events;
pub mod orchestrator;

pub use discovery::TargetSources;
pub use events::ScanEvent;
pub use orchestrator::ScanOrchestrator;
