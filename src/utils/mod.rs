pub mod binaries;
pub mod paths;
pub mod truncation;

pub use binaries::{StaticLocator, SystemPath, ToolLocator};
pub use paths::{sanitize_path_component, validate_output_path};
pub use truncation::truncate_error;
