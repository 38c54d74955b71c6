pub mod scan_result;
pub mod targets;

pub use scan_result::*;
pub use targets::*;
