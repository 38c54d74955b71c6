pub mod metadata;

pub use metadata::{repo_metadata, RepoMetadata};
