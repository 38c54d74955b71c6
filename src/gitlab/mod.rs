pub mod client;

pub use client::{repos_from_records, GitlabClient, ProjectLister, ProjectRecord};
