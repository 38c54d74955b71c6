pub mod audit;
pub mod cli;
pub mod config;
pub mod errors;
pub mod git;
pub mod gitlab;
pub mod models;
pub mod pipeline;
pub mod runner;
pub mod scanners;
pub mod utils;
