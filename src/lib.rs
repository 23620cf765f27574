pub mod checksum;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod hooks;
pub mod orchestration;
pub mod preflight;
pub mod render;
pub mod ui;
pub mod version_store;

pub use error::{ReleaseError, Result};
