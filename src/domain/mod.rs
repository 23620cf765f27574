//! Domain logic - pure versioning rules independent of git and the filesystem

pub mod prerelease;
pub mod transition;
pub mod version;

pub use prerelease::PreRelease;
pub use transition::VersionTransition;
pub use version::{Version, VersionBump};
