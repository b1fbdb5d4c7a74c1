//! Artifact storage and version management for VIGIL.
//!
//! The artifact store is durable, path-addressable storage for model
//! binaries plus metadata. The version manager owns the ordered version
//! history and the active pointer, and performs atomic promote/rollback
//! with bounded retention.

pub mod error;
pub mod manager;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use manager::{RetentionPolicy, VersionManager};
pub use store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
