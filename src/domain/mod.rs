//! 领域模型模块
//!
//! 纯数据结构，不做 I/O

pub mod backup;
pub mod configuration;
pub mod image;
pub mod topology;
pub mod version;

// Re-exports for convenience
pub use backup::{BackupArtifact, BackupKind};
pub use configuration::Configuration;
pub use image::{default_registry, ImageReference, ImageRegistrySet, ImageVersionOverrides};
pub use topology::{TopologyDocument, TopologySpec};
pub use version::Version;
