//! 服务层模块
//!
//! 每个子命令对应一个工作流，依赖通过 [`DeployContext`] 显式传入

pub mod app_file;
pub mod backup;
pub mod compose;
pub mod config_file;
pub mod context;
pub mod image_resolver;
pub mod prompt;
pub mod update;

pub use context::DeployContext;
pub use image_resolver::{DockerManifestChecker, ImageTagChecker, OverrideOutcome};
pub use prompt::{Prompt, StdinPrompt};
