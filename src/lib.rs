//! Fluent Deploy - Fluent Manager 部署工具
//!
//! 通过 docker compose 管理三服务应用（frontend / backend / db）的
//! 应用文件与配置文件生成、生命周期、备份恢复和升级

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;

pub use error::{DeployError, DeployResult, Outcome};
