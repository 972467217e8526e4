//! 配置模块
//!
//! 工具自身的运行配置，以及 `.env` 的生成与比对

pub mod env;
pub mod env_file;
pub mod resolver;
pub mod secrets;

pub use env::ToolConfig;
pub use resolver::{ConfigRequest, MailingOptions, VaultOptions};
pub use secrets::GeneratedSecrets;
