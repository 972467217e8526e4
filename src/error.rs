//! 统一错误处理
//!
//! 所有工作流返回 `DeployResult<T>`；用户取消不是错误，见 [`Outcome`]

use thiserror::Error;

use crate::infra::command::CommandError;

/// 部署工具错误类型
#[derive(Debug, Error)]
pub enum DeployError {
    /// 参数校验失败（如密码长度），不产生任何副作用
    #[error("{0}")]
    Validation(String),

    /// 参数组合不完整（如启用邮件但缺少 SMTP 参数）
    #[error("{0}")]
    Usage(String),

    /// 拓扑文件或配置文件不存在
    #[error("{0} file doesn't exist")]
    MissingArtifact(String),

    /// 外部命令返回非零退出码
    #[error("Unexpected exit code: {exit_code} while executing: {command}")]
    ExternalCommand {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// 外部命令无法启动或等待失败
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: CommandError,
    },

    /// 后台辅助容器启动后没有输出容器 ID
    #[error("No container id returned by: {0}")]
    MissingContainerId(String),

    #[error("Malformed version: {0}")]
    MalformedVersion(String),

    /// 镜像引用缺少镜像名
    #[error("Malformed image reference: {0:?}")]
    MalformedImage(String),

    /// 拓扑文件缺少必需字段
    #[error("Application file is missing `{0}`")]
    Topology(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn missing_artifact(file: impl Into<String>) -> Self {
        Self::MissingArtifact(file.into())
    }

    pub fn topology(field: impl Into<String>) -> Self {
        Self::Topology(field.into())
    }

    /// 进程退出码：参数错误为 2，其余为 1
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::Validation(_) | DeployError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// 便捷类型别名
pub type DeployResult<T> = Result<T, DeployError>;

/// 工作流结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 正常完成，附带给操作者的消息
    Done(String),
    /// 用户拒绝或无可选文件，附带取消消息
    Cancelled(String),
}

impl Outcome {
    pub fn done(message: impl Into<String>) -> Self {
        Self::Done(message.into())
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Done(m) | Outcome::Cancelled(m) => m,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }
}
