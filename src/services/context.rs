//! 工作流上下文
//!
//! 启动时构建一次，包含配置、外部进程执行器、交互接口和本进程的生成密钥

use std::path::Path;
use std::sync::Arc;

use crate::config::env::ToolConfig;
use crate::config::secrets::GeneratedSecrets;
use crate::domain::topology::TopologyDocument;
use crate::error::{DeployError, DeployResult};
use crate::infra::command::{CommandOutput, OutputMode, ProcessRunner, TokioProcessRunner};

use super::image_resolver::{DockerManifestChecker, ImageTagChecker};
use super::prompt::{Prompt, StdinPrompt};

/// 工作流执行上下文
#[derive(Clone)]
pub struct DeployContext {
    pub config: ToolConfig,
    pub runner: Arc<dyn ProcessRunner>,
    pub prompt: Arc<dyn Prompt>,
    pub checker: Arc<dyn ImageTagChecker>,
    pub secrets: GeneratedSecrets,
}

impl DeployContext {
    /// 使用真实的进程执行器与标准输入交互
    pub fn new(config: ToolConfig) -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner::new(&config.work_dir));
        let checker = Arc::new(DockerManifestChecker::new(
            runner.clone(),
            config.docker_bin.clone(),
        ));
        let prompt = Arc::new(StdinPrompt::new(config.disable_interactivity));
        Self {
            config,
            runner,
            prompt,
            checker,
            secrets: GeneratedSecrets::generate(),
        }
    }

    /// 执行 docker 命令，非零退出码视为失败
    pub async fn docker(&self, args: &[&str], mode: OutputMode) -> DeployResult<CommandOutput> {
        self.runner
            .run_or_fail(&self.config.docker_bin, args, mode)
            .await
    }

    pub fn show(&self, line: &str) {
        self.prompt.show(line);
    }

    pub fn require_compose_file(&self) -> DeployResult<()> {
        require_file(&self.config.compose_file)
    }

    pub fn require_env_file(&self) -> DeployResult<()> {
        require_file(&self.config.env_file)
    }

    /// 拓扑文件和配置文件都必须存在
    pub fn require_artifacts(&self) -> DeployResult<()> {
        self.require_compose_file()?;
        self.require_env_file()
    }

    /// 读取并解析当前拓扑文件
    pub async fn read_topology(&self) -> DeployResult<TopologyDocument> {
        self.require_compose_file()?;
        let content = tokio::fs::read_to_string(&self.config.compose_file).await?;
        TopologyDocument::from_yaml(&content)
    }
}

fn require_file(path: &Path) -> DeployResult<()> {
    if path.is_file() {
        return Ok(());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Err(DeployError::missing_artifact(name))
}
