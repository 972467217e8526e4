//! 工具配置加载
//!
//! 启动时构建一次，之后通过 `DeployContext` 显式传递

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use self::constants::{
    BACKUP_DIR_NAME, COMPOSE_FILE_NAME, DEFAULT_POLL_INTERVAL_MS, ENV_FILE_NAME,
    RESTORE_SCRIPT_NAME,
};

/// 工具配置
#[derive(Clone, Debug)]
pub struct ToolConfig {
    /// 工作目录（绝对路径），备份目录和挂载路径都相对于它
    pub work_dir: PathBuf,
    /// 拓扑文件路径
    pub compose_file: PathBuf,
    /// 环境配置文件路径
    pub env_file: PathBuf,
    /// docker 可执行文件
    pub docker_bin: String,
    /// 等待辅助容器结束的轮询间隔
    pub poll_interval: Duration,
    /// 关闭交互，所有确认都取默认答案
    pub disable_interactivity: bool,
}

impl ToolConfig {
    /// 以给定目录为工作目录，其余取默认值
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            compose_file: work_dir.join(COMPOSE_FILE_NAME),
            env_file: work_dir.join(ENV_FILE_NAME),
            work_dir,
            docker_bin: "docker".to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            disable_interactivity: false,
        }
    }

    /// 从环境变量加载配置
    pub fn from_env() -> std::io::Result<Self> {
        let work_dir = match env::var("FLUENT_DEPLOY_WORK_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => env::current_dir()?,
        };
        let work_dir = std::path::absolute(&work_dir)?;

        let mut config = Self::new(work_dir);

        if let Ok(bin) = env::var("FLUENT_DEPLOY_DOCKER_BIN") {
            if !bin.is_empty() {
                config.docker_bin = bin;
            }
        }

        if let Ok(raw) = env::var("FLUENT_DEPLOY_POLL_INTERVAL_MS") {
            match raw.parse::<u64>() {
                Ok(ms) => config.poll_interval = Duration::from_millis(ms),
                Err(_) => warn!(value = %raw, "Ignoring invalid FLUENT_DEPLOY_POLL_INTERVAL_MS"),
            }
        }

        Ok(config)
    }

    /// 相对路径按工作目录解析
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.work_dir.join(BACKUP_DIR_NAME)
    }

    pub fn restore_script(&self) -> PathBuf {
        self.work_dir.join(RESTORE_SCRIPT_NAME)
    }
}

/// 常量
pub mod constants {
    /// 当前发布的应用版本，也是各镜像的默认 tag
    pub const APPLICATION_VERSION: &str = "25.0.0.2";

    pub const FRONTEND_IMAGE: &str = "apryse/fluent-manager-frontend";
    pub const BACKEND_IMAGE: &str = "apryse/fluent-manager-backend";
    pub const DB_IMAGE: &str = "apryse/fluent-manager-db";

    /// 公开发布使用的仓库
    pub const PUBLIC_REGISTRY: &str = "public.ecr.aws";
    /// 内部构建使用的私有仓库
    pub const PRIVATE_REGISTRY: &str = "012161395203.dkr.ecr.us-east-1.amazonaws.com";

    pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";
    pub const ENV_FILE_NAME: &str = ".env";
    pub const BACKUP_DIR_NAME: &str = "backup_db";
    pub const RESTORE_SCRIPT_NAME: &str = "remove_volumes.sh";

    /// docker compose 写在容器上的项目名标签
    pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
    pub const DEFAULT_HOST_PORT: u16 = 80;

    pub const MIN_ADMIN_PASSWORD_LEN: usize = 12;
    pub const MAX_ADMIN_PASSWORD_LEN: usize = 64;
    pub const DB_PASSWORD_LEN: usize = 12;
}
