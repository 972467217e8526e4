//! `create-config-file`：生成或更新 `.env`

use std::path::PathBuf;

use tracing::info;

use crate::config::env::constants::ENV_FILE_NAME;
use crate::config::env_file::{self, WriteMode};
use crate::config::resolver::{resolve, ConfigRequest};
use crate::error::{DeployResult, Outcome};

use super::context::DeployContext;

/// `create-config-file` 参数
#[derive(Debug, Clone)]
pub struct ConfigFileRequest {
    pub config: ConfigRequest,
    pub config_file_path: PathBuf,
}

impl ConfigFileRequest {
    pub fn new(config: ConfigRequest) -> Self {
        Self {
            config,
            config_file_path: PathBuf::from(ENV_FILE_NAME),
        }
    }
}

pub async fn create_config_file(
    ctx: &DeployContext,
    req: &ConfigFileRequest,
) -> DeployResult<Outcome> {
    // 参数错误时不做任何文件操作
    req.config.validate()?;
    let resolved = resolve(&req.config, &ctx.secrets)?;

    let path = ctx.config.resolve_path(&req.config_file_path);
    let display = req.config_file_path.display();

    let Some(existing) = env_file::load(&path)? else {
        env_file::write(&path, &resolved, WriteMode::Overwrite)?;
        info!(path = %path.display(), keys = resolved.len(), "Configuration file written");
        return Ok(Outcome::done(format!(
            "Configuration file ({}) has been successfully created",
            display
        )));
    };

    if env_file::is_current(&existing, &resolved) {
        return Ok(Outcome::done(format!(
            "Configuration file ({}) exists and is up to date",
            display
        )));
    }

    let question = format!(
        "Configuration file ({}) exists but is outdated. Would you like to update configuration file? \
         Warning! Previous configuration will be permanently lost during update",
        display
    );
    if !ctx.prompt.ask_yes_no(&question, true) {
        return Ok(Outcome::cancelled(
            "Configuration file update has been cancelled by the user",
        ));
    }

    env_file::write(&path, &resolved, WriteMode::Overwrite)?;
    info!(path = %path.display(), keys = resolved.len(), "Configuration file rewritten");
    Ok(Outcome::done(format!(
        "Configuration file ({}) is successfully updated",
        display
    )))
}
