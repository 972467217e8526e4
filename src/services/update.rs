//! `update`：把拓扑文件中的镜像切换到当前应用版本并重新部署
//!
//! 拓扑文件按原文本做字面替换，失败时不回滚，需要人工检查

use std::cmp::Ordering;

use tracing::{info, warn};

use crate::config::env::constants::{APPLICATION_VERSION, COMPOSE_FILE_NAME};
use crate::domain::image::{default_registry, ImageReference};
use crate::domain::topology::TopologyDocument;
use crate::domain::version::Version;
use crate::error::{DeployResult, Outcome};

use super::compose;
use super::context::DeployContext;

/// `update` 参数
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub refresh_images: bool,
    /// 目标仓库；未指定时按应用版本推断
    pub registry: Option<String>,
}

/// 单个服务的镜像变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageChange {
    pub service: &'static str,
    pub current: String,
    pub current_version: Version,
    pub desired: ImageReference,
}

pub async fn update(ctx: &DeployContext, req: &UpdateRequest) -> DeployResult<Outcome> {
    ctx.require_artifacts()?;

    let content = tokio::fs::read_to_string(&ctx.config.compose_file).await?;
    let topology = TopologyDocument::from_yaml(&content)?;
    let registry = req
        .registry
        .as_deref()
        .unwrap_or_else(|| default_registry(APPLICATION_VERSION));

    // 先解析全部版本，任何一个格式错误都在写文件之前中止
    let changes = plan_changes(&topology, registry)?;

    let mut updated = content;
    for change in &changes {
        info!(
            service = change.service,
            from = %change.current,
            to = %change.desired,
            "Updating image"
        );
        updated = replace_image_reference(&updated, &change.current, &change.desired.to_string());
    }
    tokio::fs::write(&ctx.config.compose_file, updated).await?;
    ctx.show(&format!("{} is successfully updated", COMPOSE_FILE_NAME));

    if req.refresh_images {
        compose::pull(ctx).await?;
    }
    compose::undeploy(ctx).await?;
    compose::deploy(ctx).await?;

    Ok(Outcome::done("Update is successfully finished"))
}

/// 计算每个服务的目标镜像：保留镜像名，仓库和 tag 换成目标值
pub fn plan_changes(topology: &TopologyDocument, registry: &str) -> DeployResult<Vec<ImageChange>> {
    let target = Version::from_image_tag(APPLICATION_VERSION)?;
    let images = [
        ("frontend", topology.frontend_image()?),
        ("backend", topology.backend_image()?),
        ("db", topology.db_image()?),
    ];

    images
        .into_iter()
        .map(|(service, image)| {
            let current = ImageReference::parse(image)?;
            let current_version = Version::from_image_tag(&current.tag)?;
            if current_version.cmp(&target) == Ordering::Greater {
                warn!(
                    service,
                    current = %current_version,
                    target = %target,
                    "Deployed image is newer than the target version"
                );
            }
            Ok(ImageChange {
                service,
                current: image.to_string(),
                current_version,
                desired: current.retarget(registry, APPLICATION_VERSION),
            })
        })
        .collect()
}

/// 字面子串替换：文件中其他位置出现的相同文本也会被替换
pub fn replace_image_reference(content: &str, current: &str, desired: &str) -> String {
    content.replace(current, desired)
}
