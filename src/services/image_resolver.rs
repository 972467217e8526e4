//! 镜像 tag 覆盖解析
//!
//! 覆盖 tag 是尽力而为：探测失败时回退到默认引用，并保留失败原因

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::image::ImageReference;
use crate::error::{DeployError, DeployResult};
use crate::infra::command::{OutputMode, ProcessRunner};

/// 镜像 tag 是否存在的探测接口
#[async_trait]
pub trait ImageTagChecker: Send + Sync {
    async fn probe(&self, reference: &ImageReference) -> DeployResult<()>;
}

/// 通过 `docker manifest inspect` 查询仓库
pub struct DockerManifestChecker {
    runner: Arc<dyn ProcessRunner>,
    docker_bin: String,
}

impl DockerManifestChecker {
    pub fn new(runner: Arc<dyn ProcessRunner>, docker_bin: impl Into<String>) -> Self {
        Self {
            runner,
            docker_bin: docker_bin.into(),
        }
    }
}

#[async_trait]
impl ImageTagChecker for DockerManifestChecker {
    async fn probe(&self, reference: &ImageReference) -> DeployResult<()> {
        let reference = reference.to_string();
        self.runner
            .run_or_fail(
                &self.docker_bin,
                &["manifest", "inspect", &reference],
                OutputMode::Capture,
            )
            .await
            .map(|_| ())
    }
}

/// 覆盖解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// 候选引用存在
    Resolved(ImageReference),
    /// 探测失败，使用原引用
    Fallback {
        reference: ImageReference,
        reason: String,
    },
}

impl OverrideOutcome {
    pub fn into_reference(self) -> ImageReference {
        match self {
            OverrideOutcome::Resolved(reference) => reference,
            OverrideOutcome::Fallback { reference, .. } => reference,
        }
    }
}

/// 用 `registry/base_name:tag` 作为候选，探测成功则采用，否则回退到 `base`
pub async fn resolve_override(
    checker: &dyn ImageTagChecker,
    base_name: &str,
    base: &ImageReference,
    tag: &str,
    registry: &str,
) -> OverrideOutcome {
    let candidate = ImageReference::new(Some(registry), base_name, tag);

    match checker.probe(&candidate).await {
        Ok(()) => {
            info!(image = %candidate, "Using overridden image");
            OverrideOutcome::Resolved(candidate)
        }
        Err(err) => {
            let reason = failure_reason(&err);
            warn!(
                candidate = %candidate,
                fallback = %base,
                reason = %reason,
                "Could not find image, falling back to default reference"
            );
            OverrideOutcome::Fallback {
                reference: base.clone(),
                reason,
            }
        }
    }
}

fn failure_reason(err: &DeployError) -> String {
    match err {
        DeployError::ExternalCommand { stderr, .. } if !stderr.trim().is_empty() => {
            stderr.trim().to_string()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::command::CommandOutput;
    use crate::infra::testing::FakeRunner;

    const DB: &str = "apryse/fluent-manager-db";

    fn checker(runner: &Arc<FakeRunner>) -> DockerManifestChecker {
        DockerManifestChecker::new(runner.clone(), "docker")
    }

    #[tokio::test]
    async fn test_missing_tag_keeps_original_reference() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond(
            &["docker", "manifest", "inspect"],
            CommandOutput::failure(1, "no such manifest: 25.0.0.2\n"),
        );
        let base = ImageReference::parse("apryse/fluent-manager-db:25.0.0.1").unwrap();

        let outcome =
            resolve_override(&checker(&runner), DB, &base, "25.0.0.2", "public.ecr.aws").await;

        assert_eq!(
            outcome,
            OverrideOutcome::Fallback {
                reference: base.clone(),
                reason: "no such manifest: 25.0.0.2".to_string(),
            }
        );
        assert_eq!(
            outcome.into_reference().to_string(),
            "apryse/fluent-manager-db:25.0.0.1"
        );
        assert_eq!(
            runner.call_lines(),
            vec!["docker manifest inspect public.ecr.aws/apryse/fluent-manager-db:25.0.0.2"]
        );
    }

    #[tokio::test]
    async fn test_existing_tag_uses_candidate() {
        let runner = Arc::new(FakeRunner::new());
        let base = ImageReference::new(Some("public.ecr.aws"), DB, "25.0.0.2");

        let outcome = resolve_override(&checker(&runner), DB, &base, "25.1.0", "registry.local")
            .await
            .into_reference();

        assert_eq!(outcome.to_string(), "registry.local/apryse/fluent-manager-db:25.1.0");
    }

    #[tokio::test]
    async fn test_failure_without_stderr_uses_error_message() {
        let runner = Arc::new(FakeRunner::new());
        runner.respond(&["docker", "manifest"], CommandOutput::failure(3, ""));
        let base = ImageReference::new(None, DB, "25.0.0.2");

        match resolve_override(&checker(&runner), DB, &base, "9.9.9", "r").await {
            OverrideOutcome::Fallback { reason, .. } => {
                assert!(reason.contains("Unexpected exit code: 3"), "{reason}");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
