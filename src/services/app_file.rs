//! `create-app-file`：生成 docker compose 应用文件

use std::path::PathBuf;

use tracing::info;

use crate::config::env::constants::{
    APPLICATION_VERSION, BACKEND_IMAGE, COMPOSE_FILE_NAME, DB_IMAGE, DEFAULT_HOST_PORT,
    FRONTEND_IMAGE,
};
use crate::domain::image::{ImageReference, ImageRegistrySet, ImageVersionOverrides};
use crate::domain::topology::{TopologyDocument, TopologySpec};
use crate::error::{DeployResult, Outcome};

use super::compose;
use super::context::DeployContext;
use super::image_resolver::resolve_override;

/// `create-app-file` 参数
#[derive(Debug, Clone)]
pub struct AppFileRequest {
    pub alias: Option<String>,
    pub host_port: u16,
    /// 用户指定的镜像仓库，优先于按版本推断
    pub registry: Option<String>,
    pub refresh_images: bool,
    pub app_file_path: PathBuf,
    pub overrides: ImageVersionOverrides,
}

impl Default for AppFileRequest {
    fn default() -> Self {
        Self {
            alias: None,
            host_port: DEFAULT_HOST_PORT,
            registry: None,
            refresh_images: false,
            app_file_path: PathBuf::from(COMPOSE_FILE_NAME),
            overrides: ImageVersionOverrides::default(),
        }
    }
}

pub async fn create_app_file(ctx: &DeployContext, req: &AppFileRequest) -> DeployResult<Outcome> {
    let registries = ImageRegistrySet::resolve(
        req.registry.as_deref(),
        &req.overrides,
        APPLICATION_VERSION,
    );
    let path = ctx.config.resolve_path(&req.app_file_path);
    let display = req.app_file_path.display();

    let replace = !path.exists()
        || ctx.prompt.ask_yes_no(
            &format!("{} already exists. Do you want to replace file?", display),
            true,
        );

    let outcome = if replace {
        let overrides = &req.overrides;
        let frontend =
            resolve_image(ctx, FRONTEND_IMAGE, &registries.frontend, overrides.frontend.as_deref())
                .await;
        let backend =
            resolve_image(ctx, BACKEND_IMAGE, &registries.backend, overrides.backend.as_deref())
                .await;
        let db = resolve_image(ctx, DB_IMAGE, &registries.db, overrides.db.as_deref()).await;

        let spec = TopologySpec {
            host_port: req.host_port,
            alias: req.alias.clone(),
            frontend_image: frontend.to_string(),
            backend_image: backend.to_string(),
            db_image: db.to_string(),
        };
        let yaml = TopologyDocument::render(&spec).to_yaml()?;
        tokio::fs::write(&path, yaml).await?;
        info!(path = %path.display(), "Application file written");
        Outcome::done(format!(
            "Application file has been successfully created at {}",
            display
        ))
    } else {
        Outcome::cancelled("Create yaml action has been cancelled by the user")
    };

    if req.refresh_images {
        compose::pull(ctx).await?;
    }
    Ok(outcome)
}

/// 默认引用为 `registry/name:<应用版本>`；给出覆盖 tag 时探测后再决定
async fn resolve_image(
    ctx: &DeployContext,
    name: &str,
    registry: &str,
    override_tag: Option<&str>,
) -> ImageReference {
    let base = ImageReference::new(Some(registry), name, APPLICATION_VERSION);
    match override_tag.map(str::trim).filter(|t| !t.is_empty()) {
        Some(tag) => resolve_override(ctx.checker.as_ref(), name, &base, tag, registry)
            .await
            .into_reference(),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::env::constants::{PRIVATE_REGISTRY, PUBLIC_REGISTRY};
    use crate::infra::command::CommandOutput;
    use crate::infra::testing::FakeRunner;
    use crate::services::context::testing::context;
    use crate::services::prompt::testing::ScriptedPrompt;

    fn read(ctx: &DeployContext) -> TopologyDocument {
        let content = std::fs::read_to_string(&ctx.config.compose_file).unwrap();
        TopologyDocument::from_yaml(&content).unwrap()
    }

    #[tokio::test]
    async fn test_creates_file_with_public_registry() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let ctx = context(dir.path(), runner.clone(), Arc::new(ScriptedPrompt::new()));

        let outcome = create_app_file(&ctx, &AppFileRequest::default()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::done("Application file has been successfully created at docker-compose.yml")
        );
        let doc = read(&ctx);
        assert_eq!(
            doc.db_image().unwrap(),
            format!("{}/apryse/fluent-manager-db:25.0.0.2", PUBLIC_REGISTRY)
        );
        assert_eq!(doc.services.frontend.unwrap().ports, vec!["80:8080"]);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_override_routes_by_version_shape() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let ctx = context(dir.path(), runner.clone(), Arc::new(ScriptedPrompt::new()));
        let req = AppFileRequest {
            alias: Some("qa".to_string()),
            host_port: 8081,
            overrides: ImageVersionOverrides {
                backend: Some("25.1.0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        create_app_file(&ctx, &req).await.unwrap();

        let doc = read(&ctx);
        assert_eq!(
            doc.backend_image().unwrap(),
            format!("{}/apryse/fluent-manager-backend:25.1.0", PRIVATE_REGISTRY)
        );
        assert_eq!(doc.frontend_container_name().unwrap(), "fluent-manager-frontend-qa");
        assert_eq!(
            runner.call_lines(),
            vec![format!(
                "docker manifest inspect {}/apryse/fluent-manager-backend:25.1.0",
                PRIVATE_REGISTRY
            )]
        );
    }

    #[tokio::test]
    async fn test_unknown_override_tag_keeps_default_reference() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        runner.respond(&["docker", "manifest"], CommandOutput::failure(1, "manifest unknown"));
        let ctx = context(dir.path(), runner.clone(), Arc::new(ScriptedPrompt::new()));
        let req = AppFileRequest {
            registry: Some("registry.local".to_string()),
            overrides: ImageVersionOverrides {
                db: Some("25.0.0.9".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        create_app_file(&ctx, &req).await.unwrap();

        assert_eq!(
            read(&ctx).db_image().unwrap(),
            "registry.local/apryse/fluent-manager-db:25.0.0.2"
        );
    }

    #[tokio::test]
    async fn test_existing_file_declined_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let prompt = Arc::new(ScriptedPrompt::new().answer(false));
        let ctx = context(dir.path(), runner.clone(), prompt.clone());
        std::fs::write(&ctx.config.compose_file, "original").unwrap();
        let req = AppFileRequest {
            refresh_images: true,
            ..Default::default()
        };

        let outcome = create_app_file(&ctx, &req).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::cancelled("Create yaml action has been cancelled by the user")
        );
        assert_eq!(
            std::fs::read_to_string(&ctx.config.compose_file).unwrap(),
            "original"
        );
        assert_eq!(
            prompt.asked(),
            vec!["docker-compose.yml already exists. Do you want to replace file?"]
        );
        assert_eq!(runner.call_lines(), vec!["docker compose pull"]);
        assert_eq!(prompt.shown(), vec!["Refreshing images..."]);
    }
}
