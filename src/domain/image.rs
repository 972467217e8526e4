//! 镜像引用与仓库选择

use std::fmt;

use crate::config::env::constants::{PRIVATE_REGISTRY, PUBLIC_REGISTRY};
use crate::domain::version::is_build_number;
use crate::error::{DeployError, DeployResult};

/// `registry/name:tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: Option<String>,
    pub name: String,
    pub tag: String,
}

impl ImageReference {
    /// 组合镜像引用；空白的 registry 视为未指定，镜像名不能为空
    pub fn new(registry: Option<&str>, name: impl Into<String>, tag: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "image name must not be empty");
        let registry = registry
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        Self {
            registry,
            name,
            tag: tag.into(),
        }
    }

    /// 从拓扑文件中的 `image` 字段解析
    ///
    /// 只有包含两个 `/` 时才把第一段视为 registry（`registry/org/name`）
    pub fn parse(reference: &str) -> DeployResult<Self> {
        let (repository, tag) = split_tag(reference);
        let (registry, name) = if repository.matches('/').count() == 2 {
            match repository.split_once('/') {
                Some((registry, name)) => (Some(registry), name),
                None => (None, repository),
            }
        } else {
            (None, repository)
        };
        if name.is_empty() || name.ends_with('/') {
            return Err(DeployError::MalformedImage(reference.to_string()));
        }
        Ok(Self::new(registry, name, tag))
    }

    /// 替换 registry 与 tag，保留镜像名
    pub fn retarget(&self, registry: &str, tag: &str) -> Self {
        Self::new(Some(registry), self.name.clone(), tag)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registry {
            Some(registry) => write!(f, "{}/{}:{}", registry, self.name, self.tag),
            None => write!(f, "{}:{}", self.name, self.tag),
        }
    }
}

/// 拆分 `repository:tag`，冒号必须出现在最后一个 `/` 之后（排除 `host:port/...`）
fn split_tag(reference: &str) -> (&str, &str) {
    let last_slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[last_slash..].rfind(':') {
        Some(pos) => {
            let split = last_slash + pos;
            (&reference[..split], &reference[split + 1..])
        }
        None => (reference, ""),
    }
}

/// 根据版本号形态选择默认仓库：四段构建号走公共仓库，其余走私有仓库
pub fn default_registry(version: &str) -> &'static str {
    if is_build_number(version) {
        PUBLIC_REGISTRY
    } else {
        PRIVATE_REGISTRY
    }
}

/// 三个服务各自的仓库
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRegistrySet {
    pub frontend: String,
    pub backend: String,
    pub db: String,
}

impl ImageRegistrySet {
    pub fn uniform(registry: impl Into<String>) -> Self {
        let registry = registry.into();
        Self {
            frontend: registry.clone(),
            backend: registry.clone(),
            db: registry,
        }
    }

    /// 为每个服务单独计算仓库：用户指定优先，否则按（覆盖后的）版本号推断
    pub fn resolve(
        user_registry: Option<&str>,
        overrides: &ImageVersionOverrides,
        default_version: &str,
    ) -> Self {
        if let Some(registry) = user_registry {
            return Self::uniform(registry);
        }
        let pick = |requested: Option<&str>| registry_for_version(requested, default_version);
        Self {
            frontend: pick(overrides.frontend.as_deref()),
            backend: pick(overrides.backend.as_deref()),
            db: pick(overrides.db.as_deref()),
        }
    }
}

fn registry_for_version(requested: Option<&str>, default_version: &str) -> String {
    let version = requested
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default_version);
    default_registry(version).to_string()
}

/// 按服务覆盖镜像 tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageVersionOverrides {
    pub frontend: Option<String>,
    pub backend: Option<String>,
    pub db: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_registry() {
        let with = ImageReference::new(Some("public.ecr.aws"), "apryse/fluent-manager-db", "25.0.0.2");
        assert_eq!(with.to_string(), "public.ecr.aws/apryse/fluent-manager-db:25.0.0.2");

        let without = ImageReference::new(Some("  "), "apryse/fluent-manager-db", "1.0.0");
        assert_eq!(without.to_string(), "apryse/fluent-manager-db:1.0.0");
    }

    #[test]
    fn test_default_registry() {
        assert_eq!(default_registry("25.0.0.2"), PUBLIC_REGISTRY);
        assert_eq!(default_registry("1.2.3"), PRIVATE_REGISTRY);
        assert_eq!(default_registry("1.2.3-SNAPSHOT"), PRIVATE_REGISTRY);
    }

    #[test]
    fn test_parse_with_registry() {
        let reference =
            ImageReference::parse("012161395203.dkr.ecr.us-east-1.amazonaws.com/apryse/fluent-manager-backend:1.2.3")
                .unwrap();
        assert_eq!(
            reference.registry.as_deref(),
            Some("012161395203.dkr.ecr.us-east-1.amazonaws.com")
        );
        assert_eq!(reference.name, "apryse/fluent-manager-backend");
        assert_eq!(reference.tag, "1.2.3");
    }

    #[test]
    fn test_parse_without_registry() {
        let reference = ImageReference::parse("apryse/fluent-manager-db:25.0.0.1").unwrap();
        assert_eq!(reference.registry, None);
        assert_eq!(reference.name, "apryse/fluent-manager-db");
        assert_eq!(reference.tag, "25.0.0.1");
    }

    #[test]
    fn test_parse_registry_with_port() {
        let reference =
            ImageReference::parse("localhost:5000/apryse/fluent-manager-db:2.0.0").unwrap();
        assert_eq!(reference.registry.as_deref(), Some("localhost:5000"));
        assert_eq!(reference.tag, "2.0.0");
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        for input in ["", ":25.0.0.2", "registry.local/apryse/:1.0.0"] {
            assert!(
                matches!(ImageReference::parse(input), Err(DeployError::MalformedImage(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_retarget() {
        let reference = ImageReference::parse("apryse/fluent-manager-db:25.0.0.1").unwrap();
        assert_eq!(
            reference.retarget(PUBLIC_REGISTRY, "25.0.0.2").to_string(),
            "public.ecr.aws/apryse/fluent-manager-db:25.0.0.2"
        );
    }

    #[test]
    fn test_registry_set_follows_override_versions() {
        let overrides = ImageVersionOverrides {
            frontend: Some("1.2.3".to_string()),
            backend: Some("".to_string()),
            db: None,
        };
        let set = ImageRegistrySet::resolve(None, &overrides, "25.0.0.2");
        assert_eq!(set.frontend, PRIVATE_REGISTRY);
        assert_eq!(set.backend, PUBLIC_REGISTRY);
        assert_eq!(set.db, PUBLIC_REGISTRY);
    }

    #[test]
    fn test_registry_set_user_registry_wins() {
        let overrides = ImageVersionOverrides {
            frontend: Some("1.2.3".to_string()),
            ..Default::default()
        };
        let set = ImageRegistrySet::resolve(Some("my.registry"), &overrides, "25.0.0.2");
        assert_eq!(set, ImageRegistrySet::uniform("my.registry"));
    }
}
