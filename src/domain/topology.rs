//! Docker Compose application file (topology)
//!
//! The same structs are used to render a new file and to read the
//! fields the lifecycle workflows need back out of an existing one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::env::constants::ENV_FILE_NAME;
use crate::error::{DeployError, DeployResult};

const DB_DATA_DIR: &str = "/var/lib/postgresql/data";
const FRONTEND_CONTAINER_PORT: u16 = 8080;

/// Top-level compose document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub services: Services,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, NamedVolume>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Networks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Services {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<ServiceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<ServiceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<ServiceSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingPolicy>,
}

/// Rotating json-file logs, 50MB x 3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingPolicy {
    pub driver: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Default for LoggingPolicy {
    fn default() -> Self {
        let options = [("max-size", "50m"), ("max-file", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            driver: "json-file".to_string(),
            options,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedVolume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Networks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<NamedNetwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Inputs for rendering a new application file
#[derive(Debug, Clone)]
pub struct TopologySpec {
    /// Host port published for the frontend
    pub host_port: u16,
    /// Optional instance alias; `None` renders no suffix at all
    pub alias: Option<String>,
    pub frontend_image: String,
    pub backend_image: String,
    pub db_image: String,
}

impl TopologySpec {
    /// `-<alias>` or the empty string
    fn suffix(&self) -> String {
        match self.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => format!("-{}", alias),
            _ => String::new(),
        }
    }
}

impl TopologyDocument {
    /// Render the three-service application: frontend -> backend -> db
    pub fn render(spec: &TopologySpec) -> Self {
        let suffix = spec.suffix();
        let volume_name = format!("fluent-manager-db{}", suffix);

        let service = |name: &str, image: &str| ServiceSpec {
            container_name: Some(format!("fluent-manager-{}{}", name, suffix)),
            restart: Some("always".to_string()),
            image: Some(image.to_string()),
            env_file: Some(ENV_FILE_NAME.to_string()),
            logging: Some(LoggingPolicy::default()),
            ..Default::default()
        };

        let frontend = ServiceSpec {
            ports: vec![format!("{}:{}", spec.host_port, FRONTEND_CONTAINER_PORT)],
            depends_on: vec!["backend".to_string()],
            ..service("frontend", &spec.frontend_image)
        };
        let backend = ServiceSpec {
            depends_on: vec!["db".to_string()],
            ..service("backend", &spec.backend_image)
        };
        let db = ServiceSpec {
            volumes: vec![format!("{}:{}", volume_name, DB_DATA_DIR)],
            ..service("db", &spec.db_image)
        };

        let mut volumes = BTreeMap::new();
        volumes.insert(
            volume_name.clone(),
            NamedVolume {
                name: Some(volume_name),
            },
        );

        Self {
            version: Some("3".to_string()),
            services: Services {
                frontend: Some(frontend),
                backend: Some(backend),
                db: Some(db),
            },
            volumes,
            networks: Some(Networks {
                default: Some(NamedNetwork {
                    name: Some(format!("fluent-manager-network{}", suffix)),
                }),
            }),
        }
    }

    pub fn from_yaml(content: &str) -> DeployResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> DeployResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn service(&self, name: &'static str) -> DeployResult<&ServiceSpec> {
        let service = match name {
            "frontend" => self.services.frontend.as_ref(),
            "backend" => self.services.backend.as_ref(),
            _ => self.services.db.as_ref(),
        };
        service.ok_or_else(|| DeployError::topology(format!("services.{}", name)))
    }

    fn image_of(&self, name: &'static str) -> DeployResult<&str> {
        self.service(name)?
            .image
            .as_deref()
            .ok_or_else(|| DeployError::topology(format!("services.{}.image", name)))
    }

    pub fn frontend_image(&self) -> DeployResult<&str> {
        self.image_of("frontend")
    }

    pub fn backend_image(&self) -> DeployResult<&str> {
        self.image_of("backend")
    }

    pub fn db_image(&self) -> DeployResult<&str> {
        self.image_of("db")
    }

    pub fn frontend_container_name(&self) -> DeployResult<&str> {
        self.service("frontend")?
            .container_name
            .as_deref()
            .ok_or_else(|| DeployError::topology("services.frontend.container_name"))
    }

    pub fn db_container_name(&self) -> DeployResult<&str> {
        self.service("db")?
            .container_name
            .as_deref()
            .ok_or_else(|| DeployError::topology("services.db.container_name"))
    }

    /// Volume part of `services.db.volumes[0]` (`<volume>:<mountpath>`)
    pub fn db_volume(&self) -> DeployResult<&str> {
        self.service("db")?
            .volumes
            .first()
            .and_then(|v| v.split(':').next())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DeployError::topology("services.db.volumes[0]"))
    }

    pub fn network_name(&self) -> DeployResult<&str> {
        self.networks
            .as_ref()
            .and_then(|n| n.default.as_ref())
            .and_then(|d| d.name.as_deref())
            .ok_or_else(|| DeployError::topology("networks.default.name"))
    }
}
