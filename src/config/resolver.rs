//! 环境配置解析
//!
//! 固定默认值 + 管理员信息 + 可选的邮件 / Vault 配置

use crate::config::env::constants::{MAX_ADMIN_PASSWORD_LEN, MIN_ADMIN_PASSWORD_LEN};
use crate::config::secrets::{generate_keyset_handle, GeneratedSecrets};
use crate::domain::configuration::{keys, Configuration};
use crate::error::{DeployError, DeployResult};

const SDK_TYPE: &str = "fluent";

pub const DEFAULT_DB_NAME: &str = "fluent";
pub const DEFAULT_DB_USER: &str = "postgres";

const DEFAULT_VAULT_ENABLE: &str = "false";
const DEFAULT_VAULT_URI: &str = "http://host.docker.internal:8200";
const DEFAULT_VAULT_TOKEN: &str = "static-token-value";
const DEFAULT_VAULT_SECRET_ENGINE_PATH: &str = "fluent-manager";

/// SMTP 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailingOptions {
    pub smtp_host: String,
    pub smtp_port: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from: String,
    pub smtp_auth: bool,
    pub smtp_tls_enable: bool,
}

impl MailingOptions {
    /// 启用邮件时 host/username/password/from 都必须提供
    #[allow(clippy::too_many_arguments)]
    pub fn from_args(
        enabled: bool,
        host: Option<String>,
        port: Option<String>,
        username: Option<String>,
        password: Option<String>,
        from: Option<String>,
        auth: bool,
        tls_enable: bool,
    ) -> DeployResult<Option<Self>> {
        if !enabled {
            return Ok(None);
        }
        match (host, username, password, from) {
            (Some(smtp_host), Some(smtp_username), Some(smtp_password), Some(smtp_from)) => {
                Ok(Some(Self {
                    smtp_host,
                    smtp_port: port.unwrap_or_else(|| "587".to_string()),
                    smtp_username,
                    smtp_password,
                    smtp_from,
                    smtp_auth: auth,
                    smtp_tls_enable: tls_enable,
                }))
            }
            _ => Err(DeployError::usage(
                "If mailing capabilities are enabled, mailing options must be specified",
            )),
        }
    }
}

/// Vault 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultOptions {
    pub url: String,
    pub token: String,
    pub secret_engine_path: String,
}

impl VaultOptions {
    pub fn from_args(
        enabled: bool,
        url: Option<String>,
        token: Option<String>,
        secret_engine_path: Option<String>,
    ) -> DeployResult<Option<Self>> {
        if !enabled {
            return Ok(None);
        }
        match (url, token, secret_engine_path) {
            (Some(url), Some(token), Some(secret_engine_path)) => Ok(Some(Self {
                url,
                token,
                secret_engine_path,
            })),
            _ => Err(DeployError::usage(
                "If Vault capabilities are enabled, Vault options must be specified",
            )),
        }
    }
}

/// `create-config-file` 的输入
#[derive(Debug, Clone)]
pub struct ConfigRequest {
    pub admin_email: String,
    pub admin_password: String,
    pub public_url: String,
    pub mailing: Option<MailingOptions>,
    pub vault: Option<VaultOptions>,
}

impl ConfigRequest {
    /// 密码长度必须在 [12, 64] 之间
    pub fn validate(&self) -> DeployResult<()> {
        let len = self.admin_password.chars().count();
        if !(MIN_ADMIN_PASSWORD_LEN..=MAX_ADMIN_PASSWORD_LEN).contains(&len) {
            return Err(DeployError::validation(format!(
                "Password must have length between {} and {} characters",
                MIN_ADMIN_PASSWORD_LEN, MAX_ADMIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

/// 内置默认配置，密钥来自进程级的 `GeneratedSecrets`
pub fn default_configuration(secrets: &GeneratedSecrets) -> Configuration {
    [
        (keys::SPRING_PROFILES, format!("prod, {}", SDK_TYPE)),
        (keys::JWT_PRIVATE_KEY, secrets.jwt_private_key.clone()),
        ("FLUENT_MANAGER_ACCESS_TOKEN_TIME_TO_LIVE", "86400".to_string()),
        ("FLUENT_MANAGER_REFRESH_TOKEN_TIME_TO_LIVE", "1209600".to_string()),
        ("FLUENT_MANAGER_COOKIES_TIME_TO_LIVE", "2592000".to_string()),
        ("FLUENT_MANAGER_MAXIMUM_FAILED_LOGIN_ATTEMPTS", "5".to_string()),
        ("FLUENT_MANAGER_CORS_ALLOWED_PATHS", "*".to_string()),
        ("FLUENT_MANAGER_CORS_ALLOWED_ORIGINS", "*".to_string()),
        ("FLUENT_MANAGER_CORS_ALLOWED_METHODS", "*".to_string()),
        ("FLUENT_MANAGER_DATABASE_URL", "db:5432".to_string()),
        (keys::DATABASE_NAME, DEFAULT_DB_NAME.to_string()),
        (keys::DATABASE_USERNAME, DEFAULT_DB_USER.to_string()),
        (keys::DATABASE_PASSWORD, secrets.db_password.clone()),
        ("FLUENT_MANAGER_RESET_SYSTEM_ADMINISTRATOR_CREDENTIALS", "false".to_string()),
        (keys::MAILING_ENABLE, "false".to_string()),
        (keys::SMTP_HOST, "smtp.gmail.com".to_string()),
        (keys::SMTP_PORT, "587".to_string()),
        (keys::SMTP_USERNAME, "admin@gmail.com".to_string()),
        (keys::SMTP_PASSWORD, "$$uper$$ecret".to_string()),
        (keys::SMTP_FROM, "admin@email.com".to_string()),
        (keys::SMTP_AUTH, "true".to_string()),
        (keys::SMTP_TLS_ENABLE, "true".to_string()),
        ("FLUENT_MANAGER_SENTRY_DSN", String::new()),
        ("FLUENT_MANAGER_SENTRY_ENVIRONMENT", String::new()),
        (keys::LICENSE_SUBSCRIPTION_ENABLE, "true".to_string()),
        ("POSTGRES_DB", DEFAULT_DB_NAME.to_string()),
        ("POSTGRES_USER", DEFAULT_DB_USER.to_string()),
        (keys::POSTGRES_PASSWORD, secrets.db_password.clone()),
        (keys::ADMIN_EMAIL, "admin@email.com".to_string()),
        (keys::ADMIN_PASSWORD, "admin@email.com".to_string()),
        (keys::SDK_TYPE, SDK_TYPE.to_string()),
        (keys::PUBLIC_URL, String::new()),
    ]
    .into_iter()
    .collect()
}

/// 解析最终配置
///
/// 每次调用都会生成新的 keyset handle，因此两次解析的结果不会逐字节相同
pub fn resolve(request: &ConfigRequest, secrets: &GeneratedSecrets) -> DeployResult<Configuration> {
    request.validate()?;

    let mut config = default_configuration(secrets);
    config.set(keys::ADMIN_EMAIL, request.admin_email.as_str());
    config.set(keys::ADMIN_PASSWORD, request.admin_password.as_str());
    config.set(keys::PUBLIC_URL, request.public_url.as_str());
    config.set(keys::SDK_TYPE, SDK_TYPE);
    config.set(keys::SPRING_PROFILES, format!("prod, {}", SDK_TYPE));

    if let Some(mailing) = &request.mailing {
        config.set(keys::MAILING_ENABLE, "true");
        config.set(keys::SMTP_HOST, mailing.smtp_host.as_str());
        config.set(keys::SMTP_PORT, mailing.smtp_port.as_str());
        config.set(keys::SMTP_USERNAME, mailing.smtp_username.as_str());
        config.set(keys::SMTP_PASSWORD, mailing.smtp_password.as_str());
        config.set(keys::SMTP_FROM, mailing.smtp_from.as_str());
        config.set(keys::SMTP_AUTH, mailing.smtp_auth.to_string());
        config.set(keys::SMTP_TLS_ENABLE, mailing.smtp_tls_enable.to_string());
    }

    match &request.vault {
        Some(vault) => {
            config.set(keys::VAULT_ENABLE, "true");
            config.set(keys::VAULT_URI, vault.url.as_str());
            config.set(keys::VAULT_TOKEN, vault.token.as_str());
            config.set(keys::VAULT_SECRET_ENGINE_PATH, vault.secret_engine_path.as_str());
        }
        None => {
            config.set(keys::VAULT_ENABLE, DEFAULT_VAULT_ENABLE);
            config.set(keys::VAULT_URI, DEFAULT_VAULT_URI);
            config.set(keys::VAULT_TOKEN, DEFAULT_VAULT_TOKEN);
            config.set(keys::VAULT_SECRET_ENGINE_PATH, DEFAULT_VAULT_SECRET_ENGINE_PATH);
        }
    }

    config.set(keys::KEYSET_HANDLE, generate_keyset_handle()?);
    Ok(config)
}
