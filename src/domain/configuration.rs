//! 环境配置（`.env`）领域模型

use std::collections::BTreeMap;

/// 环境变量名
pub mod keys {
    pub const SPRING_PROFILES: &str = "SPRING_PROFILES_ACTIVE";
    pub const JWT_PRIVATE_KEY: &str = "FLUENT_MANAGER_JWT_PRIVATE_KEY";
    pub const ADMIN_EMAIL: &str = "FLUENT_MANAGER_DEFAULT_ADMIN_EMAIL";
    pub const ADMIN_PASSWORD: &str = "FLUENT_MANAGER_DEFAULT_ADMIN_PASSWORD";
    pub const PUBLIC_URL: &str = "PUBLIC_URL";
    pub const SDK_TYPE: &str = "FLUENT_MANAGER_SDK_TYPE";
    pub const LICENSE_SUBSCRIPTION_ENABLE: &str = "FLUENT_MANAGER_LICENSE_SUBSCRIPTION_ENABLE";

    pub const DATABASE_NAME: &str = "FLUENT_MANAGER_DATABASE_NAME";
    pub const DATABASE_USERNAME: &str = "FLUENT_MANAGER_DATABASE_USERNAME";
    pub const DATABASE_PASSWORD: &str = "FLUENT_MANAGER_DATABASE_PASSWORD";
    pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";

    pub const MAILING_ENABLE: &str = "FLUENT_MANAGER_MAILING_ENABLE";
    pub const SMTP_HOST: &str = "FLUENT_MANAGER_SMTP_HOST";
    pub const SMTP_PORT: &str = "FLUENT_MANAGER_SMTP_PORT";
    pub const SMTP_USERNAME: &str = "FLUENT_MANAGER_SMTP_USERNAME";
    pub const SMTP_PASSWORD: &str = "FLUENT_MANAGER_SMTP_PASSWORD";
    pub const SMTP_FROM: &str = "FLUENT_MANAGER_SMTP_FROM";
    pub const SMTP_AUTH: &str = "FLUENT_MANAGER_SMTP_AUTH";
    pub const SMTP_TLS_ENABLE: &str = "FLUENT_MANAGER_SMTP_TLS_ENABLE";

    pub const VAULT_ENABLE: &str = "FLUENT_MANAGER_VAULT_ENABLE";
    pub const VAULT_URI: &str = "FLUENT_MANAGER_VAULT_URI";
    pub const VAULT_TOKEN: &str = "FLUENT_MANAGER_VAULT_TOKEN";
    pub const VAULT_SECRET_ENGINE_PATH: &str = "FLUENT_MANAGER_VAULT_SECRET_ENGINE_PATH";

    pub const KEYSET_HANDLE: &str = "FLUENT_MANAGER_KEYSET_HANDLE";
}

/// 按键排序的环境配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration(BTreeMap<String, String>);

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// 按键的字典序迭代
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// 敏感关键词列表
const SENSITIVE_KEYWORDS: &[&str] = &[
    "password", "secret", "key", "token", "credential", "auth", "private", "jwt",
];

/// 检查变量名是否敏感
pub fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|kw| key_lower.contains(kw))
}
