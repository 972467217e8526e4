//! `.env` 文件读写与比对
//!
//! 文件格式为每行一个 `KEY=VALUE`，不加引号

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::domain::configuration::{keys, Configuration};
use crate::error::DeployResult;

/// 每次运行都会重新生成的值，只比较长度
pub const GENERATED_KEYS: &[&str] = &[
    keys::JWT_PRIVATE_KEY,
    keys::KEYSET_HANDLE,
    keys::DATABASE_PASSWORD,
    keys::POSTGRES_PASSWORD,
];

/// 写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 整体替换
    Overwrite,
    /// 追加到文件末尾
    Append,
}

/// 解析 `KEY=VALUE` 文本，忽略空行和 `#` / `!` 注释
pub fn parse(content: &str) -> Configuration {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.trim_end(), value.trim_start()),
            None => (line, ""),
        })
        .collect()
}

/// 读取配置文件；文件不存在时返回 `None`
pub fn load(path: &Path) -> DeployResult<Option<Configuration>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(parse(&content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 读取单个配置项
pub fn read_property(path: &Path, key: &str) -> DeployResult<Option<String>> {
    Ok(load(path)?.and_then(|config| config.get(key).map(str::to_string)))
}

/// 判断磁盘上的配置与新解析的配置是否等价
///
/// 键数量不同直接判定为过期；生成类密钥只比较长度，其余要求完全相等
pub fn is_current(existing: &Configuration, resolved: &Configuration) -> bool {
    if existing.len() != resolved.len() {
        debug!(
            existing = existing.len(),
            resolved = resolved.len(),
            "Configuration key count differs"
        );
        return false;
    }

    existing.iter().all(|(key, value)| {
        let Some(candidate) = resolved.get(key) else {
            debug!(key, "Key missing from resolved configuration");
            return false;
        };
        let equal = if GENERATED_KEYS.contains(&key) {
            value.len() == candidate.len()
        } else {
            value == candidate
        };
        if !equal {
            debug!(key, "Configuration value differs");
        }
        equal
    })
}

/// 对比磁盘文件；文件不存在视为过期
pub fn reconcile(path: &Path, resolved: &Configuration) -> DeployResult<bool> {
    Ok(load(path)?
        .map(|existing| is_current(&existing, resolved))
        .unwrap_or(false))
}

/// 序列化为 `KEY=VALUE` 行
pub fn render(configuration: &Configuration) -> String {
    configuration
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect()
}

/// 写入配置文件；整体替换时先写临时文件再重命名
///
/// 已有文件的权限会复制到新文件上
pub fn write(path: &Path, configuration: &Configuration, mode: WriteMode) -> DeployResult<()> {
    let content = render(configuration);
    match mode {
        WriteMode::Overwrite => {
            let mut tmp = path.as_os_str().to_owned();
            tmp.push(".tmp");
            fs::write(&tmp, content)?;
            match fs::metadata(path) {
                Ok(existing) => fs::set_permissions(&tmp, existing.permissions())?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            fs::rename(&tmp, path)?;
        }
        WriteMode::Append => {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            file.write_all(content.as_bytes())?;
        }
    }
    Ok(())
}
