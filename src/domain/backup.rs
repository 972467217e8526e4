//! 备份文件领域模型

use chrono::NaiveDateTime;

/// 备份类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// pg_dump 导出的 tar 归档
    Dump,
    /// 数据卷完整打包
    Full,
}

impl BackupKind {
    /// 文件名中的时间戳格式
    ///
    /// 完整备份沿用 12 小时制且不带 AM/PM，属于既有的磁盘命名约定，不做统一
    pub fn timestamp_format(&self) -> &'static str {
        match self {
            BackupKind::Dump => "%Y_%m_%d_%H_%M",
            BackupKind::Full => "%Y_%m_%d_%I_%M",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            BackupKind::Dump => "-dump_db.tar",
            BackupKind::Full => "-backup.tar.bz2",
        }
    }

    /// 恢复时用于筛选候选文件的扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            BackupKind::Dump => ".tar",
            BackupKind::Full => ".tar.bz2",
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(self.extension())
    }
}

impl std::fmt::Display for BackupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupKind::Dump => write!(f, "dump"),
            BackupKind::Full => write!(f, "full"),
        }
    }
}

/// 备份文件，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub file_name: String,
    pub kind: BackupKind,
}

impl BackupArtifact {
    pub fn at(kind: BackupKind, now: NaiveDateTime) -> Self {
        Self {
            file_name: format!("{}{}", now.format(kind.timestamp_format()), kind.suffix()),
            kind,
        }
    }
}
