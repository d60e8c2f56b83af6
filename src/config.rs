use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 默认配置文件名
pub const CONFIG_FILE: &str = "annotator.toml";

/// 程序配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// 标注者（对应论文列表中的 assignee 列）
    pub user: String,
    /// 研究问题定义文件
    pub schema_file: PathBuf,
    /// 论文分配列表（分号分隔的 CSV）
    pub papers_csv: PathBuf,
    /// 导出文件
    pub export_file: PathBuf,
    /// 会话标记文件
    pub session_file: PathBuf,
    /// 合理性检查规则文件
    pub sanity_checks_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: "Moritz".to_string(),
            schema_file: PathBuf::from("data-items.json"),
            papers_csv: PathBuf::from("2026-02-24_data-extraction-assignments(in).csv"),
            export_file: PathBuf::from("export.json"),
            session_file: PathBuf::from(".session.json"),
            sanity_checks_file: PathBuf::from("sanity_checks.json"),
            verbose_logging: false,
        }
    }
}

/// 配置文件内容，所有键均可省略
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    user: Option<String>,
    schema_file: Option<PathBuf>,
    papers_csv: Option<PathBuf>,
    export_file: Option<PathBuf>,
    session_file: Option<PathBuf>,
    sanity_checks_file: Option<PathBuf>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// 默认值 + 配置文件（不存在时跳过）+ 环境变量
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content, path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("配置文件 {} 不存在，使用默认值", path.display());
                Self::default()
            }
            Err(e) => return Err(AppError::file_read_failed(path.display().to_string(), e)),
        };

        config.with_overrides(|name| std::env::var(name).ok())
    }

    /// 在默认值上应用 TOML 配置
    pub fn from_toml(content: &str, path: &Path) -> AppResult<Self> {
        let file: FileConfig = toml::from_str(content).map_err(|e| FileError::TomlParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let default = Self::default();
        Ok(Self {
            user: file.user.unwrap_or(default.user),
            schema_file: file.schema_file.unwrap_or(default.schema_file),
            papers_csv: file.papers_csv.unwrap_or(default.papers_csv),
            export_file: file.export_file.unwrap_or(default.export_file),
            session_file: file.session_file.unwrap_or(default.session_file),
            sanity_checks_file: file.sanity_checks_file.unwrap_or(default.sanity_checks_file),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
        })
    }

    /// 应用环境变量覆盖，`lookup` 按变量名取值
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        if let Some(user) = lookup("ANNOTATOR_USER") {
            self.user = user;
        }
        if let Some(v) = lookup("SCHEMA_FILE") {
            self.schema_file = v.into();
        }
        if let Some(v) = lookup("PAPERS_CSV") {
            self.papers_csv = v.into();
        }
        if let Some(v) = lookup("EXPORT_FILE") {
            self.export_file = v.into();
        }
        if let Some(v) = lookup("SESSION_FILE") {
            self.session_file = v.into();
        }
        if let Some(v) = lookup("SANITY_CHECKS_FILE") {
            self.sanity_checks_file = v.into();
        }
        if let Some(v) = lookup("VERBOSE_LOGGING") {
            self.verbose_logging = v.parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "VERBOSE_LOGGING".to_string(),
                value: v.clone(),
                expected_type: "bool".to_string(),
            })?;
        }

        if self.user.trim().is_empty() {
            return Err(ConfigError::MissingUser.into());
        }
        Ok(self)
    }
}
