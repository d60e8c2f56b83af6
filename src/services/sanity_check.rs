//! 合理性检查 - 业务能力层
//!
//! 规则引擎本身在外部，这里只定义接口，并把它包装成"失败即阻止"的关卡

use crate::error::{AppError, AppResult};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub type SanityResult = Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>>;

/// 外部合理性检查
///
/// 输入为刚写入导出文件的单篇论文记录，返回违规描述列表
pub trait SanityChecker: Send + Sync {
    fn validate_paper(&self, paper_record: &JsonValue, config_path: &Path) -> SanityResult;
}

impl<F> SanityChecker for F
where
    F: Fn(&JsonValue, &Path) -> SanityResult + Send + Sync,
{
    fn validate_paper(&self, paper_record: &JsonValue, config_path: &Path) -> SanityResult {
        self(paper_record, config_path)
    }
}

/// 不做任何检查
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSanityChecks;

impl SanityChecker for NoSanityChecks {
    fn validate_paper(&self, _paper_record: &JsonValue, _config_path: &Path) -> SanityResult {
        Ok(Vec::new())
    }
}

/// 合理性检查关卡
pub struct SanityGate {
    checker: Box<dyn SanityChecker>,
    config_path: PathBuf,
}

impl SanityGate {
    pub fn new(checker: Box<dyn SanityChecker>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            checker,
            config_path: config_path.into(),
        }
    }

    /// 运行检查
    ///
    /// 检查器报错时返回 SanityCheckError，调用方必须阻止完成
    pub fn check(&self, paper: &str, record: &JsonValue) -> AppResult<Vec<String>> {
        match self.checker.validate_paper(record, &self.config_path) {
            Ok(violations) => {
                if violations.is_empty() {
                    debug!("[论文 {}] 合理性检查通过", paper);
                } else {
                    warn!("[论文 {}] ⚠️ 合理性检查发现 {} 个问题", paper, violations.len());
                }
                Ok(violations)
            }
            Err(e) => Err(AppError::sanity_check_failed(paper, e)),
        }
    }
}

impl Default for SanityGate {
    fn default() -> Self {
        Self::new(Box::new(NoSanityChecks), "sanity_checks.json")
    }
}
