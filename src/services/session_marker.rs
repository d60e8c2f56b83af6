//! 会话标记 - 业务能力层
//!
//! 记录"上次停在哪篇论文"，只用于快速恢复，不作为完成情况的依据

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// 会话标记文件内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarkerDoc {
    pub user: String,
    /// 读取时可能为任意整数（例如被手工改成负数），使用前需检查范围
    pub current_paper_index: i64,
    pub current_paper_key: Option<String>,
}

/// 会话标记文件读写
#[derive(Debug, Clone)]
pub struct SessionMarker {
    path: PathBuf,
}

impl SessionMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取会话标记
    ///
    /// 文件不存在或内容损坏时返回 None
    pub async fn read(&self) -> Option<SessionMarkerDoc> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("会话标记不存在: {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("⚠️ 无法读取会话标记 {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("⚠️ 会话标记 {} 内容损坏，忽略: {}", self.path.display(), e);
                None
            }
        }
    }

    /// 读取属于 `user` 且索引在 `[0, paper_count)` 内的恢复位置
    pub async fn resume_index(&self, user: &str, paper_count: usize) -> Option<usize> {
        let doc = self.read().await?;

        if doc.user != user {
            warn!(
                "⚠️ 会话标记属于 {}，当前标注者为 {}，忽略",
                doc.user, user
            );
            return None;
        }

        match usize::try_from(doc.current_paper_index) {
            Ok(index) if index < paper_count => Some(index),
            _ => {
                warn!(
                    "⚠️ 会话标记中的索引 {} 超出范围 [0, {})，忽略",
                    doc.current_paper_index, paper_count
                );
                None
            }
        }
    }

    /// 覆盖写入当前位置
    pub async fn write(&self, user: &str, index: usize, paper_key: Option<&str>) -> AppResult<()> {
        let doc = SessionMarkerDoc {
            user: user.to_string(),
            current_paper_index: index as i64,
            current_paper_key: paper_key.map(str::to_string),
        };
        let path_str = self.path.display().to_string();

        let content = serde_json::to_string_pretty(&doc)
            .map_err(|e| AppError::session_write_failed(&path_str, e))?;
        fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::session_write_failed(&path_str, e))?;

        debug!("会话标记已更新: 索引 {} ({:?})", index, paper_key);
        Ok(())
    }
}
