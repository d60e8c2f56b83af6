use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 论文唯一标识（CSV 中的 itemkey）
pub type PaperKey = String;

/// 论文元数据快照，原样写入导出文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMeta {
    #[serde(default = "unknown")]
    pub title: String,
    #[serde(default = "unknown")]
    pub authors: String,
    #[serde(default = "unknown")]
    pub year: String,
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl Default for PaperMeta {
    fn default() -> Self {
        Self {
            title: unknown(),
            authors: unknown(),
            year: unknown(),
        }
    }
}

/// 分配给当前标注者的一篇论文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub key: PaperKey,
    pub meta: PaperMeta,
}

impl Paper {
    pub fn new(key: impl Into<PaperKey>, meta: PaperMeta) -> Self {
        Self {
            key: key.into(),
            meta,
        }
    }
}

impl Display for Paper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({}, {})",
            self.key, self.meta.title, self.meta.authors, self.meta.year
        )
    }
}
