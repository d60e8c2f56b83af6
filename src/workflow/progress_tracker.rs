//! 进度跟踪 - 流程层
//!
//! 决定标注者从哪篇论文继续：
//!
//! 1. 会话标记属于当前标注者且索引有效 → 直接恢复（不扫描导出文件）
//! 2. 导出文件不存在 → 从 0 开始
//! 3. 按论文列表顺序扫描导出文件，第一篇"缺失"或"全部属性为空"的论文即恢复位置；
//!    已排除或已有回答的论文视为已处理
//! 4. 全部已处理 → 索引等于论文数量（AllComplete）

use crate::error::AppResult;
use crate::models::paper::Paper;
use crate::services::export_codec::{parse_record, ExportCodec, PersistedStore};
use crate::services::session_marker::SessionMarker;
use std::fmt::Display;
use tracing::{debug, info};

/// 进度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    NotStarted,
    /// 启动时恢复到该索引
    Resumed(usize),
    /// 会话中前进 / 跳转到该索引
    Advancing(usize),
    AllComplete,
}

impl ProgressState {
    /// 当前索引（AllComplete / NotStarted 时为 None）
    pub fn index(self) -> Option<usize> {
        match self {
            ProgressState::Resumed(i) | ProgressState::Advancing(i) => Some(i),
            ProgressState::NotStarted | ProgressState::AllComplete => None,
        }
    }
}

impl Display for ProgressState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressState::NotStarted => write!(f, "未开始"),
            ProgressState::Resumed(i) => write!(f, "恢复到第 {} 篇", i + 1),
            ProgressState::Advancing(i) => write!(f, "进行到第 {} 篇", i + 1),
            ProgressState::AllComplete => write!(f, "全部完成"),
        }
    }
}

/// 在导出文件中扫描第一篇未处理的论文
///
/// 返回值等于 `papers.len()` 表示全部已处理
pub fn scan_resume_index(store: &PersistedStore, papers: &[Paper]) -> usize {
    for (index, paper) in papers.iter().enumerate() {
        let Some(value) = store.get(&paper.key) else {
            debug!("论文 {} 不在导出文件中", paper.key);
            return index;
        };

        let Some(doc) = parse_record(&paper.key, value) else {
            return index;
        };

        if doc.excluded_from_full_text_review {
            continue;
        }

        if !doc.has_responses() {
            debug!("论文 {} 的回答全部为空", paper.key);
            return index;
        }
    }

    papers.len()
}

/// 进度跟踪器
#[derive(Debug)]
pub struct ProgressTracker {
    user: String,
    papers: Vec<Paper>,
    codec: ExportCodec,
    marker: SessionMarker,
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new(
        user: impl Into<String>,
        papers: Vec<Paper>,
        codec: ExportCodec,
        marker: SessionMarker,
    ) -> Self {
        Self {
            user: user.into(),
            papers,
            codec,
            marker,
            state: ProgressState::NotStarted,
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn paper(&self, index: usize) -> Option<&Paper> {
        self.papers.get(index)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.papers.iter().position(|p| p.key == key)
    }

    /// 计算恢复位置
    pub async fn resume_index(&self) -> usize {
        if let Some(index) = self.marker.resume_index(&self.user, self.papers.len()).await {
            info!("📌 根据会话标记恢复到第 {} 篇", index + 1);
            return index;
        }

        if !self.codec.exists().await {
            info!("📄 导出文件不存在，从第 1 篇开始");
            return 0;
        }

        let store = self.codec.read_store().await;
        let index = scan_resume_index(&store, &self.papers);
        info!("🔍 扫描导出文件，第一篇未处理的论文索引: {}", index);
        index
    }

    /// 启动时确定恢复位置并更新状态
    pub async fn resume(&mut self) -> ProgressState {
        let index = self.resume_index().await;
        self.state = if index >= self.papers.len() {
            ProgressState::AllComplete
        } else {
            ProgressState::Resumed(index)
        };
        self.state
    }

    /// 前进 / 跳转到 `index`
    pub fn advance_to(&mut self, index: usize) -> ProgressState {
        self.state = if index >= self.papers.len() {
            ProgressState::AllComplete
        } else {
            ProgressState::Advancing(index)
        };
        self.state
    }

    /// 成功加载论文后覆盖会话标记
    pub async fn record_position(&self, index: usize) -> AppResult<()> {
        let key = self.papers.get(index).map(|p| p.key.as_str());
        self.marker.write(&self.user, index, key).await
    }

    /// 可以"返回"的论文：已有回答或已排除，按论文列表顺序
    pub async fn finished_papers(&self) -> Vec<Paper> {
        if !self.codec.exists().await {
            return Vec::new();
        }

        let store = self.codec.read_store().await;
        self.papers
            .iter()
            .filter(|paper| {
                store
                    .get(&paper.key)
                    .and_then(|value| parse_record(&paper.key, value))
                    .is_some_and(|doc| doc.is_processed())
            })
            .cloned()
            .collect()
    }
}
