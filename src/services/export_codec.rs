//! 导出编解码 - 业务能力层
//!
//! 负责内存状态与导出文件（export.json）之间的转换：
//!
//! - **编码**：`Other` / `Discussion needed` 的附带文本以前缀形式折叠进选项字符串
//!   （`"Other: ..."` / `"Discussion needed: ..."`），只写出开启的开关和非空的必填文本
//! - **解码**：按固定前缀长度拆回选项和文本，文本中的冒号原样保留；
//!   开关兼容旧版布尔值格式
//! - **合并写入**：写入前重新读取磁盘上的文件，只覆盖内存中已加载的论文，
//!   其余论文原样保留。先写临时文件再原子替换

use crate::error::{AppError, AppResult};
use crate::models::paper::PaperKey;
use crate::models::record::{PaperRecordDoc, QuestionMap, ToggleEntry};
use crate::models::schema::{DISCUSSION_NEEDED, OTHER};
use crate::store::{AttributeKey, PaperState, ResponseStore, SelectionSet, ToggleState};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// `Other` 附带文本的前缀
pub const OTHER_PREFIX: &str = "Other: ";
/// `Discussion needed` 附带文本的前缀
pub const DISCUSSION_PREFIX: &str = "Discussion needed: ";

/// 导出文件整体：paper_key → 原始记录
///
/// 保留原始 JSON，未加载的论文原样写回
pub type PersistedStore = IndexMap<PaperKey, JsonValue>;

/// 讨论文本的实时来源（例如界面输入框）
///
/// 状态中记录的讨论文本为空时，编码会回退到这里
pub trait LiveTextSource: Send + Sync {
    fn discussion_text(&self, key: &AttributeKey) -> Option<String>;
}

/// 没有实时输入来源
pub struct NoLiveText;

impl LiveTextSource for NoLiveText {
    fn discussion_text(&self, _key: &AttributeKey) -> Option<String> {
        None
    }
}

impl LiveTextSource for HashMap<AttributeKey, String> {
    fn discussion_text(&self, key: &AttributeKey) -> Option<String> {
        self.get(key).cloned()
    }
}

// ========== 编码 ==========

/// 编码单个属性的选择列表
///
/// `Other` 文本为空时输出裸 `Other`；
/// `Discussion needed` 文本为空时先尝试 `live_discussion`，仍为空则输出裸标签
pub fn encode_selections(set: &SelectionSet, live_discussion: Option<&str>) -> Vec<String> {
    let discussion = if set.discussion_text.is_empty() {
        live_discussion.unwrap_or_default()
    } else {
        set.discussion_text.as_str()
    };

    set.labels()
        .iter()
        .map(|label| match label.as_str() {
            OTHER if !set.other_text.is_empty() => format!("{}{}", OTHER_PREFIX, set.other_text),
            DISCUSSION_NEEDED if !discussion.is_empty() => {
                format!("{}{}", DISCUSSION_PREFIX, discussion)
            }
            _ => label.clone(),
        })
        .collect()
}

/// 编码单篇论文
pub fn encode_paper(key: &str, state: &PaperState, live: &dyn LiveTextSource) -> PaperRecordDoc {
    let mut responses: QuestionMap<Vec<String>> = IndexMap::new();
    let mut toggle_states: QuestionMap<ToggleEntry> = IndexMap::new();
    let mut mandatory_texts: QuestionMap<String> = IndexMap::new();

    for (question, attribute, attr_state) in state.attributes() {
        let selections = &attr_state.selections;
        let live_discussion = if selections.discussion_text.is_empty()
            && selections.contains(DISCUSSION_NEEDED)
        {
            live.discussion_text(&AttributeKey::new(key, question, attribute))
        } else {
            None
        };

        if selections.contains(OTHER) && selections.other_text.is_empty() {
            debug!("[论文 {}] {}/{} 选择了 Other 但没有文本，按裸标签导出", key, question, attribute);
        }

        responses
            .entry(question.to_string())
            .or_default()
            .insert(
                attribute.to_string(),
                encode_selections(selections, live_discussion.as_deref()),
            );

        if attr_state.toggle.enabled {
            toggle_states
                .entry(question.to_string())
                .or_default()
                .insert(
                    attribute.to_string(),
                    ToggleEntry::enabled(attr_state.toggle.text.clone()),
                );
        }

        if !attr_state.mandatory_text.trim().is_empty() {
            mandatory_texts
                .entry(question.to_string())
                .or_default()
                .insert(attribute.to_string(), attr_state.mandatory_text.clone());
        }
    }

    PaperRecordDoc {
        paper: state.meta.clone(),
        excluded_from_full_text_review: state.excluded,
        exclusion_reason: state.exclusion_reason.clone(),
        responses,
        toggle_states,
        mandatory_texts,
    }
}

// ========== 解码 ==========

/// 解码单个属性的选择列表
pub fn decode_selections(encoded: &[String]) -> SelectionSet {
    let mut set = SelectionSet::default();
    for entry in encoded {
        if let Some(text) = entry.strip_prefix(OTHER_PREFIX) {
            set.insert(OTHER);
            set.other_text = text.to_string();
        } else if let Some(text) = entry.strip_prefix(DISCUSSION_PREFIX) {
            set.insert(DISCUSSION_NEEDED);
            set.discussion_text = text.to_string();
        } else {
            set.insert(entry);
        }
    }
    set
}

/// 解码单篇论文记录
pub fn decode_record(doc: PaperRecordDoc) -> PaperState {
    let mut state = PaperState::new(doc.paper);
    state.excluded = doc.excluded_from_full_text_review;
    state.exclusion_reason = doc.exclusion_reason;

    for (question, attrs) in &doc.responses {
        for (attribute, encoded) in attrs {
            state.attribute_entry(question, attribute).selections = decode_selections(encoded);
        }
    }

    for (question, attrs) in &doc.toggle_states {
        for (attribute, entry) in attrs {
            let (enabled, text) = entry.normalize();
            let toggle = &mut state.attribute_entry(question, attribute).toggle;
            *toggle = ToggleState { enabled, text };
            // 关闭的开关不保留文本
            if !enabled {
                toggle.text.clear();
            }
        }
    }

    for (question, attrs) in &doc.mandatory_texts {
        for (attribute, text) in attrs {
            state.attribute_entry(question, attribute).mandatory_text = text.clone();
        }
    }

    state
}

/// 把原始 JSON 解析为论文记录，失败时记录警告并返回 None
pub fn parse_record(key: &str, value: &JsonValue) -> Option<PaperRecordDoc> {
    match serde_json::from_value::<PaperRecordDoc>(value.clone()) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!("⚠️ 论文 {} 的导出记录无法解析，按未处理对待: {}", key, e);
            None
        }
    }
}

// ========== 文件读写 ==========

/// 一次导出的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// 从内存写出的论文数
    pub written: usize,
    /// 磁盘上原样保留的论文数
    pub preserved: usize,
}

/// 导出文件读写
#[derive(Debug, Clone)]
pub struct ExportCodec {
    path: PathBuf,
}

impl ExportCodec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 导出文件是否存在
    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// 读取整个导出文件
    ///
    /// 文件不存在、无法读取或内容损坏时都视为空存储
    pub async fn read_store(&self) -> PersistedStore {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("导出文件不存在: {}", self.path.display());
                return PersistedStore::new();
            }
            Err(e) => {
                warn!("⚠️ 无法读取导出文件 {}，按空存储处理: {}", self.path.display(), e);
                return PersistedStore::new();
            }
        };

        match serde_json::from_str::<PersistedStore>(&content) {
            Ok(store) => store,
            Err(e) => {
                warn!("⚠️ 导出文件 {} 内容损坏，按空存储处理: {}", self.path.display(), e);
                PersistedStore::new()
            }
        }
    }

    /// 读取单篇论文的记录
    pub async fn read_record(&self, key: &str) -> Option<PaperRecordDoc> {
        let store = self.read_store().await;
        parse_record(key, store.get(key)?)
    }

    /// 读取单篇论文之前保存的状态
    pub async fn load_prior_state(&self, key: &str) -> Option<PaperState> {
        self.read_record(key).await.map(decode_record)
    }

    /// 合并写入：磁盘内容 + 内存中已加载的全部论文
    pub async fn export(
        &self,
        store: &ResponseStore,
        live: &dyn LiveTextSource,
    ) -> AppResult<ExportSummary> {
        let path_str = self.path.display().to_string();
        let mut output = self.read_store().await;
        let on_disk = output.len();

        let mut overwritten = 0;
        for (key, state) in store.papers() {
            let doc = encode_paper(key, state, live);
            let value =
                serde_json::to_value(&doc).map_err(|e| AppError::export_failed(&path_str, e))?;
            if output.insert(key.clone(), value).is_some() {
                overwritten += 1;
            }
        }

        let content =
            serde_json::to_string_pretty(&output).map_err(|e| AppError::export_failed(&path_str, e))?;
        self.write_atomically(&content).await?;

        let summary = ExportSummary {
            written: store.len(),
            preserved: on_disk - overwritten,
        };
        info!(
            "💾 已导出到 {}: 写入 {} 篇, 保留 {} 篇",
            path_str, summary.written, summary.preserved
        );
        Ok(summary)
    }

    /// 先写同目录下的临时文件，再替换目标文件
    async fn write_atomically(&self, content: &str) -> AppResult<()> {
        let path_str = self.path.display().to_string();
        let tmp_path = tmp_path_for(&self.path);

        if let Err(e) = fs::write(&tmp_path, content).await {
            return Err(AppError::export_failed(&path_str, e));
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AppError::export_failed(&path_str, e));
        }

        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
