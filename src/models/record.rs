//! 导出文件中单篇论文的持久化形态
//!
//! ```json
//! {
//!   "paper": {"title": "...", "authors": "...", "year": "..."},
//!   "excluded_from_full_text_review": false,
//!   "exclusion_reason": "",
//!   "responses": {"RQ1": {"Category": ["Other: ad-hoc"]}},
//!   "toggle_states": {"RQ1": {"Category": {"enabled": true, "text": "..."}}},
//!   "mandatory_texts": {"RQ1": {"Category": "..."}}
//! }
//! ```
//!
//! `toggle_states` / `mandatory_texts` 为空时整个键省略，从不写 null

use crate::models::paper::PaperMeta;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// question_key → attribute → T
pub type QuestionMap<T> = IndexMap<String, IndexMap<String, T>>;

/// 单篇论文记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecordDoc {
    #[serde(default)]
    pub paper: PaperMeta,
    #[serde(default)]
    pub excluded_from_full_text_review: bool,
    #[serde(default)]
    pub exclusion_reason: String,
    #[serde(default)]
    pub responses: QuestionMap<Vec<String>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub toggle_states: QuestionMap<ToggleEntry>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mandatory_texts: QuestionMap<String>,
}

impl PaperRecordDoc {
    /// 是否至少有一个属性存在非空选择
    pub fn has_responses(&self) -> bool {
        self.responses
            .values()
            .flat_map(|attrs| attrs.values())
            .any(|selections| !selections.is_empty())
    }

    /// 是否已处理：有实际回答，或已被排除
    pub fn is_processed(&self) -> bool {
        self.excluded_from_full_text_review || self.has_responses()
    }
}

/// 开关条目
///
/// 新格式为 `{enabled, text}`，旧格式为单个布尔值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToggleEntry {
    Structured {
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default)]
        text: String,
    },
    Legacy(bool),
}

fn default_enabled() -> bool {
    true
}

impl ToggleEntry {
    pub fn enabled(text: impl Into<String>) -> Self {
        ToggleEntry::Structured {
            enabled: true,
            text: text.into(),
        }
    }

    /// 统一为 (enabled, text)；旧格式文本为空
    pub fn normalize(&self) -> (bool, String) {
        match self {
            ToggleEntry::Structured { enabled, text } => (*enabled, text.clone()),
            ToggleEntry::Legacy(enabled) => (*enabled, String::new()),
        }
    }
}
