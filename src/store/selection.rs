//! 单个属性的标注状态

use crate::models::schema::{DISCUSSION_NEEDED, OTHER};
use std::fmt::Display;

/// (paper, question, attribute) 复合键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    pub paper: String,
    pub question: String,
    pub attribute: String,
}

impl AttributeKey {
    pub fn new(
        paper: impl Into<String>,
        question: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            paper: paper.into(),
            question: question.into(),
            attribute: attribute.into(),
        }
    }
}

impl Display for AttributeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[论文 {} | {} / {}]", self.paper, self.question, self.attribute)
    }
}

/// 已选选项列表 + 转义选项的附带文本
///
/// 列表内不允许重复。`other_text` 只在选中 `Other` 时有意义，
/// `discussion_text` 只在选中 `Discussion needed` 时有意义
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    labels: Vec<String>,
    pub other_text: String,
    pub discussion_text: String,
}

impl SelectionSet {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn contains(&self, option: &str) -> bool {
        self.labels.iter().any(|l| l == option)
    }

    /// 整体替换为 `[option]`
    ///
    /// 新选项不是对应转义选项时清空残留的转义文本
    pub fn replace_with(&mut self, option: &str) {
        self.labels = vec![option.to_string()];
        if option != OTHER {
            self.other_text.clear();
        }
        if option != DISCUSSION_NEEDED {
            self.discussion_text.clear();
        }
    }

    /// 追加（已存在则不变），返回是否新增
    pub fn insert(&mut self, option: &str) -> bool {
        if self.contains(option) {
            return false;
        }
        self.labels.push(option.to_string());
        true
    }

    /// 按值移除，移除转义选项时一并清空其文本，返回是否存在
    pub fn remove(&mut self, option: &str) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l != option);
        let removed = self.labels.len() != before;
        if removed {
            self.clear_escape_text_for(option);
        }
        removed
    }

    /// 清空全部选择和转义文本
    pub fn clear(&mut self) {
        self.labels.clear();
        self.other_text.clear();
        self.discussion_text.clear();
    }

    fn clear_escape_text_for(&mut self, option: &str) {
        if option == OTHER {
            self.other_text.clear();
        } else if option == DISCUSSION_NEEDED {
            self.discussion_text.clear();
        }
    }
}

/// 属性的附加开关，与主选择独立
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleState {
    pub enabled: bool,
    pub text: String,
}

impl ToggleState {
    /// 关闭开关时同时清空文本
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.text.clear();
        }
    }
}

/// 单个属性的完整状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeState {
    pub selections: SelectionSet,
    pub toggle: ToggleState,
    pub mandatory_text: String,
}

impl AttributeState {
    pub fn clear(&mut self) {
        self.selections.clear();
        self.toggle = ToggleState::default();
        self.mandatory_text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_clears_stale_escape_text() {
        let mut set = SelectionSet::default();
        set.replace_with("Other");
        set.other_text = "ad-hoc".to_string();
        set.replace_with("Other");
        assert_eq!(set.other_text, "ad-hoc");

        set.replace_with("Option A");
        assert_eq!(set.labels(), ["Option A".to_string()]);
        assert!(set.other_text.is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut set = SelectionSet::default();
        assert!(set.insert("A"));
        assert!(!set.insert("A"));
        assert!(set.insert("B"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_discussion_clears_its_text_only() {
        let mut set = SelectionSet::default();
        set.insert("Other");
        set.insert("Discussion needed");
        set.other_text = "x".to_string();
        set.discussion_text = "why".to_string();

        assert!(set.remove("Discussion needed"));
        assert!(set.discussion_text.is_empty());
        assert_eq!(set.other_text, "x");
        assert!(!set.remove("Discussion needed"));
    }

    #[test]
    fn test_disabling_toggle_clears_text() {
        let mut toggle = ToggleState::default();
        toggle.set_enabled(true);
        toggle.text = "note".to_string();
        toggle.set_enabled(false);
        assert!(!toggle.enabled);
        assert!(toggle.text.is_empty());
    }
}
