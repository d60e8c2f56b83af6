//! 内存中的标注状态（唯一权威来源）
//!
//! 只负责状态本身，不做任何 I/O。所有写操作都会先校验
//! paper / question / attribute（以及选项）是否存在，不存在时返回 InvalidKey

use crate::error::{AppResult, SchemaError};
use crate::models::paper::{Paper, PaperKey, PaperMeta};
use crate::models::schema::{AttributeSpec, Schema, SelectionMode};
use crate::store::selection::AttributeState;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// 顺序多选追加结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequentialAdd {
    Added,
    /// 已在列表中，未做修改
    AlreadyPresent,
}

/// 单篇论文的标注状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperState {
    pub meta: PaperMeta,
    pub excluded: bool,
    pub exclusion_reason: String,
    questions: IndexMap<String, IndexMap<String, AttributeState>>,
}

impl PaperState {
    pub fn new(meta: PaperMeta) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    /// 为定义中的每个属性建立空状态
    pub fn for_schema(meta: PaperMeta, schema: &Schema) -> Self {
        let mut state = Self::new(meta);
        for (question, attribute, _) in schema.attributes() {
            state.attribute_entry(question, attribute);
        }
        state
    }

    pub fn attribute(&self, question: &str, attribute: &str) -> Option<&AttributeState> {
        self.questions.get(question)?.get(attribute)
    }

    pub fn attribute_mut(&mut self, question: &str, attribute: &str) -> Option<&mut AttributeState> {
        self.questions.get_mut(question)?.get_mut(attribute)
    }

    /// 获取属性状态，不存在则创建
    pub fn attribute_entry(&mut self, question: &str, attribute: &str) -> &mut AttributeState {
        self.questions
            .entry(question.to_string())
            .or_default()
            .entry(attribute.to_string())
            .or_default()
    }

    /// 按插入顺序遍历 (question, attribute, state)
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str, &AttributeState)> {
        self.questions.iter().flat_map(|(q, attrs)| {
            attrs
                .iter()
                .map(move |(a, state)| (q.as_str(), a.as_str(), state))
        })
    }

    fn attributes_mut(&mut self) -> impl Iterator<Item = &mut AttributeState> {
        self.questions.values_mut().flat_map(|attrs| attrs.values_mut())
    }

    /// 是否有任意非空选择
    pub fn has_responses(&self) -> bool {
        self.attributes().any(|(_, _, s)| !s.selections.is_empty())
    }

    /// 用之前保存的状态覆盖当前骨架，骨架中不存在的属性会被追加
    pub fn overlay(mut self, prior: PaperState) -> Self {
        self.excluded = prior.excluded;
        self.exclusion_reason = prior.exclusion_reason;
        for (question, attrs) in prior.questions {
            let target = self.questions.entry(question).or_default();
            for (attribute, state) in attrs {
                target.insert(attribute, state);
            }
        }
        self
    }
}

/// 当前进程内全部已加载论文的标注状态
#[derive(Debug, Clone)]
pub struct ResponseStore {
    schema: Arc<Schema>,
    papers: IndexMap<PaperKey, PaperState>,
}

impl ResponseStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            papers: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn contains(&self, paper: &str) -> bool {
        self.papers.contains_key(paper)
    }

    pub fn paper(&self, paper: &str) -> Option<&PaperState> {
        self.papers.get(paper)
    }

    /// 按加载顺序遍历已加载论文
    pub fn papers(&self) -> impl Iterator<Item = (&PaperKey, &PaperState)> {
        self.papers.iter()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// 首次加载论文时建立状态
    ///
    /// 已加载过的论文保持内存中的状态不变（`prior` 被忽略），
    /// 返回值表示本次是否新建
    pub fn open_paper(&mut self, paper: &Paper, prior: Option<PaperState>) -> bool {
        if self.papers.contains_key(&paper.key) {
            return false;
        }

        let mut state = PaperState::for_schema(paper.meta.clone(), &self.schema);
        if let Some(prior) = prior {
            state = state.overlay(prior);
        }
        // 元数据以当前分配表为准
        state.meta = paper.meta.clone();

        debug!("建立论文状态: {}", paper.key);
        self.papers.insert(paper.key.clone(), state);
        true
    }

    // ========== 选择操作 ==========

    /// 单选 / 下拉框：选择整体替换为 `[option]`
    pub fn set_selection_mode_replace(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        option: &str,
    ) -> AppResult<()> {
        self.checked_mode(question, attribute, "set_selection_mode_replace", |m| {
            m.replaces_wholesale()
        })?;
        self.checked_option(paper, question, attribute, option)?
            .selections
            .replace_with(option);
        Ok(())
    }

    /// 复选框：勾选追加，取消勾选移除
    ///
    /// 返回是否发生变化
    pub fn toggle_multi(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        option: &str,
        checked: bool,
    ) -> AppResult<bool> {
        self.checked_mode(question, attribute, "toggle_multi", |m| {
            m == SelectionMode::MultiChoice
        })?;
        let selections = &mut self
            .checked_option(paper, question, attribute, option)?
            .selections;
        Ok(if checked {
            selections.insert(option)
        } else {
            selections.remove(option)
        })
    }

    /// 顺序多选：追加（重复时不修改并返回 AlreadyPresent）
    pub fn add_sequential(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        option: &str,
    ) -> AppResult<SequentialAdd> {
        self.checked_mode(question, attribute, "add_sequential", |m| {
            m == SelectionMode::SequentialMulti
        })?;
        let selections = &mut self
            .checked_option(paper, question, attribute, option)?
            .selections;
        if selections.insert(option) {
            Ok(SequentialAdd::Added)
        } else {
            Ok(SequentialAdd::AlreadyPresent)
        }
    }

    /// 顺序多选：按值移除，返回是否存在
    pub fn remove_sequential(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        option: &str,
    ) -> AppResult<bool> {
        self.checked_mode(question, attribute, "remove_sequential", |m| {
            m == SelectionMode::SequentialMulti
        })?;
        Ok(self
            .checked_attribute(paper, question, attribute)?
            .selections
            .remove(option))
    }

    /// 下拉框选回占位项：清空选择与转义文本
    pub fn clear_selection(&mut self, paper: &str, question: &str, attribute: &str) -> AppResult<()> {
        self.checked_attribute(paper, question, attribute)?
            .selections
            .clear();
        Ok(())
    }

    // ========== 字段写入 ==========

    pub fn set_other_text(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        text: &str,
    ) -> AppResult<()> {
        self.checked_attribute(paper, question, attribute)?
            .selections
            .other_text = text.to_string();
        Ok(())
    }

    pub fn set_discussion_text(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        text: &str,
    ) -> AppResult<()> {
        self.checked_attribute(paper, question, attribute)?
            .selections
            .discussion_text = text.to_string();
        Ok(())
    }

    /// 关闭开关会清空其文本
    pub fn set_toggle_state(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        enabled: bool,
    ) -> AppResult<()> {
        self.checked_attribute(paper, question, attribute)?
            .toggle
            .set_enabled(enabled);
        Ok(())
    }

    pub fn set_toggle_text(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        text: &str,
    ) -> AppResult<()> {
        self.checked_attribute(paper, question, attribute)?.toggle.text = text.to_string();
        Ok(())
    }

    pub fn set_mandatory_text(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        text: &str,
    ) -> AppResult<()> {
        self.checked_attribute(paper, question, attribute)?.mandatory_text = text.to_string();
        Ok(())
    }

    pub fn set_excluded(&mut self, paper: &str, excluded: bool) -> AppResult<()> {
        self.checked_paper(paper)?.excluded = excluded;
        Ok(())
    }

    pub fn set_exclusion_reason(&mut self, paper: &str, reason: &str) -> AppResult<()> {
        self.checked_paper(paper)?.exclusion_reason = reason.to_string();
        Ok(())
    }

    /// 清空所有已加载论文的选择、转义文本、开关和必填文本
    ///
    /// 排除状态保持不变
    pub fn clear_all(&mut self) {
        for state in self.papers.values_mut() {
            for attribute in state.attributes_mut() {
                attribute.clear();
            }
        }
    }

    // ========== 键校验 ==========

    fn checked_paper(&mut self, paper: &str) -> AppResult<&mut PaperState> {
        self.papers
            .get_mut(paper)
            .ok_or_else(|| SchemaError::UnknownPaper {
                paper: paper.to_string(),
            })
            .map_err(Into::into)
    }

    fn checked_spec(&self, question: &str, attribute: &str) -> AppResult<&AttributeSpec> {
        let attrs = self
            .schema
            .question(question)
            .ok_or_else(|| SchemaError::UnknownQuestion {
                question: question.to_string(),
            })?;
        attrs.get(attribute).ok_or_else(|| {
            SchemaError::UnknownAttribute {
                question: question.to_string(),
                attribute: attribute.to_string(),
            }
            .into()
        })
    }

    /// 操作必须与属性的选择模式一致
    fn checked_mode(
        &self,
        question: &str,
        attribute: &str,
        operation: &'static str,
        allowed: fn(SelectionMode) -> bool,
    ) -> AppResult<()> {
        let mode = self.checked_spec(question, attribute)?.selection_mode;
        if allowed(mode) {
            return Ok(());
        }
        Err(SchemaError::SelectionModeMismatch {
            question: question.to_string(),
            attribute: attribute.to_string(),
            mode,
            operation,
        }
        .into())
    }

    fn checked_attribute(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
    ) -> AppResult<&mut AttributeState> {
        self.checked_spec(question, attribute)?;
        Ok(self.checked_paper(paper)?.attribute_entry(question, attribute))
    }

    fn checked_option(
        &mut self,
        paper: &str,
        question: &str,
        attribute: &str,
        option: &str,
    ) -> AppResult<&mut AttributeState> {
        if !self.checked_spec(question, attribute)?.has_option(option) {
            return Err(SchemaError::UnknownOption {
                question: question.to_string(),
                attribute: attribute.to_string(),
                option: option.to_string(),
            }
            .into());
        }
        self.checked_attribute(paper, question, attribute)
    }
}
