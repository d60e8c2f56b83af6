//! 标注会话 - 流程层
//!
//! 核心职责：把"一篇论文"的完整流程串起来
//!
//! 流程顺序：
//! 1. 启动：进度跟踪器确定恢复位置 → 从导出文件解码该论文之前的记录
//! 2. 标注：表现层通过 `store_mut()` 修改状态
//! 3. 完成：完整性校验 → 合并导出 → 外部合理性检查 → 前进到下一篇
//! 4. 每次成功加载论文后覆盖会话标记

use crate::config::Config;
use crate::error::{AppResult, BusinessError};
use crate::models::paper::Paper;
use crate::models::schema::Schema;
use crate::services::export_codec::{ExportCodec, ExportSummary, LiveTextSource, NoLiveText};
use crate::services::sanity_check::SanityGate;
use crate::services::session_marker::SessionMarker;
use crate::services::validator::{validate_with_live, Violation};
use crate::store::ResponseStore;
use crate::utils::logging::truncate_text;
use crate::workflow::progress_tracker::{ProgressState, ProgressTracker};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// 完成论文的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// 本地完整性校验未通过，未导出
    Incomplete(Vec<Violation>),
    /// 已导出，但外部合理性检查未通过
    SanityViolations(Vec<String>),
    /// 已完成并前进
    Advanced(ProgressState),
}

/// 标注会话
///
/// 持有本次进程内的全部标注状态
pub struct AnnotationSession {
    schema: Arc<Schema>,
    store: ResponseStore,
    codec: ExportCodec,
    tracker: ProgressTracker,
    gate: SanityGate,
    live: Box<dyn LiveTextSource>,
    current: Option<usize>,
}

impl AnnotationSession {
    pub fn new(
        schema: Arc<Schema>,
        tracker: ProgressTracker,
        codec: ExportCodec,
        gate: SanityGate,
    ) -> Self {
        Self {
            store: ResponseStore::new(schema.clone()),
            schema,
            codec,
            tracker,
            gate,
            live: Box::new(NoLiveText),
            current: None,
        }
    }

    /// 按配置中的文件路径创建会话
    pub fn from_config(
        config: &Config,
        schema: Arc<Schema>,
        papers: Vec<Paper>,
        gate: SanityGate,
    ) -> Self {
        let codec = ExportCodec::new(&config.export_file);
        let tracker = ProgressTracker::new(
            config.user.clone(),
            papers,
            codec.clone(),
            SessionMarker::new(&config.session_file),
        );
        Self::new(schema, tracker, codec, gate)
    }

    /// 设置讨论文本的实时来源
    pub fn with_live_text(mut self, live: Box<dyn LiveTextSource>) -> Self {
        self.live = live;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &ResponseStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ResponseStore {
        &mut self.store
    }

    pub fn codec(&self) -> &ExportCodec {
        &self.codec
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn state(&self) -> ProgressState {
        self.tracker.state()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_paper(&self) -> Option<&Paper> {
        self.tracker.paper(self.current?)
    }

    /// 启动：恢复到上次的位置
    pub async fn start(&mut self) -> AppResult<ProgressState> {
        let state = self.tracker.resume().await;
        match state.index() {
            Some(index) => self.open_at(index).await?,
            None => info!("🎉 所有论文均已处理"),
        }
        Ok(state)
    }

    /// 加载指定索引的论文（越界表示全部完成）
    pub async fn load_paper(&mut self, index: usize) -> AppResult<ProgressState> {
        let state = self.tracker.advance_to(index);
        match state.index() {
            Some(index) => self.open_at(index).await?,
            None => {
                self.current = None;
                info!("🎉 所有论文均已处理");
            }
        }
        Ok(state)
    }

    /// 跳转到之前完成的论文
    pub async fn jump_to(&mut self, key: &str) -> AppResult<ProgressState> {
        let index = self
            .tracker
            .index_of(key)
            .ok_or_else(|| BusinessError::PaperNotFound {
                paper: key.to_string(),
            })?;
        self.load_paper(index).await
    }

    /// 可以返回的论文列表
    pub async fn go_back_candidates(&self) -> Vec<Paper> {
        self.tracker.finished_papers().await
    }

    /// 校验当前论文（讨论文本与导出使用同一实时来源）
    pub fn validate_current(&self) -> AppResult<Vec<Violation>> {
        let paper = self.current_paper().ok_or(BusinessError::NoActivePaper)?;
        let state = self
            .store
            .paper(&paper.key)
            .ok_or(BusinessError::NoActivePaper)?;
        Ok(validate_with_live(
            &paper.key,
            state,
            &self.schema,
            self.live.as_ref(),
        ))
    }

    /// 合并导出全部已加载论文
    pub async fn export(&self) -> AppResult<ExportSummary> {
        self.codec.export(&self.store, self.live.as_ref()).await
    }

    /// 完成当前论文并前进
    ///
    /// 已排除的论文跳过校验和合理性检查；导出失败或合理性检查出错时返回错误，不前进
    pub async fn finish_paper(&mut self) -> AppResult<FinishOutcome> {
        let index = self.current.ok_or(BusinessError::NoActivePaper)?;
        let key = self
            .tracker
            .paper(index)
            .map(|p| p.key.clone())
            .ok_or(BusinessError::IndexOutOfRange {
                index,
                len: self.tracker.papers().len(),
            })?;
        let exclusion = self
            .store
            .paper(&key)
            .filter(|s| s.excluded)
            .map(|s| s.exclusion_reason.clone());

        if let Some(reason) = exclusion {
            self.export().await?;
            info!(
                "[论文 {}] 已排除 ({})，直接进入下一篇",
                key,
                truncate_text(&reason, 40)
            );
            let next = self.load_paper(index + 1).await?;
            return Ok(FinishOutcome::Advanced(next));
        }

        let violations = self.validate_current()?;
        if !violations.is_empty() {
            warn!("[论文 {}] ⚠️ 还有 {} 项未完成", key, violations.len());
            return Ok(FinishOutcome::Incomplete(violations));
        }

        self.export().await?;

        // 合理性检查针对刚写入的记录
        let record = self
            .codec
            .read_store()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_else(|| json!({}));
        let sanity = self.gate.check(&key, &record)?;
        if !sanity.is_empty() {
            return Ok(FinishOutcome::SanityViolations(sanity));
        }

        info!("[论文 {}] ✓ 已完成", key);
        let next = self.load_paper(index + 1).await?;
        Ok(FinishOutcome::Advanced(next))
    }

    /// 退出：导出并记录当前位置
    pub async fn close(&self) -> AppResult<ExportSummary> {
        let summary = self.export().await?;
        if let Some(index) = self.current {
            self.save_position(index).await;
        }
        Ok(summary)
    }

    /// 打开论文：首次加载时解码之前的记录，然后更新会话标记
    async fn open_at(&mut self, index: usize) -> AppResult<()> {
        let paper = self
            .tracker
            .paper(index)
            .cloned()
            .ok_or(BusinessError::IndexOutOfRange {
                index,
                len: self.tracker.papers().len(),
            })?;

        if !self.store.contains(&paper.key) {
            let prior = self.codec.load_prior_state(&paper.key).await;
            if prior.is_some() {
                info!("📂 载入论文 {} 之前保存的进度", paper.key);
            }
            self.store.open_paper(&paper, prior);
        }

        self.current = Some(index);
        info!(
            "📄 论文 {} / {}: {}",
            index + 1,
            self.tracker.papers().len(),
            paper
        );
        self.save_position(index).await;
        Ok(())
    }

    /// 会话标记只用于恢复，写入失败不影响标注
    async fn save_position(&self, index: usize) {
        if let Err(e) = self.tracker.record_position(index).await {
            warn!("⚠️ {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, FinishError};
    use crate::models::loaders::parse_schema;
    use crate::models::paper::PaperMeta;
    use crate::services::sanity_check::SanityResult;
    use crate::store::AttributeKey;
    use std::collections::HashMap;
    use serde_json::Value as JsonValue;
    use std::path::Path;
    use tempfile::TempDir;

    fn session_in(dir: &TempDir, gate: SanityGate) -> AnnotationSession {
        let schema = parse_schema(r#"{"RQ1": {"Category": ["Option A", "Other"]}}"#).unwrap();
        let papers = vec![
            Paper::new("P1", PaperMeta::default()),
            Paper::new("P2", PaperMeta::default()),
        ];
        let codec = ExportCodec::new(dir.path().join("export.json"));
        let tracker = ProgressTracker::new(
            "Moritz",
            papers,
            codec.clone(),
            SessionMarker::new(dir.path().join(".session.json")),
        );
        AnnotationSession::new(Arc::new(schema), tracker, codec, gate)
    }

    #[tokio::test]
    async fn test_incomplete_paper_is_not_exported() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, SanityGate::default());
        assert_eq!(session.start().await.unwrap(), ProgressState::Resumed(0));

        let outcome = session.finish_paper().await.unwrap();
        assert!(matches!(outcome, FinishOutcome::Incomplete(ref v) if v.len() == 1));
        assert!(!dir.path().join("export.json").exists());
        assert_eq!(session.current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_finish_advances_and_records_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, SanityGate::default());
        session.start().await.unwrap();
        session
            .store_mut()
            .toggle_multi("P1", "RQ1", "Category", "Option A", true)
            .unwrap();

        let outcome = session.finish_paper().await.unwrap();
        assert_eq!(outcome, FinishOutcome::Advanced(ProgressState::Advancing(1)));
        assert_eq!(session.current_paper().unwrap().key, "P2");

        let marker = SessionMarker::new(dir.path().join(".session.json"))
            .read()
            .await
            .unwrap();
        assert_eq!(marker.current_paper_index, 1);
        assert_eq!(marker.current_paper_key.as_deref(), Some("P2"));
    }

    #[tokio::test]
    async fn test_excluded_paper_skips_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, SanityGate::default());
        session.start().await.unwrap();
        session.store_mut().set_excluded("P1", true).unwrap();
        session
            .store_mut()
            .set_exclusion_reason("P1", "no full text")
            .unwrap();

        let outcome = session.finish_paper().await.unwrap();
        assert_eq!(outcome, FinishOutcome::Advanced(ProgressState::Advancing(1)));

        let record = ExportCodec::new(dir.path().join("export.json"))
            .read_record("P1")
            .await
            .unwrap();
        assert!(record.excluded_from_full_text_review);
        assert_eq!(record.exclusion_reason, "no full text");
    }

    #[tokio::test]
    async fn test_sanity_error_blocks_finishing() {
        let dir = tempfile::tempdir().unwrap();
        let checker = |_: &JsonValue, _: &Path| -> SanityResult { Err("boom".into()) };
        let mut session = session_in(&dir, SanityGate::new(Box::new(checker), "sanity_checks.json"));
        session.start().await.unwrap();
        session
            .store_mut()
            .toggle_multi("P1", "RQ1", "Category", "Option A", true)
            .unwrap();

        let err = session.finish_paper().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Finish(FinishError::SanityCheckError { .. })
        ));
        assert_eq!(session.current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_sanity_violations_block_finishing() {
        let dir = tempfile::tempdir().unwrap();
        let checker = |record: &JsonValue, _: &Path| -> SanityResult {
            let answers = &record["responses"]["RQ1"]["Category"];
            if answers == &serde_json::json!(["Underspecified"]) {
                Ok(vec!["Category must be specified".to_string()])
            } else {
                Ok(vec![])
            }
        };
        let mut session = session_in(&dir, SanityGate::new(Box::new(checker), "sanity_checks.json"));
        session.start().await.unwrap();
        session
            .store_mut()
            .toggle_multi("P1", "RQ1", "Category", "Underspecified", true)
            .unwrap();

        let outcome = session.finish_paper().await.unwrap();
        assert_eq!(
            outcome,
            FinishOutcome::SanityViolations(vec!["Category must be specified".to_string()])
        );
        assert_eq!(session.current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_last_paper_finishes_all_complete_and_jump_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, SanityGate::default());
        session.start().await.unwrap();
        for key in ["P1", "P2"] {
            session
                .store_mut()
                .toggle_multi(key, "RQ1", "Category", "Option A", true)
                .unwrap();
            session.finish_paper().await.unwrap();
        }
        assert_eq!(session.state(), ProgressState::AllComplete);
        assert!(session.current_paper().is_none());

        let candidates: Vec<_> = session
            .go_back_candidates()
            .await
            .into_iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(candidates, vec!["P1", "P2"]);

        assert_eq!(
            session.jump_to("P1").await.unwrap(),
            ProgressState::Advancing(0)
        );
        assert!(session.jump_to("P9").await.is_err());
    }

    #[tokio::test]
    async fn test_live_discussion_text_satisfies_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut live = HashMap::new();
        live.insert(
            AttributeKey::new("P1", "RQ1", "Category"),
            "typed in box".to_string(),
        );
        let mut session =
            session_in(&dir, SanityGate::default()).with_live_text(Box::new(live));
        session.start().await.unwrap();
        session
            .store_mut()
            .toggle_multi("P1", "RQ1", "Category", "Discussion needed", true)
            .unwrap();

        assert!(session.validate_current().unwrap().is_empty());
        let outcome = session.finish_paper().await.unwrap();
        assert_eq!(outcome, FinishOutcome::Advanced(ProgressState::Advancing(1)));

        let record = ExportCodec::new(dir.path().join("export.json"))
            .read_record("P1")
            .await
            .unwrap();
        assert_eq!(
            record.responses["RQ1"]["Category"],
            vec!["Discussion needed: typed in box".to_string()]
        );
    }

    #[tokio::test]
    async fn test_finish_without_active_paper() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(&dir, SanityGate::default());
        let err = session.finish_paper().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Business(BusinessError::NoActivePaper)
        ));
    }
}
