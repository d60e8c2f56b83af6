//! 无界面运行器 - 编排层
//!
//! 加载配置、问题定义和论文列表，计算恢复位置，
//! 并用完整性校验审计导出文件中当前标注者的全部记录

use crate::config::Config;
use crate::models::loaders::{load_assigned_papers, load_schema};
use crate::services::export_codec::parse_record;
use crate::services::sanity_check::{NoSanityChecks, SanityChecker, SanityGate};
use crate::services::validator::validate_record;
use crate::utils::logging::{log_progress_summary, log_resume, log_startup, truncate_text};
use crate::workflow::AnnotationSession;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 审计统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AuditStats {
    pub total: usize,
    pub processed: usize,
    pub excluded: usize,
    pub incomplete: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    session: AnnotationSession,
}

impl App {
    /// 初始化应用（不做合理性检查）
    pub async fn initialize(config: Config) -> Result<Self> {
        Self::with_sanity_checker(config, Box::new(NoSanityChecks)).await
    }

    /// 初始化应用并指定合理性检查实现
    pub async fn with_sanity_checker(
        config: Config,
        checker: Box<dyn SanityChecker>,
    ) -> Result<Self> {
        log_startup(&config);

        let schema = load_schema(&config.schema_file).await?;
        info!("✓ 载入 {} 个研究问题", schema.question_count());

        let papers = load_assigned_papers(&config.papers_csv, &config.user).await?;
        info!("✓ 分配给 {} 的论文: {} 篇", config.user, papers.len());

        let gate = SanityGate::new(checker, &config.sanity_checks_file);
        let session = AnnotationSession::from_config(&config, Arc::new(schema), papers, gate);

        Ok(Self { config, session })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &AnnotationSession {
        &self.session
    }

    pub fn into_session(self) -> AnnotationSession {
        self.session
    }

    /// 运行应用主逻辑：恢复位置并输出进度统计
    pub async fn run(mut self) -> Result<AuditStats> {
        let state = self.session.start().await?;
        log_resume(state, self.session.tracker().papers().len());

        let stats = self.audit().await;
        log_progress_summary(stats.processed, stats.incomplete, stats.total);

        Ok(stats)
    }

    /// 逐篇检查导出文件中的记录
    pub async fn audit(&self) -> AuditStats {
        let papers = self.session.tracker().papers();
        let mut stats = AuditStats {
            total: papers.len(),
            ..Default::default()
        };

        if !self.session.codec().exists().await {
            return stats;
        }

        let store = self.session.codec().read_store().await;
        for paper in papers {
            let Some(doc) = store
                .get(&paper.key)
                .and_then(|value| parse_record(&paper.key, value))
            else {
                continue;
            };
            if !doc.is_processed() {
                continue;
            }

            stats.processed += 1;
            if doc.excluded_from_full_text_review {
                stats.excluded += 1;
                debug!(
                    "[论文 {}] 已排除: {}",
                    paper.key,
                    truncate_text(&doc.exclusion_reason, 40)
                );
                continue;
            }

            let violations = validate_record(&doc, self.session.schema());
            if !violations.is_empty() {
                stats.incomplete += 1;
                warn!("[论文 {}] ⚠️ {} 项未完成", paper.key, violations.len());
                for violation in &violations {
                    warn!("  - {}", violation);
                }
            }
        }

        stats
    }
}
