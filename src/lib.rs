//! # Paper Annotator
//!
//! 文献综述数据提取的标注核心：按研究问题定义记录每篇论文的回答，
//! 合并写入导出文件，并支持中断后恢复
//!
//! ## 架构设计
//!
//! ### ① 数据层（Models）
//! - `models/` - 研究问题定义、论文元数据、导出记录格式及其加载
//!
//! ### ② 状态层（Store）
//! - `store/` - 当前会话内全部论文的标注状态和修改规则，不做 I/O
//! - `ResponseStore` - 论文 → 问题 → 属性 → 选择 / 文本
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ExportCodec` - 编码 / 解码 / 合并写入导出文件
//! - `validator` - 完整性校验
//! - `SessionMarker` - 会话标记读写
//! - `SanityGate` - 外部合理性检查接口
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一篇论文"的完整流程
//! - `ProgressTracker` - 恢复位置计算
//! - `AnnotationSession` - 加载 → 标注 → 校验 → 导出 → 前进
//!
//! ### ⑤ 编排层
//! - `app` - 无界面运行器：恢复位置 + 进度审计

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Paper, PaperMeta, Schema};
pub use services::{ExportCodec, SanityGate, SessionMarker, Violation};
pub use store::ResponseStore;
pub use workflow::{AnnotationSession, FinishOutcome, ProgressState, ProgressTracker};
