//! 流程层（Workflow）
//!
//! 定义"一篇论文"从加载到完成的完整流程

pub mod annotation_session;
pub mod progress_tracker;

pub use annotation_session::{AnnotationSession, FinishOutcome};
pub use progress_tracker::{scan_resume_index, ProgressState, ProgressTracker};
