//! 状态层（State）
//!
//! 持有当前会话内全部论文的标注状态，只描述状态及其修改规则，不做 I/O

pub mod response_store;
pub mod selection;

pub use response_store::{PaperState, ResponseStore, SequentialAdd};
pub use selection::{AttributeKey, AttributeState, SelectionSet, ToggleState};
