pub mod loaders;
pub mod paper;
pub mod record;
pub mod schema;

pub use loaders::{load_assigned_papers, load_schema};
pub use paper::{Paper, PaperKey, PaperMeta};
pub use record::{PaperRecordDoc, QuestionMap, ToggleEntry};
pub use schema::{AttributeSpec, MandatoryTextField, Schema, SelectionMode, ToggleOption};
