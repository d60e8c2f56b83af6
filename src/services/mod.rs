pub mod export_codec;
pub mod sanity_check;
pub mod session_marker;
pub mod validator;

pub use export_codec::{ExportCodec, ExportSummary, LiveTextSource, NoLiveText, PersistedStore};
pub use sanity_check::{NoSanityChecks, SanityChecker, SanityGate, SanityResult};
pub use session_marker::{SessionMarker, SessionMarkerDoc};
pub use validator::{validate, validate_record, validate_with_live, Violation};
