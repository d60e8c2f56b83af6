//! 完整性校验 - 业务能力层
//!
//! 纯函数：给定单篇论文的状态与研究问题定义，收集全部缺失项（不短路）。
//! 已排除的论文不做任何属性级校验

use crate::models::record::PaperRecordDoc;
use crate::models::schema::{Schema, DISCUSSION_NEEDED};
use crate::services::export_codec::{decode_record, LiveTextSource, NoLiveText};
use crate::store::{AttributeKey, PaperState};
use std::fmt::Display;

/// 单条缺失项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// 属性没有任何选择
    MissingSelection { question: String, attribute: String },
    /// 选择了 `Discussion needed` 但没有讨论文本
    MissingDiscussionText { question: String, attribute: String },
    /// 属性有选择但必填文本为空
    MissingMandatoryText {
        question: String,
        attribute: String,
        field_label: String,
    },
}

impl Violation {
    pub fn question(&self) -> &str {
        match self {
            Violation::MissingSelection { question, .. }
            | Violation::MissingDiscussionText { question, .. }
            | Violation::MissingMandatoryText { question, .. } => question,
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            Violation::MissingSelection { attribute, .. }
            | Violation::MissingDiscussionText { attribute, .. }
            | Violation::MissingMandatoryText { attribute, .. } => attribute,
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::MissingSelection {
                question,
                attribute,
            } => write!(
                f,
                "请至少选择一项 (Research Question: {}, Category: {})",
                question, attribute
            ),
            Violation::MissingDiscussionText {
                question,
                attribute,
            } => write!(
                f,
                "已选择 'Discussion needed'，请填写讨论说明 (Research Question: {}, Category: {})",
                question, attribute
            ),
            Violation::MissingMandatoryText {
                question,
                attribute,
                field_label,
            } => write!(
                f,
                "请填写: {} (Research Question: {}, Category: {})",
                field_label, question, attribute
            ),
        }
    }
}

/// 校验单篇论文的内存状态
pub fn validate(state: &PaperState, schema: &Schema) -> Vec<Violation> {
    validate_with_live("", state, schema, &NoLiveText)
}

/// 校验单篇论文，讨论文本为空时与编码一样回退到实时来源
pub fn validate_with_live(
    paper: &str,
    state: &PaperState,
    schema: &Schema,
    live: &dyn LiveTextSource,
) -> Vec<Violation> {
    if state.excluded {
        return Vec::new();
    }

    let mut violations = Vec::new();
    for (question, attribute, spec) in schema.attributes() {
        let attr_state = state.attribute(question, attribute);
        let selections = attr_state.map(|s| &s.selections);
        let has_selection = selections.is_some_and(|s| !s.is_empty());

        if !has_selection {
            violations.push(Violation::MissingSelection {
                question: question.to_string(),
                attribute: attribute.to_string(),
            });
        }

        if let Some(selections) = selections {
            if selections.contains(DISCUSSION_NEEDED) {
                let discussion = if selections.discussion_text.is_empty() {
                    live.discussion_text(&AttributeKey::new(paper, question, attribute))
                        .unwrap_or_default()
                } else {
                    selections.discussion_text.clone()
                };
                if discussion.trim().is_empty() {
                    violations.push(Violation::MissingDiscussionText {
                        question: question.to_string(),
                        attribute: attribute.to_string(),
                    });
                }
            }
        }

        if let Some(field) = &spec.mandatory_text_field {
            let text = attr_state.map(|s| s.mandatory_text.trim()).unwrap_or_default();
            if has_selection && text.is_empty() {
                violations.push(Violation::MissingMandatoryText {
                    question: question.to_string(),
                    attribute: attribute.to_string(),
                    field_label: field.label.clone(),
                });
            }
        }
    }

    violations
}

/// 校验导出文件中的一条记录
pub fn validate_record(doc: &PaperRecordDoc, schema: &Schema) -> Vec<Violation> {
    validate(&decode_record(doc.clone()), schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::loaders::parse_schema;
    use crate::models::paper::{Paper, PaperMeta};
    use crate::store::ResponseStore;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn test_store() -> ResponseStore {
        let schema = parse_schema(
            r#"{
                "RQ1": {
                    "Category": ["Option A", "Other"],
                    "Method": {
                        "options": ["Survey", "Interview"],
                        "mandatory_text_field": {"enabled": true, "label": "Page reference"}
                    }
                },
                "RQ2": {"Scope": ["X", "Y"]}
            }"#,
        )
        .unwrap();
        let mut store = ResponseStore::new(Arc::new(schema));
        store.open_paper(&Paper::new("P1", PaperMeta::default()), None);
        store
    }

    fn check(store: &ResponseStore) -> Vec<Violation> {
        validate(store.paper("P1").unwrap(), store.schema())
    }

    #[test]
    fn test_every_empty_attribute_is_reported() {
        let store = test_store();
        let violations = check(&store);
        assert_eq!(violations.len(), 3);
        assert!(violations
            .iter()
            .all(|v| matches!(v, Violation::MissingSelection { .. })));
        assert_eq!(violations[2].question(), "RQ2");
        assert_eq!(violations[2].attribute(), "Scope");
    }

    #[test]
    fn test_excluded_paper_has_no_violations() {
        let mut store = test_store();
        store.set_excluded("P1", true).unwrap();
        assert!(check(&store).is_empty());
    }

    #[test]
    fn test_discussion_text_required() {
        let mut store = test_store();
        store
            .toggle_multi("P1", "RQ1", "Category", "Discussion needed", true)
            .unwrap();
        store
            .toggle_multi("P1", "RQ1", "Method", "Survey", true)
            .unwrap();
        store.set_mandatory_text("P1", "RQ1", "Method", "p. 3").unwrap();
        store.toggle_multi("P1", "RQ2", "Scope", "X", true).unwrap();

        assert_eq!(
            check(&store),
            vec![Violation::MissingDiscussionText {
                question: "RQ1".to_string(),
                attribute: "Category".to_string(),
            }]
        );

        store
            .set_discussion_text("P1", "RQ1", "Category", "   ")
            .unwrap();
        assert_eq!(check(&store).len(), 1);

        store
            .set_discussion_text("P1", "RQ1", "Category", "ambiguous")
            .unwrap();
        assert!(check(&store).is_empty());
    }

    #[test]
    fn test_mandatory_text_only_required_with_selection() {
        let mut store = test_store();
        let violations = check(&store);
        assert!(!violations
            .iter()
            .any(|v| matches!(v, Violation::MissingMandatoryText { .. })));

        store
            .toggle_multi("P1", "RQ1", "Method", "Interview", true)
            .unwrap();
        let violations = check(&store);
        let missing = violations
            .iter()
            .find(|v| matches!(v, Violation::MissingMandatoryText { .. }))
            .unwrap();
        assert!(missing.to_string().contains("Page reference"));

        store.set_mandatory_text("P1", "RQ1", "Method", "p. 9").unwrap();
        assert!(!check(&store)
            .iter()
            .any(|v| matches!(v, Violation::MissingMandatoryText { .. })));
    }

    #[test]
    fn test_fixing_one_violation_leaves_others() {
        let mut store = test_store();
        store
            .toggle_multi("P1", "RQ1", "Category", "Discussion needed", true)
            .unwrap();
        let before = check(&store);
        assert!(before.contains(&Violation::MissingDiscussionText {
            question: "RQ1".to_string(),
            attribute: "Category".to_string(),
        }));

        store
            .set_discussion_text("P1", "RQ1", "Category", "needs team call")
            .unwrap();
        let after = check(&store);
        assert_eq!(after.len(), before.len() - 1);
        assert!(after
            .iter()
            .all(|v| !matches!(v, Violation::MissingDiscussionText { .. })));
    }

    #[test]
    fn test_discussion_text_from_live_source() {
        let mut store = test_store();
        store
            .toggle_multi("P1", "RQ1", "Category", "Discussion needed", true)
            .unwrap();
        let state = store.paper("P1").unwrap();
        let missing = Violation::MissingDiscussionText {
            question: "RQ1".to_string(),
            attribute: "Category".to_string(),
        };
        assert!(validate(state, store.schema()).contains(&missing));

        let mut live = HashMap::new();
        live.insert(
            AttributeKey::new("P1", "RQ1", "Category"),
            "typed in box".to_string(),
        );
        assert!(!validate_with_live("P1", state, store.schema(), &live).contains(&missing));
        assert!(validate_with_live("P2", state, store.schema(), &live).contains(&missing));
    }

    #[test]
    fn test_validate_persisted_record() {
        let schema = parse_schema(r#"{"RQ1": {"Category": ["Option A", "Other"]}}"#).unwrap();
        let doc: PaperRecordDoc = serde_json::from_str(
            r#"{"responses": {"RQ1": {"Category": ["Discussion needed: why"]}}}"#,
        )
        .unwrap();
        assert!(validate_record(&doc, &schema).is_empty());

        let doc: PaperRecordDoc =
            serde_json::from_str(r#"{"responses": {"RQ1": {"Category": []}}}"#).unwrap();
        assert_eq!(validate_record(&doc, &schema).len(), 1);
    }
}
