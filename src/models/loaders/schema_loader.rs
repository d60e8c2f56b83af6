use crate::error::{AppError, AppResult, FileError};
use crate::models::schema::{AttributeSpec, MandatoryTextField, Schema, ToggleOption};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

const DEFAULT_MANDATORY_LABEL: &str = "Additional information";

/// 定义文件中单个属性的原始形态
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAttribute {
    /// 旧格式：纯选项列表
    Plain(Vec<String>),
    /// 新格式：带开关 / 必填文本配置
    Detailed {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        toggle_option: Option<RawToggle>,
        #[serde(default)]
        mandatory_text_field: Option<RawMandatoryText>,
    },
}

#[derive(Debug, Deserialize)]
struct RawToggle {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    label: String,
}

#[derive(Debug, Deserialize)]
struct RawMandatoryText {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    placeholder: String,
}

impl From<RawAttribute> for AttributeSpec {
    fn from(raw: RawAttribute) -> Self {
        match raw {
            RawAttribute::Plain(options) => AttributeSpec::from_raw_options(&options),
            RawAttribute::Detailed {
                options,
                toggle_option,
                mandatory_text_field,
            } => {
                // enabled=false 的配置视为不存在
                let toggle = toggle_option
                    .filter(|t| t.enabled)
                    .map(|t| ToggleOption { label: t.label });
                let mandatory = mandatory_text_field.filter(|m| m.enabled).map(|m| {
                    MandatoryTextField {
                        label: m
                            .label
                            .unwrap_or_else(|| DEFAULT_MANDATORY_LABEL.to_string()),
                        placeholder: m.placeholder,
                    }
                });
                AttributeSpec::from_raw_options(&options)
                    .with_toggle(toggle)
                    .with_mandatory_text(mandatory)
            }
        }
    }
}

/// 从 JSON 文本解析研究问题定义
pub fn parse_schema(content: &str) -> Result<Schema, serde_json::Error> {
    let raw: IndexMap<String, IndexMap<String, RawAttribute>> = serde_json::from_str(content)?;

    let questions = raw
        .into_iter()
        .map(|(question, attrs)| {
            let attrs = attrs
                .into_iter()
                .map(|(attribute, raw)| (attribute, AttributeSpec::from(raw)))
                .collect();
            (question, attrs)
        })
        .collect();

    Ok(Schema::new(questions))
}

/// 从 JSON 文件加载研究问题定义
pub async fn load_schema(path: &Path) -> AppResult<Schema> {
    let path_str = path.display().to_string();

    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(FileError::NotFound { path: path_str }.into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let schema = parse_schema(&content).map_err(|e| FileError::JsonParseFailed {
        path: path_str.clone(),
        source: Box::new(e),
    })?;

    tracing::info!(
        "成功加载研究问题定义: {} 个问题, {} 个属性",
        schema.question_count(),
        schema.attributes().count()
    );

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::SelectionMode;

    #[test]
    fn test_parse_legacy_and_detailed_shapes() {
        let schema = parse_schema(
            r#"{
                "RQ1": {
                    "Category": ["Option A", "Other"],
                    "Method": {
                        "options": ["single-choice", "Survey", "Interview"],
                        "toggle_option": {"enabled": true, "label": "Replicated?"},
                        "mandatory_text_field": {"enabled": true, "placeholder": "page"}
                    }
                },
                "RQ2": {
                    "Scope": {
                        "options": ["Multiple", "X", "Y"],
                        "toggle_option": {"enabled": false, "label": "ignored"},
                        "mandatory_text_field": {"enabled": false, "label": "ignored"}
                    }
                }
            }"#,
        )
        .unwrap();

        let keys: Vec<_> = schema.questions().map(|(q, _)| q.as_str()).collect();
        assert_eq!(keys, vec!["RQ1", "RQ2"]);

        let category = schema.attribute("RQ1", "Category").unwrap();
        assert!(category.other_escape);
        assert_eq!(category.selection_mode, SelectionMode::MultiChoice);

        let method = schema.attribute("RQ1", "Method").unwrap();
        assert_eq!(method.selection_mode, SelectionMode::SingleChoice);
        assert_eq!(method.toggle_option.as_ref().unwrap().label, "Replicated?");
        let mandatory = method.mandatory_text_field.as_ref().unwrap();
        assert_eq!(mandatory.label, "Additional information");
        assert_eq!(mandatory.placeholder, "page");

        let scope = schema.attribute("RQ2", "Scope").unwrap();
        assert_eq!(scope.selection_mode, SelectionMode::SequentialMulti);
        assert!(scope.toggle_option.is_none());
        assert!(scope.mandatory_text_field.is_none());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_schema("[1, 2, 3]").is_err());
    }

    #[tokio::test]
    async fn test_load_schema_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_schema(&dir.path().join("data-items.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::File(FileError::NotFound { .. })));
    }
}
