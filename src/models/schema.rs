//! 研究问题定义（Schema）
//!
//! question_key → attribute_name → AttributeSpec，顺序与定义文件一致

use indexmap::IndexMap;
use phf::phf_set;

/// "Other" 选项，需要附带自由文本
pub const OTHER: &str = "Other";
/// 每个属性自动追加的 "Discussion needed" 选项，需要附带讨论文本
pub const DISCUSSION_NEEDED: &str = "Discussion needed";
/// 每个属性自动追加的 "Underspecified" 选项
pub const UNDERSPECIFIED: &str = "Underspecified";

/// 单选标记
pub const SINGLE_CHOICE_MARKER: &str = "single-choice";
/// 顺序多选标记
pub const MULTIPLE_MARKER: &str = "Multiple";

/// 超过这个数量的选项使用下拉框（单选替换语义）
pub const DROPDOWN_THRESHOLD: usize = 10;

/// 定义文件中只用于控制布局、不作为选项展示的标记
static LAYOUT_MARKERS: phf::Set<&'static str> = phf_set! {
    "single-choice",
    "Multiple",
};

/// 判断是否为布局标记
pub fn is_layout_marker(option: &str) -> bool {
    LAYOUT_MARKERS.contains(option)
}

/// 选择模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// 单选按钮：每次选择整体替换
    SingleChoice,
    /// 下拉框：每次选择整体替换，占位项清空
    Dropdown,
    /// 复选框：逐个添加 / 移除
    MultiChoice,
    /// 顺序多选：追加（去重）/ 按值移除
    SequentialMulti,
}

impl SelectionMode {
    /// 是否为整体替换语义
    pub fn replaces_wholesale(self) -> bool {
        matches!(self, SelectionMode::SingleChoice | SelectionMode::Dropdown)
    }
}

/// 附加开关（与主选择相互独立）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOption {
    pub label: String,
}

/// 必填文本字段：属性有任意选择时必须填写
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandatoryTextField {
    pub label: String,
    pub placeholder: String,
}

/// 单个属性的定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    /// 展示用选项（已去掉标记，已追加合成选项）
    pub options: Vec<String>,
    pub selection_mode: SelectionMode,
    /// 原始选项中是否包含 "Other"
    pub other_escape: bool,
    pub toggle_option: Option<ToggleOption>,
    pub mandatory_text_field: Option<MandatoryTextField>,
}

impl AttributeSpec {
    /// 从原始选项列表构建
    ///
    /// 去掉布局标记，追加 `Underspecified` 与 `Discussion needed`，
    /// 并按原始标记推导选择模式
    pub fn from_raw_options(raw: &[String]) -> Self {
        let is_single_choice = raw.iter().any(|o| o == SINGLE_CHOICE_MARKER);
        let is_multiple = raw.iter().any(|o| o == MULTIPLE_MARKER);

        let mut options: Vec<String> = raw
            .iter()
            .filter(|o| !is_layout_marker(o))
            .cloned()
            .collect();
        options.push(UNDERSPECIFIED.to_string());
        if !options.iter().any(|o| o == DISCUSSION_NEEDED) {
            options.push(DISCUSSION_NEEDED.to_string());
        }

        let selection_mode = if is_multiple {
            SelectionMode::SequentialMulti
        } else if options.len() > DROPDOWN_THRESHOLD {
            SelectionMode::Dropdown
        } else if is_single_choice {
            SelectionMode::SingleChoice
        } else {
            SelectionMode::MultiChoice
        };

        Self {
            options,
            selection_mode,
            other_escape: raw.iter().any(|o| o == OTHER),
            toggle_option: None,
            mandatory_text_field: None,
        }
    }

    pub fn with_toggle(mut self, toggle: Option<ToggleOption>) -> Self {
        self.toggle_option = toggle;
        self
    }

    pub fn with_mandatory_text(mut self, field: Option<MandatoryTextField>) -> Self {
        self.mandatory_text_field = field;
        self
    }

    /// 选项是否属于该属性
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// 全部研究问题的定义
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    questions: IndexMap<String, IndexMap<String, AttributeSpec>>,
}

impl Schema {
    pub fn new(questions: IndexMap<String, IndexMap<String, AttributeSpec>>) -> Self {
        Self { questions }
    }

    /// 按定义顺序遍历研究问题
    pub fn questions(&self) -> impl Iterator<Item = (&String, &IndexMap<String, AttributeSpec>)> {
        self.questions.iter()
    }

    /// 按定义顺序遍历所有 (question, attribute, spec)
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str, &AttributeSpec)> {
        self.questions.iter().flat_map(|(q, attrs)| {
            attrs
                .iter()
                .map(move |(a, spec)| (q.as_str(), a.as_str(), spec))
        })
    }

    pub fn question(&self, question: &str) -> Option<&IndexMap<String, AttributeSpec>> {
        self.questions.get(question)
    }

    pub fn attribute(&self, question: &str, attribute: &str) -> Option<&AttributeSpec> {
        self.questions.get(question)?.get(attribute)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
