use crate::models::schema::SelectionMode;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 题目定义 / 键错误
    #[error("定义错误: {0}")]
    Schema(#[from] SchemaError),
    /// 导出存储 / 会话标记写入错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 完成论文时的外部检查错误
    #[error("完成错误: {0}")]
    Finish(#[from] FinishError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
}

/// 键不属于当前定义或未加载时的错误
///
/// 属于调用方编程错误，不面向标注者
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("论文未加载: {paper}")]
    UnknownPaper { paper: String },
    #[error("未定义的研究问题: {question}")]
    UnknownQuestion { question: String },
    #[error("研究问题 {question} 下未定义属性: {attribute}")]
    UnknownAttribute { question: String, attribute: String },
    #[error("属性 {question}/{attribute} 没有选项: {option}")]
    UnknownOption {
        question: String,
        attribute: String,
        option: String,
    },
    #[error("属性 {question}/{attribute} 的选择模式为 {mode:?}，不支持 {operation}")]
    SelectionModeMismatch {
        question: String,
        attribute: String,
        mode: SelectionMode,
        operation: &'static str,
    },
}

/// 写入侧错误，操作中止但内存状态不受影响
#[derive(Debug, Error)]
pub enum StoreError {
    /// 导出失败
    #[error("导出到 {path} 失败: {source}")]
    ExportFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    /// 会话标记写入失败
    #[error("写入会话标记 {path} 失败: {source}")]
    SessionWriteFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
}

/// 完成论文时的错误
#[derive(Debug, Error)]
pub enum FinishError {
    /// 外部合理性检查抛出异常，禁止完成
    #[error("合理性检查出错 (论文: {paper}): {source}")]
    SanityCheckError {
        paper: String,
        #[source]
        source: BoxedSource,
    },
}

/// 输入文件错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    #[error("CSV解析失败 ({path}): {source}")]
    CsvParseFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: BoxedSource,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("未指定标注者 (user 为空)")]
    MissingUser,
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    #[error("{path} 中没有分配给 '{user}' 的论文")]
    NoPapersAssigned { user: String, path: String },
    #[error("论文列表中找不到: {paper}")]
    PaperNotFound { paper: String },
    #[error("索引 {index} 超出范围 [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("当前没有正在标注的论文")]
    NoActivePaper,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建导出失败错误
    pub fn export_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Store(StoreError::ExportFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建会话标记写入错误
    pub fn session_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Store(StoreError::SessionWriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建合理性检查错误
    pub fn sanity_check_failed(paper: impl Into<String>, source: BoxedSource) -> Self {
        AppError::Finish(FinishError::SanityCheckError {
            paper: paper.into(),
            source,
        })
    }

    /// 是否为 InvalidKey 类错误
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, AppError::Schema(_))
    }

    /// 是否为导出失败
    pub fn is_export_failed(&self) -> bool {
        matches!(self, AppError::Store(StoreError::ExportFailed { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
