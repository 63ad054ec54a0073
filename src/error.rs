use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 编辑载荷校验失败
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 提交答案格式错误
    #[error("答案格式错误: {0}")]
    Format(#[from] FormatError),
    /// 必答题缺失
    #[error("必答题未作答: {0}")]
    Required(#[from] RequiredError),
    /// 存储层错误
    #[error("存储错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 编辑载荷校验错误
///
/// 所有变体都带有足够的信息来定位出问题的题目。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 表单ID为空
    #[error("表单ID不能为空")]
    MissingFormId,
    /// 页码非法（页码从 1 开始）
    #[error("页码 {page} 非法，页码必须为正整数")]
    InvalidPage { page: u32 },
    /// 同一批编辑载荷中题目 ID 重复
    #[error("题目ID {question} 在编辑载荷中出现多次")]
    DuplicateQuestionId { question: String },
    /// 题目 ID 已属于另一张表单
    #[error("题目ID {question} 已属于表单 {form}，不能在本表单中使用")]
    ForeignQuestion { question: String, form: String },
    /// 题目 ID 已在同一表单的另一页
    #[error("题目ID {question} 已在第 {page} 页，不能直接移动到本页")]
    QuestionOnOtherPage { question: String, page: u32 },
    /// 同一题目的选项 idx 重复
    #[error("题目 {question} 的选项 idx {idx} 重复")]
    DuplicateChoiceIdx { question: String, idx: i64 },
    /// 条件子题分值没有严格大于父题分值
    #[error("条件子题 {question} 的分值 {child_score} 必须大于父题 {parent} 的分值 {parent_score}")]
    ParentScoreGuard {
        question: String,
        parent: String,
        child_score: u32,
        parent_score: u32,
    },
}

/// 提交答案的格式错误
#[derive(Debug, Error, PartialEq, Eq)]
#[error("题目 {question_id}: {reason}")]
pub struct FormatError {
    pub question_id: String,
    pub reason: String,
}

/// 必答题缺少答案
#[derive(Debug, Error, PartialEq, Eq)]
#[error("题目 {question_id} 为必答题")]
pub struct RequiredError {
    pub question_id: String,
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 存储不可用
    #[error("存储不可用: {reason}")]
    Unavailable { reason: String },
    /// 提交写入失败（整体回滚）
    #[error("表单 {form_id} 第 {page} 页写入失败: {reason}")]
    CommitFailed {
        form_id: String,
        page: u32,
        reason: String,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// JSON 序列化失败
    #[error("JSON序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置项取值非法
    #[error("配置项 {name} 取值 '{value}' 非法: {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::File(FileError::Json(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建答案格式错误
    pub fn format(question_id: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Format(FormatError {
            question_id: question_id.into(),
            reason: reason.into(),
        })
    }

    /// 创建必答题错误
    pub fn required(question_id: impl Into<String>) -> Self {
        AppError::Required(RequiredError {
            question_id: question_id.into(),
        })
    }

    /// 创建存储不可用错误
    pub fn unavailable(reason: impl Into<String>) -> Self {
        AppError::Persistence(PersistenceError::Unavailable {
            reason: reason.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为调用方可以修正的客户端错误
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Format(_) | AppError::Required(_)
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
