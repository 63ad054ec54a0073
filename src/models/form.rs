use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::identifier::Identifier;
use crate::models::question::QuestionNode;
use crate::models::response::ResponseEntry;

/// 表单定义文件（TOML）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    pub form_id: Identifier,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuestionNode>,
    /// 随表单一起提供的示例答卷
    #[serde(default)]
    pub responses: Vec<ResponseDraft>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

/// 尚未评分的答卷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDraft {
    #[serde(default)]
    pub respondent: Option<String>,
    #[serde(default)]
    pub entries: Vec<ResponseEntry>,
}

impl FormDefinition {
    /// 按页分组题目，页内保持文件中的顺序
    ///
    /// 条件分支里按数组下标的引用是相对于页内列表的，所以表单文件里同一页的题目要写在一起。
    pub fn pages(&self) -> BTreeMap<u32, Vec<QuestionNode>> {
        let mut pages: BTreeMap<u32, Vec<QuestionNode>> = BTreeMap::new();
        for question in &self.questions {
            pages
                .entry(question.page)
                .or_default()
                .push(question.clone());
        }
        pages
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}
