use serde::{Deserialize, Serialize};

use crate::models::answer::AnswerValue;
use crate::models::identifier::Identifier;

/// 一条提交的答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEntry {
    pub question_id: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnswerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl ResponseEntry {
    pub fn new(question_id: Identifier, value: AnswerValue) -> Self {
        Self {
            question_id,
            value: Some(value),
            score: None,
        }
    }

    /// 没有值，或值为空白字符串 / 空数组
    pub fn is_blank(&self) -> bool {
        self.value.as_ref().map_or(true, AnswerValue::is_empty)
    }
}

/// 一份已评分的答卷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub form_id: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respondent: Option<String>,
    pub entries: Vec<ResponseEntry>,
    pub total_score: u32,
}
