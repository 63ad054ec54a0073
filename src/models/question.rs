use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::answer::AnswerValue;
use crate::models::identifier::Identifier;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// 纯展示文本，不计分
    #[serde(rename = "text")]
    TextBlock,
    /// 单选
    MultipleChoice,
    /// 多选
    Checkbox,
    /// 下拉选择
    Selection,
    /// 简答
    ShortAnswer,
    /// 段落
    Paragraph,
    /// 数字
    Number,
    /// 日期
    Date,
    /// 数字区间
    RangeNumber,
    /// 日期区间
    RangeDate,
}

impl QuestionType {
    /// 只用于展示，永不计分，也不计入任何总分
    pub fn is_display_only(self) -> bool {
        matches!(self, QuestionType::TextBlock)
    }

    /// 标准名称
    pub fn name(self) -> &'static str {
        match self {
            QuestionType::TextBlock => "说明文字",
            QuestionType::MultipleChoice => "单选",
            QuestionType::Checkbox => "多选",
            QuestionType::Selection => "下拉选择",
            QuestionType::ShortAnswer => "简答",
            QuestionType::Paragraph => "段落",
            QuestionType::Number => "数字",
            QuestionType::Date => "日期",
            QuestionType::RangeNumber => "数字区间",
            QuestionType::RangeDate => "日期区间",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 选项
///
/// `idx` 是答案引用的稳定选项编号，和它在列表中的位置无关。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub idx: i64,
    #[serde(default)]
    pub content: String,
}

/// 标准答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKey {
    pub answer: AnswerValue,
    #[serde(default)]
    pub is_correct: bool,
}

/// 条件子题指向父题的反向引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentContent {
    /// 父题 ID；新建的父题还没有 ID 时可以为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_question_id: Option<Identifier>,
    /// 父题的 qIdx，仅在父题 ID 缺失时用于定位
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_q_idx: Option<i64>,
    /// 触发该子题的父题选项 idx
    pub trigger_option_index: i64,
}

/// 子题引用：已有 ID，或同一批编辑载荷中的数组下标
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildRef {
    Position(usize),
    Id(Identifier),
}

impl ChildRef {
    pub fn id(&self) -> Option<&Identifier> {
        match self {
            ChildRef::Id(id) => Some(id),
            ChildRef::Position(_) => None,
        }
    }
}

/// 父题上的条件分支条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalEntry {
    pub trigger_key: i64,
    pub child_id: ChildRef,
}

/// 表单中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<Identifier>,
    #[serde(default)]
    pub q_idx: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// 题干
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<AnswerKey>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub require: bool,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_content: Option<ParentContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional: Vec<ConditionalEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_page() -> u32 {
    1
}

impl QuestionNode {
    /// 创建一个最小的题目（测试和表单定义里常用）
    pub fn new(question_type: QuestionType, q_idx: i64) -> Self {
        Self {
            id: None,
            form_id: None,
            q_idx,
            question_type,
            content: String::new(),
            choices: Vec::new(),
            answer_key: None,
            score: 0,
            require: false,
            page: default_page(),
            parent_content: None,
            conditional: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Identifier::parse(id);
        self
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    pub fn with_choices(mut self, idxs: &[i64]) -> Self {
        self.choices = idxs
            .iter()
            .map(|idx| ChoiceOption {
                idx: *idx,
                content: format!("选项 {}", idx),
            })
            .collect();
        self
    }

    pub fn with_answer(mut self, answer: AnswerValue) -> Self {
        self.answer_key = Some(AnswerKey {
            answer,
            is_correct: true,
        });
        self
    }

    pub fn with_parent(mut self, parent_id: &str, trigger_option_index: i64) -> Self {
        self.parent_content = Some(ParentContent {
            parent_question_id: Identifier::parse(parent_id),
            parent_q_idx: None,
            trigger_option_index,
        });
        self
    }

    /// 是否为条件子题（存在父题反向引用）
    pub fn is_conditional(&self) -> bool {
        self.parent_content.is_some()
    }

    pub fn parent_id(&self) -> Option<&Identifier> {
        self.parent_content
            .as_ref()
            .and_then(|p| p.parent_question_id.as_ref())
    }

    /// 是否计入表单总分：非展示题且不是条件子题
    pub fn counts_toward_total(&self) -> bool {
        !self.question_type.is_display_only() && !self.is_conditional()
    }

    /// 计入总分的分值
    pub fn contributing_score(&self) -> i64 {
        if self.counts_toward_total() {
            i64::from(self.score)
        } else {
            0
        }
    }

    pub fn has_choice(&self, idx: i64) -> bool {
        self.choices.iter().any(|c| c.idx == idx)
    }

    /// 日志和错误信息里用来指代题目的标签
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.to_string(),
            None => format!("qIdx={}", self.q_idx),
        }
    }

    /// 把标准答案中的日期字符串解析为日期，无法解析的标准答案被丢弃
    pub fn normalize_dates(&mut self) {
        let normalize: fn(AnswerValue) -> Option<AnswerValue> = match self.question_type {
            QuestionType::Date => AnswerValue::normalize_date,
            QuestionType::RangeDate => AnswerValue::normalize_date_range,
            _ => return,
        };
        if let Some(key) = self.answer_key.take() {
            self.answer_key = normalize(key.answer).map(|answer| AnswerKey {
                answer,
                is_correct: key.is_correct,
            });
        }
    }

    /// 节点自身的结构校验
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for choice in &self.choices {
            if !seen.insert(choice.idx) {
                return Err(ValidationError::DuplicateChoiceIdx {
                    question: self.label(),
                    idx: choice.idx,
                });
            }
        }
        Ok(())
    }
}

/// 表单总分：所有计分的非条件题分值之和
pub fn total_score(nodes: &[QuestionNode]) -> i64 {
    nodes.iter().map(QuestionNode::contributing_score).sum()
}
