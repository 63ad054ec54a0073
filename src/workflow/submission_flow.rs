//! 答卷评分流程 - 流程层
//!
//! 一份答卷要么整体评分成功，要么整体失败：任何一道题格式不对、
//! 任何一道可见的必答题没有作答，都不会返回部分得分。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ValidationError};
use crate::infrastructure::NodeStore;
use crate::models::{AnswerValue, Identifier, QuestionNode, Response, ResponseEntry};
use crate::services::{effective_max_score, ScoringService};

/// 答卷评分流程
pub struct SubmissionFlow<S> {
    store: Arc<S>,
    scoring: ScoringService,
}

impl<S: NodeStore> SubmissionFlow<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            scoring: ScoringService::new(config),
        }
    }

    /// 按表单当前的全部题目给一份答卷评分
    pub async fn score_submission(
        &self,
        form_id: &str,
        respondent: Option<String>,
        entries: Vec<ResponseEntry>,
    ) -> AppResult<Response> {
        let form_id = Identifier::parse(form_id).ok_or(ValidationError::MissingFormId)?;
        let nodes = self.store.find_by_form(&form_id).await?;
        debug!("[表单 {}] 读取到 {} 道题目", form_id, nodes.len());

        let (entries, total_score) = score_entries(&self.scoring, &nodes, entries)?;

        info!(
            "[表单 {}] ✓ 答卷评分完成 ({}): {} 条作答, 总分 {}",
            form_id,
            respondent.as_deref().unwrap_or("匿名"),
            entries.len(),
            total_score
        );

        Ok(Response {
            form_id,
            respondent,
            entries,
            total_score,
        })
    }
}

/// 给一组作答评分，返回带分数的作答和总分
///
/// 规则：
/// - 作答引用不存在的题目、同一题作答两次、答案形状不对 → `FormatError`
/// - 条件子题只有在父题的作答选中了它的触发选项时才可见
/// - 不可见的题目不做必答检查，也不计分
/// - 可见的必答题没有作答或作答为空 → `RequiredError`
/// - 父题的子题带分时，父题按有效满分评分
pub fn score_entries(
    scoring: &ScoringService,
    nodes: &[QuestionNode],
    entries: Vec<ResponseEntry>,
) -> AppResult<(Vec<ResponseEntry>, u32)> {
    let by_id: HashMap<&Identifier, &QuestionNode> = nodes
        .iter()
        .filter_map(|n| n.id.as_ref().map(|id| (id, n)))
        .collect();

    let mut answers: HashMap<Identifier, AnswerValue> = HashMap::new();
    let mut seen = HashSet::new();
    for entry in &entries {
        if !by_id.contains_key(&entry.question_id) {
            return Err(AppError::format(entry.question_id.as_str(), "题目不存在"));
        }
        if !seen.insert(&entry.question_id) {
            return Err(AppError::format(entry.question_id.as_str(), "同一题目重复作答"));
        }
        if entry.is_blank() {
            continue;
        }
        if let Some(value) = &entry.value {
            answers.insert(entry.question_id.clone(), value.clone());
        }
    }

    let visibility = Visibility {
        by_id: &by_id,
        answers: &answers,
    };

    for node in nodes {
        let Some(id) = node.id.as_ref() else {
            continue;
        };
        if node.require
            && !node.question_type.is_display_only()
            && !answers.contains_key(id)
            && visibility.is_visible(node)
        {
            return Err(AppError::required(id.as_str()));
        }
    }

    let mut scored = Vec::with_capacity(entries.len());
    let mut total_score = 0u32;
    for mut entry in entries {
        let Some(node) = by_id.get(&entry.question_id).copied() else {
            continue;
        };

        if !visibility.is_visible(node) {
            debug!("题目 {} 的触发条件未满足，不计分", node.label());
            entry.score = Some(0);
            scored.push(entry);
            continue;
        }

        let score = match answers.get(&entry.question_id) {
            Some(value) => {
                let check = scoring.validate_shape(node, value);
                if !check.valid {
                    warn!("⚠️ 题目 {} 答案格式错误", node.label());
                    return Err(AppError::format(
                        entry.question_id.as_str(),
                        check.reason.unwrap_or_else(|| "答案格式错误".to_string()),
                    ));
                }
                let children: Vec<&QuestionNode> = nodes
                    .iter()
                    .filter(|c| c.parent_id() == node.id.as_ref())
                    .collect();
                scoring.score(node, value, effective_max_score(node, &children))
            }
            None => 0,
        };

        if !node.question_type.is_display_only() {
            total_score += score;
        }
        entry.score = Some(score);
        scored.push(entry);
    }

    Ok((scored, total_score))
}

/// 条件分支可见性
struct Visibility<'a> {
    by_id: &'a HashMap<&'a Identifier, &'a QuestionNode>,
    answers: &'a HashMap<Identifier, AnswerValue>,
}

impl Visibility<'_> {
    /// 沿父题链向上：每一级都要求父题的作答选中了触发选项；
    /// 找不到父题的子题按顶层题处理
    fn is_visible(&self, node: &QuestionNode) -> bool {
        let mut current = node;
        for _ in 0..=self.by_id.len() {
            let Some(parent_ref) = current.parent_content.as_ref() else {
                return true;
            };
            let Some(parent) = parent_ref
                .parent_question_id
                .as_ref()
                .and_then(|pid| self.by_id.get(pid).copied())
            else {
                return true;
            };
            let selected = parent
                .id
                .as_ref()
                .and_then(|pid| self.answers.get(pid))
                .and_then(|v| v.as_index_set())
                .is_some_and(|set| set.contains(&parent_ref.trigger_option_index));
            if !selected {
                return false;
            }
            current = parent;
        }
        // 父题链成环，视为不可见
        false
    }
}
