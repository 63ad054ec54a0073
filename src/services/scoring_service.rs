//! 评分服务 - 业务能力层
//!
//! 只负责"一道题 + 一个答案 → 得分"，以及答案形状校验。不读存储，不关心整份答卷。

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::config::Config;
use crate::models::{AnswerValue, QuestionNode, QuestionType, RangeBound};

/// 答案形状校验结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ShapeCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// 评分服务
pub struct ScoringService {
    text_similarity_threshold: f64,
}

impl ScoringService {
    pub fn new(config: &Config) -> Self {
        Self::with_threshold(config.text_similarity_threshold)
    }

    pub fn with_threshold(text_similarity_threshold: f64) -> Self {
        Self {
            text_similarity_threshold,
        }
    }

    /// 校验答案形状（拒绝而不是转换）
    pub fn validate_shape(&self, node: &QuestionNode, submitted: &AnswerValue) -> ShapeCheck {
        match node.question_type {
            QuestionType::TextBlock => ShapeCheck::ok(),
            QuestionType::MultipleChoice | QuestionType::Selection => match submitted {
                AnswerValue::Index(idx) if node.has_choice(*idx) => ShapeCheck::ok(),
                AnswerValue::Index(idx) => ShapeCheck::rejected(format!("选项 {} 不存在", idx)),
                _ => ShapeCheck::rejected("应为单个选项 idx"),
            },
            QuestionType::Checkbox => match submitted {
                AnswerValue::Indices(indices) => match indices.iter().find(|i| !node.has_choice(**i)) {
                    Some(missing) => ShapeCheck::rejected(format!("选项 {} 不存在", missing)),
                    None => ShapeCheck::ok(),
                },
                _ => ShapeCheck::rejected("应为选项 idx 数组"),
            },
            QuestionType::ShortAnswer | QuestionType::Paragraph | QuestionType::Date => {
                match submitted {
                    AnswerValue::Text(_) => ShapeCheck::ok(),
                    AnswerValue::Date(_) if node.question_type == QuestionType::Date => {
                        ShapeCheck::ok()
                    }
                    _ => ShapeCheck::rejected("应为字符串"),
                }
            }
            QuestionType::Number => match submitted.as_number() {
                Some(_) => ShapeCheck::ok(),
                None => ShapeCheck::rejected("应为数字"),
            },
            QuestionType::RangeNumber => match submitted {
                AnswerValue::Range(range)
                    if range.start.as_number().is_some() && range.end.as_number().is_some() =>
                {
                    ShapeCheck::ok()
                }
                _ => ShapeCheck::rejected("应为包含数字 start / end 的区间"),
            },
            QuestionType::RangeDate => match submitted {
                AnswerValue::Range(range)
                    if range.start.is_date_like() && range.end.is_date_like() =>
                {
                    ShapeCheck::ok()
                }
                _ => ShapeCheck::rejected("应为包含日期 start / end 的区间"),
            },
        }
    }

    /// 计算一道题的得分
    ///
    /// 没有标准答案（或标准答案未启用）的题目得 0 分。
    pub fn score(&self, node: &QuestionNode, submitted: &AnswerValue, max_score: u32) -> u32 {
        if node.question_type.is_display_only() {
            return 0;
        }
        let Some(key) = node.answer_key.as_ref().filter(|k| k.is_correct) else {
            return 0;
        };
        let correct = &key.answer;

        let awarded = match node.question_type {
            QuestionType::TextBlock => 0,
            QuestionType::MultipleChoice | QuestionType::Checkbox | QuestionType::Selection => {
                match (submitted.as_index_set(), correct.as_index_set()) {
                    (Some(user), Some(expected)) => set_similarity_score(&user, &expected, max_score),
                    _ => 0,
                }
            }
            QuestionType::ShortAnswer | QuestionType::Paragraph => {
                match (submitted.as_text(), correct.as_text()) {
                    (Some(user), Some(expected)) => self.text_score(user, expected, max_score),
                    _ => 0,
                }
            }
            QuestionType::Number => all_or_nothing(
                matches!((submitted.as_number(), correct.as_number()), (Some(a), Some(b)) if a == b),
                max_score,
            ),
            QuestionType::Date => all_or_nothing(
                matches!((submitted.as_instant(), correct.as_instant()), (Some(a), Some(b)) if a == b),
                max_score,
            ),
            QuestionType::RangeNumber | QuestionType::RangeDate => {
                all_or_nothing(range_matches(node.question_type, submitted, correct), max_score)
            }
        };

        debug!(
            "题目 {} ({}) 得分 {}/{}",
            node.label(),
            node.question_type,
            awarded,
            max_score
        );
        awarded
    }

    /// 文本题：忽略大小写、去首尾空白后完全相同给满分；
    /// 否则词集相似度严格大于阈值给满分，其余 0 分
    fn text_score(&self, user: &str, expected: &str, max_score: u32) -> u32 {
        let user_norm = user.trim().to_lowercase();
        let expected_norm = expected.trim().to_lowercase();
        if user_norm == expected_norm {
            return max_score;
        }
        let similarity = word_jaccard(&user_norm, &expected_norm);
        all_or_nothing(similarity > self.text_similarity_threshold, max_score)
    }
}

/// 条件父题评分时使用的有效满分
///
/// 子题带分时，父题的有效满分为 `max(0, 子题分值之和 - 父题分值)`，否则就是父题分值。
pub fn effective_max_score(parent: &QuestionNode, children: &[&QuestionNode]) -> u32 {
    let child_total: u32 = children.iter().map(|c| c.score).sum();
    if child_total > 0 {
        child_total.saturating_sub(parent.score)
    } else {
        parent.score
    }
}

/// 集合题得分：`round(max * |交集| / |并集|)`，集合完全相同时直接给满分
pub fn set_similarity_score(user: &BTreeSet<i64>, correct: &BTreeSet<i64>, max_score: u32) -> u32 {
    if user == correct {
        return max_score;
    }
    let intersection = user.intersection(correct).count();
    let union = user.union(correct).count();
    if union == 0 {
        return 0;
    }
    (f64::from(max_score) * intersection as f64 / union as f64).round() as u32
}

/// 词集 Jaccard 相似度（输入应已小写化）
pub fn word_jaccard(a: &str, b: &str) -> f64 {
    let a_words: HashSet<&str> = a.split_whitespace().collect();
    let b_words: HashSet<&str> = b.split_whitespace().collect();
    let union = a_words.union(&b_words).count();
    if union == 0 {
        return 0.0;
    }
    a_words.intersection(&b_words).count() as f64 / union as f64
}

fn all_or_nothing(matched: bool, max_score: u32) -> u32 {
    if matched {
        max_score
    } else {
        0
    }
}

fn range_matches(question_type: QuestionType, submitted: &AnswerValue, correct: &AnswerValue) -> bool {
    let (AnswerValue::Range(user), AnswerValue::Range(expected)) = (submitted, correct) else {
        return false;
    };
    let bound_eq = |a: &RangeBound, b: &RangeBound| match question_type {
        QuestionType::RangeDate => matches!((a.as_instant(), b.as_instant()), (Some(x), Some(y)) if x == y),
        _ => matches!((a.as_number(), b.as_number()), (Some(x), Some(y)) if x == y),
    };
    bound_eq(&user.start, &expected.start) && bound_eq(&user.end, &expected.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RangeValue;

    fn service() -> ScoringService {
        ScoringService::with_threshold(0.8)
    }

    fn checkbox() -> QuestionNode {
        QuestionNode::new(QuestionType::Checkbox, 1)
            .with_id("cb")
            .with_choices(&[0, 1, 2])
            .with_answer(AnswerValue::Indices(vec![0, 2]))
            .with_score(10)
    }

    fn range(start: f64, end: f64) -> AnswerValue {
        AnswerValue::Range(RangeValue {
            start: RangeBound::Number(start),
            end: RangeBound::Number(end),
        })
    }

    #[test]
    fn test_checkbox_exact_and_partial_credit() {
        let node = checkbox();
        assert_eq!(service().score(&node, &AnswerValue::Indices(vec![2, 0]), 10), 10);
        assert_eq!(service().score(&node, &AnswerValue::Indices(vec![0]), 10), 5);
        assert_eq!(service().score(&node, &AnswerValue::Indices(vec![1]), 10), 0);
        // 交集 1，并集 3
        assert_eq!(service().score(&node, &AnswerValue::Indices(vec![0, 1]), 10), 3);
    }

    #[test]
    fn test_exact_set_match_always_gets_max() {
        let user = BTreeSet::from([1, 2, 3]);
        assert_eq!(set_similarity_score(&user, &user.clone(), 7), 7);
    }

    #[test]
    fn test_single_choice_scored_as_set() {
        let node = QuestionNode::new(QuestionType::MultipleChoice, 1)
            .with_choices(&[0, 1])
            .with_answer(AnswerValue::Index(1));
        assert_eq!(service().score(&node, &AnswerValue::Index(1), 4), 4);
        assert_eq!(service().score(&node, &AnswerValue::Index(0), 4), 0);
    }

    #[test]
    fn test_text_case_insensitive_exact_match() {
        let node = QuestionNode::new(QuestionType::ShortAnswer, 1)
            .with_answer(AnswerValue::Text("the quick brown fox".to_string()));
        let user = AnswerValue::Text("  THE QUICK BROWN FOX ".to_string());
        assert_eq!(service().score(&node, &user, 8), 8);
    }

    #[test]
    fn test_text_similarity_threshold_is_strict() {
        let node = QuestionNode::new(QuestionType::Paragraph, 1).with_answer(AnswerValue::Text(
            "a b c d e f g h i j".to_string(),
        ));
        // 9/10 = 0.9 > 0.8
        let close = AnswerValue::Text("a b c d e f g h i".to_string());
        assert_eq!(service().score(&node, &close, 6), 6);
        // 8/10 = 0.8，不大于阈值
        let edge = AnswerValue::Text("a b c d e f g h".to_string());
        assert_eq!(service().score(&node, &edge, 6), 0);
    }

    #[test]
    fn test_number_date_and_range() {
        let number = QuestionNode::new(QuestionType::Number, 1).with_answer(AnswerValue::Index(42));
        assert_eq!(service().score(&number, &AnswerValue::Number(42.0), 3), 3);
        assert_eq!(service().score(&number, &AnswerValue::Number(41.5), 3), 0);

        let mut date = QuestionNode::new(QuestionType::Date, 1)
            .with_answer(AnswerValue::Text("2024-05-01".to_string()));
        date.normalize_dates();
        let user = AnswerValue::Text("2024-05-01T00:00:00Z".to_string());
        assert_eq!(service().score(&date, &user, 2), 2);

        let node = QuestionNode::new(QuestionType::RangeNumber, 1).with_answer(range(1.0, 5.0));
        assert_eq!(service().score(&node, &range(1.0, 5.0), 5), 5);
        assert_eq!(service().score(&node, &range(1.0, 4.0), 5), 0);
    }

    #[test]
    fn test_display_only_and_missing_key_score_zero() {
        let display = QuestionNode::new(QuestionType::TextBlock, 1).with_score(5);
        assert_eq!(service().score(&display, &AnswerValue::Text("x".into()), 5), 0);

        let no_key = QuestionNode::new(QuestionType::Number, 1).with_score(5);
        assert_eq!(service().score(&no_key, &AnswerValue::Number(1.0), 5), 0);
    }

    #[test]
    fn test_shape_validation_rejects_instead_of_coercing() {
        let node = checkbox();
        assert!(service().validate_shape(&node, &AnswerValue::Indices(vec![0, 2])).valid);
        let bad = service().validate_shape(&node, &AnswerValue::Indices(vec![0, 9]));
        assert!(!bad.valid);
        assert!(bad.reason.unwrap().contains('9'));
        assert!(!service().validate_shape(&node, &AnswerValue::Index(0)).valid);

        let number = QuestionNode::new(QuestionType::Number, 1);
        assert!(!service()
            .validate_shape(&number, &AnswerValue::Text("42".into()))
            .valid);

        let text = QuestionNode::new(QuestionType::ShortAnswer, 1);
        assert!(!service().validate_shape(&text, &AnswerValue::Number(1.0)).valid);

        let range_node = QuestionNode::new(QuestionType::RangeNumber, 1);
        let text_range = AnswerValue::Range(RangeValue {
            start: RangeBound::Text("a".into()),
            end: RangeBound::Number(1.0),
        });
        assert!(!service().validate_shape(&range_node, &text_range).valid);
    }

    #[test]
    fn test_date_range_bounds_must_parse_as_dates() {
        let node = QuestionNode::new(QuestionType::RangeDate, 1);
        let fruit = AnswerValue::Range(RangeValue {
            start: RangeBound::Text("banana".into()),
            end: RangeBound::Text("kiwi".into()),
        });
        let check = service().validate_shape(&node, &fruit);
        assert!(!check.valid);
        assert!(check.reason.is_some());

        let dates = AnswerValue::Range(RangeValue {
            start: RangeBound::Text("2024-01-01".into()),
            end: RangeBound::Text("2024-01-31 12:00:00".into()),
        });
        assert!(service().validate_shape(&node, &dates).valid);
    }

    #[test]
    fn test_effective_max_for_scored_children() {
        let parent = QuestionNode::new(QuestionType::MultipleChoice, 1).with_score(4);
        let c1 = QuestionNode::new(QuestionType::Number, 0).with_score(5);
        let c2 = QuestionNode::new(QuestionType::Number, 0).with_score(6);
        assert_eq!(effective_max_score(&parent, &[&c1, &c2]), 7);
        assert_eq!(effective_max_score(&parent, &[]), 4);

        let big_parent = QuestionNode::new(QuestionType::MultipleChoice, 1).with_score(20);
        assert_eq!(effective_max_score(&big_parent, &[&c1]), 0);
    }
}
