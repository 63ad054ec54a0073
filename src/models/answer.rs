//! 答案取值
//!
//! 答案的形状依赖题型：单个选项 idx、选项 idx 数组、字符串、数字、日期或
//! `{start, end}` 区间。反序列化时不做题型相关的转换，题型校验交给评分服务。

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// 题型相关的答案值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// 多选：选项 idx 数组
    Indices(Vec<i64>),
    /// 单选 / 下拉：单个选项 idx
    Index(i64),
    /// 数字
    Number(f64),
    /// 区间（数字或日期）
    Range(RangeValue),
    /// 文本（包括尚未规范化的日期字符串）
    Text(String),
    /// 日期，只由规范化步骤产生，序列化为 RFC3339 字符串
    Date(DateTime<Utc>),
}

/// 区间答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeValue {
    pub start: RangeBound,
    pub end: RangeBound,
}

/// 区间端点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeBound {
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl AnswerValue {
    /// 按选项集合理解答案（单选视为只有一个元素的集合）
    pub fn as_index_set(&self) -> Option<BTreeSet<i64>> {
        match self {
            AnswerValue::Index(idx) => Some(BTreeSet::from([*idx])),
            AnswerValue::Indices(indices) => Some(indices.iter().copied().collect()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AnswerValue::Index(n) => Some(*n as f64),
            AnswerValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 日期时刻；字符串会尝试解析
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            AnswerValue::Date(dt) => Some(*dt),
            AnswerValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// 是否为空答案（空白字符串或空数组）
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(s) => s.trim().is_empty(),
            AnswerValue::Indices(v) => v.is_empty(),
            _ => false,
        }
    }

    /// 把日期字符串规范化为日期
    ///
    /// 无法解析时返回 None，调用方据此丢弃该字段。
    pub fn normalize_date(self) -> Option<Self> {
        match self {
            AnswerValue::Text(s) => parse_date(&s).map(AnswerValue::Date),
            AnswerValue::Date(dt) => Some(AnswerValue::Date(dt)),
            _ => None,
        }
    }

    /// 把日期区间的两端规范化为日期
    pub fn normalize_date_range(self) -> Option<Self> {
        match self {
            AnswerValue::Range(range) => {
                let start = range.start.normalize_date()?;
                let end = range.end.normalize_date()?;
                Some(AnswerValue::Range(RangeValue { start, end }))
            }
            _ => None,
        }
    }
}

impl RangeBound {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RangeBound::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            RangeBound::Date(dt) => Some(*dt),
            RangeBound::Text(s) => parse_date(s),
            RangeBound::Number(_) => None,
        }
    }

    /// 能解析成日期时刻的端点（日期或可解析的日期字符串）
    pub fn is_date_like(&self) -> bool {
        self.as_instant().is_some()
    }

    fn normalize_date(self) -> Option<Self> {
        self.as_instant().map(RangeBound::Date)
    }
}

/// 解析日期字符串
///
/// 支持 RFC3339、`YYYY-MM-DDTHH:MM:SS`、`YYYY-MM-DD HH:MM:SS` 和 `YYYY-MM-DD`，
/// 没有时区的按 UTC 处理。
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
