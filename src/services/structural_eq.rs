//! 题目结构比较
//!
//! 对账的快速路径和最小写入都要判断"传入题目是否和已存储题目内容相同"。
//! 比较前去掉易变字段（`id`、`createdAt`、`updatedAt`），其余字段逐个深比较：
//! 日期按时刻比较，数组逐元素比较，ID 按 [`Identifier`](crate::models::Identifier)
//! 的规范形式比较。
//!
//! [`ComparisonCache`] 只在单次对账内部使用，按指纹记忆比较结果。指纹只做预筛：
//! 缓存中的"不相等"可以直接采用（最坏只是多写一次），缓存中的"相等"永远重新完整比较。

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crate::models::QuestionNode;

/// 去掉易变字段后的副本
fn without_volatile(node: &QuestionNode) -> QuestionNode {
    let mut stripped = node.clone();
    stripped.id = None;
    stripped.created_at = None;
    stripped.updated_at = None;
    stripped
}

/// 忽略易变字段的完整结构比较
pub fn same_content(a: &QuestionNode, b: &QuestionNode) -> bool {
    without_volatile(a) == without_volatile(b)
}

/// 结构指纹：内容相同的题目指纹一定相同，反之不成立
pub fn fingerprint(node: &QuestionNode) -> u64 {
    let bytes = serde_json::to_vec(&without_volatile(node)).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// 有界比较缓存，满了淘汰最早的条目
#[derive(Debug)]
pub struct ComparisonCache {
    capacity: usize,
    entries: HashMap<(u64, u64), bool>,
    order: VecDeque<(u64, u64)>,
    hits: usize,
}

impl ComparisonCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
        }
    }

    /// 比较两道题的内容是否相同
    pub fn nodes_equal(&mut self, incoming: &QuestionNode, persisted: &QuestionNode) -> bool {
        let key = (fingerprint(incoming), fingerprint(persisted));

        if let Some(&cached) = self.entries.get(&key) {
            self.hits += 1;
            if !cached {
                return false;
            }
            return same_content(incoming, persisted);
        }

        let equal = key.0 == key.1 && same_content(incoming, persisted);
        self.remember(key, equal);
        equal
    }

    fn remember(&mut self, key: (u64, u64), equal: bool) {
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, equal);
        self.order.push_back(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
