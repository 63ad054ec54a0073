//! 题目树展开 - 业务能力层
//!
//! 把无序存储的扁平题目列表展开成展示顺序：
//! - 顶层题按 qIdx 升序
//! - 每道题之后紧跟它的条件子题，子题按 qIdx 降序，深度优先先序
//! - 父题不存在的孤儿题（以及无法从顶层到达的题）按原始相对顺序追加在最后
//!
//! 顶层升序、子题降序的不对称是既有行为，要保持兼容。新的调用点如果需要分支顺序，
//! 应该按父题 `conditional` 列表的 triggerKey 顺序重新推导，而不是沿用这里的 qIdx 降序。
//!
//! 这里只影响展示顺序，不会报错：引用悬空、ID 重复都退化为追加到末尾。

use std::collections::HashMap;

use crate::models::{Identifier, QuestionNode};

/// 展开题目树，返回展示顺序的题目列表（不修改输入）
pub fn materialize(nodes: &[QuestionNode]) -> Vec<QuestionNode> {
    materialize_indices(nodes)
        .into_iter()
        .map(|i| nodes[i].clone())
        .collect()
}

/// 展开题目树，返回输入下标的展示顺序
pub fn materialize_indices(nodes: &[QuestionNode]) -> Vec<usize> {
    let mut top_level = Vec::new();
    let mut children: HashMap<&Identifier, Vec<usize>> = HashMap::new();

    for (i, node) in nodes.iter().enumerate() {
        match &node.parent_content {
            None => top_level.push(i),
            Some(parent) => {
                if let Some(parent_id) = &parent.parent_question_id {
                    children.entry(parent_id).or_default().push(i);
                }
                // 没有父题 ID 的子题无法挂载，留给孤儿阶段
            }
        }
    }

    top_level.sort_by_key(|&i| nodes[i].q_idx);
    for bucket in children.values_mut() {
        bucket.sort_by(|&a, &b| nodes[b].q_idx.cmp(&nodes[a].q_idx));
    }

    let mut emitted = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    for root in top_level {
        emit_subtree(root, nodes, &children, &mut emitted, &mut order);
    }

    for (i, done) in emitted.iter_mut().enumerate() {
        if !*done {
            *done = true;
            order.push(i);
        }
    }

    order
}

fn emit_subtree(
    root: usize,
    nodes: &[QuestionNode],
    children: &HashMap<&Identifier, Vec<usize>>,
    emitted: &mut [bool],
    order: &mut Vec<usize>,
) {
    // 显式栈，避免很深的分支链导致栈溢出
    let mut stack = vec![root];
    while let Some(i) = stack.pop() {
        if emitted[i] {
            continue;
        }
        emitted[i] = true;
        order.push(i);

        if let Some(bucket) = nodes[i].id.as_ref().and_then(|id| children.get(id)) {
            for &child in bucket.iter().rev() {
                if !emitted[child] {
                    stack.push(child);
                }
            }
        }
    }
}

/// 带题号的展示项
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedQuestion {
    /// 1 开始的题号；条件子题没有题号
    pub number: Option<u32>,
    pub node: QuestionNode,
}

/// 在展开后的列表上叠加题号：只有非条件题递增计数
pub fn number_questions(materialized: Vec<QuestionNode>) -> Vec<NumberedQuestion> {
    let mut counter = 0u32;
    materialized
        .into_iter()
        .map(|node| {
            let number = if node.is_conditional() {
                None
            } else {
                counter += 1;
                Some(counter)
            };
            NumberedQuestion { number, node }
        })
        .collect()
}
