//! 条件分支边集
//!
//! `parentContent`（子题 → 父题）和 `conditional`（父题 → 子题列表）是同一组边的
//! 两种视图。这里只维护一份邻接表 `父题 ID → [(triggerKey, 子题 ID)]`，两种视图都
//! 在写回节点时从它派生，避免两份数据各自漂移。

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::models::identifier::Identifier;
use crate::models::question::{ChildRef, ConditionalEntry, ParentContent, QuestionNode};

/// 一条条件分支边
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub trigger_key: i64,
    pub child: Identifier,
}

/// 条件分支邻接表
#[derive(Debug, Default, Clone)]
pub struct EdgeSet {
    children: BTreeMap<Identifier, Vec<Edge>>,
    parents: HashMap<Identifier, (Identifier, i64)>,
}

impl EdgeSet {
    /// 从一组节点构建边集
    ///
    /// - `conditional` 中的子题引用（数组下标或 ID）必须解析到本组中的节点，解析不到的丢弃
    /// - 只有反向引用的子题补成父题上的一条边；反向引用只有父题 qIdx 时按 qIdx 定位父题
    /// - 自环、一个子题挂到第二个父题、会形成环的边都会被丢弃
    pub fn from_nodes(nodes: &[QuestionNode]) -> Self {
        let mut set = Self::default();

        for owner in nodes {
            let Some(owner_id) = owner.id.as_ref() else {
                continue;
            };
            for entry in &owner.conditional {
                let child = match &entry.child_id {
                    ChildRef::Id(id) => nodes
                        .iter()
                        .find_map(|n| n.id.as_ref().filter(|nid| *nid == id))
                        .cloned(),
                    ChildRef::Position(pos) => nodes.get(*pos).and_then(|n| n.id.clone()),
                };
                match child {
                    Some(child) => set.link(owner_id, child, entry.trigger_key),
                    None => debug!(
                        "题目 {} 的条件分支引用 {:?} 无法解析，已丢弃",
                        owner_id, entry.child_id
                    ),
                }
            }
        }

        for child in nodes {
            let (Some(child_id), Some(parent)) = (child.id.as_ref(), child.parent_content.as_ref())
            else {
                continue;
            };
            if set.parents.contains_key(child_id) {
                continue;
            }
            let parent_id = match &parent.parent_question_id {
                Some(id) => nodes.iter().find_map(|n| n.id.as_ref().filter(|nid| *nid == id)),
                None => parent.parent_q_idx.and_then(|q_idx| {
                    nodes
                        .iter()
                        .filter(|n| n.q_idx == q_idx && n.id.as_ref() != Some(child_id))
                        .find_map(|n| n.id.as_ref())
                }),
            };
            if let Some(parent_id) = parent_id.cloned() {
                set.link(&parent_id, child_id.clone(), parent.trigger_option_index);
            }
        }

        set
    }

    fn link(&mut self, parent: &Identifier, child: Identifier, trigger_key: i64) {
        if *parent == child || self.parents.contains_key(&child) || self.is_ancestor(&child, parent)
        {
            debug!("丢弃条件分支边 {} -> {}", parent, child);
            return;
        }
        self.parents
            .insert(child.clone(), (parent.clone(), trigger_key));
        self.children
            .entry(parent.clone())
            .or_default()
            .push(Edge { trigger_key, child });
    }

    /// `candidate` 是否是 `node` 的祖先（含自身）
    fn is_ancestor(&self, candidate: &Identifier, node: &Identifier) -> bool {
        let mut current = Some(node);
        let mut steps = 0usize;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.parents.len() {
                return false;
            }
            current = self.parents.get(id).map(|(parent, _)| parent);
        }
        false
    }

    pub fn children_of(&self, parent: &Identifier) -> &[Edge] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent_of(&self, child: &Identifier) -> Option<(&Identifier, i64)> {
        self.parents.get(child).map(|(parent, key)| (parent, *key))
    }

    /// 从 `roots` 出发沿条件分支可达的全部子孙（不含 roots 本身）
    pub fn descendants(&self, roots: &HashSet<Identifier>) -> HashSet<Identifier> {
        let mut found = HashSet::new();
        let mut queue: VecDeque<&Identifier> = roots.iter().collect();
        while let Some(id) = queue.pop_front() {
            for edge in self.children_of(id) {
                if !roots.contains(&edge.child) && found.insert(edge.child.clone()) {
                    queue.push_back(&edge.child);
                }
            }
        }
        found
    }

    /// 删除与给定节点相关的所有边（只剪枝，不继续级联）
    pub fn remove_nodes(&mut self, removed: &HashSet<Identifier>) {
        self.children.retain(|parent, _| !removed.contains(parent));
        for edges in self.children.values_mut() {
            edges.retain(|edge| !removed.contains(&edge.child));
        }
        self.children.retain(|_, edges| !edges.is_empty());
        self.parents
            .retain(|child, (parent, _)| !removed.contains(child) && !removed.contains(parent));
    }

    /// 把边集写回节点的两种视图
    ///
    /// 父题在本组节点之外（例如在别的页）的反向引用保持原样。
    pub fn apply(&self, nodes: &mut [QuestionNode]) {
        let present: HashSet<Identifier> = nodes.iter().filter_map(|n| n.id.clone()).collect();
        for node in nodes.iter_mut() {
            let Some(id) = node.id.clone() else {
                continue;
            };
            node.conditional = self
                .children_of(&id)
                .iter()
                .map(|edge| ConditionalEntry {
                    trigger_key: edge.trigger_key,
                    child_id: ChildRef::Id(edge.child.clone()),
                })
                .collect();

            match self.parent_of(&id) {
                Some((parent, trigger)) => {
                    node.parent_content = Some(ParentContent {
                        parent_question_id: Some(parent.clone()),
                        parent_q_idx: None,
                        trigger_option_index: trigger,
                    });
                }
                None => {
                    let dangling_local = node
                        .parent_id()
                        .is_some_and(|parent| present.contains(parent));
                    if dangling_local {
                        // 父题在本组中但边被丢弃（环或重复挂载），退化为顶层题
                        node.parent_content = None;
                    }
                }
            }
        }
    }
}
