//! 内存存储
//!
//! 整个状态放在一把读写锁后面。提交时先在副本上应用整个批次，成功后再整体替换，
//! 所以任何失败都不会留下部分写入。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{AppError, AppResult, PersistenceError};
use crate::infrastructure::node_store::{FormStore, NodeStore, WriteBatch};
use crate::models::{Identifier, QuestionNode};

#[derive(Debug, Default, Clone)]
struct StoreState {
    nodes: BTreeMap<Identifier, QuestionNode>,
    form_scores: HashMap<Identifier, i64>,
}

/// 内存中的题目 / 表单存储
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    fail_commits: AtomicBool,
    commit_count: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让后续提交全部失败（模拟存储不可用）
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// 成功提交的批次数
    pub fn commit_count(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }

    /// 绕过对账直接写入题目（用于准备已有数据）
    pub async fn seed(&self, nodes: Vec<QuestionNode>) -> AppResult<()> {
        let mut state = self.state.write().await;
        for node in nodes {
            let id = node
                .id
                .clone()
                .ok_or_else(|| AppError::unavailable("预置题目必须带 ID"))?;
            state.nodes.insert(id, node);
        }
        Ok(())
    }
}

#[async_trait]
impl NodeStore for InMemoryStore {
    async fn find_by_form_page(
        &self,
        form_id: &Identifier,
        page: u32,
    ) -> AppResult<Vec<QuestionNode>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.form_id.as_ref() == Some(form_id) && n.page == page)
            .cloned()
            .collect())
    }

    async fn find_by_form(&self, form_id: &Identifier) -> AppResult<Vec<QuestionNode>> {
        let state = self.state.read().await;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.form_id.as_ref() == Some(form_id))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[Identifier]) -> AppResult<Vec<QuestionNode>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.nodes.get(id))
            .cloned()
            .collect())
    }

    async fn commit(&self, form_id: &Identifier, page: u32, batch: WriteBatch) -> AppResult<()> {
        let mut state = self.state.write().await;

        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(PersistenceError::CommitFailed {
                form_id: form_id.to_string(),
                page,
                reason: "存储拒绝写入".to_string(),
            }
            .into());
        }

        let mut next = state.clone();
        for id in &batch.deletes {
            next.nodes.remove(id);
        }
        let reject = |reason: String| PersistenceError::CommitFailed {
            form_id: form_id.to_string(),
            page,
            reason,
        };
        for node in batch.upserts {
            let id = node
                .id
                .clone()
                .ok_or_else(|| reject(format!("待写入题目 {} 缺少 ID", node.label())))?;
            if node.form_id.as_ref() != Some(form_id) {
                return Err(reject(format!("待写入题目 {} 不属于本表单", id)).into());
            }
            if let Some(existing) = next.nodes.get(&id) {
                if existing.form_id.as_ref() != Some(form_id) {
                    return Err(reject(format!("题目 {} 已属于其他表单", id)).into());
                }
            }
            next.nodes.insert(id, node);
        }
        *next.form_scores.entry(form_id.clone()).or_insert(0) += batch.form_score_delta;

        *state = next;
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        debug!("表单 {} 第 {} 页写批次已提交", form_id, page);
        Ok(())
    }
}

#[async_trait]
impl FormStore for InMemoryStore {
    async fn total_score(&self, form_id: &Identifier) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state.form_scores.get(form_id).copied().unwrap_or(0))
    }

    async fn set_total_score(&self, form_id: &Identifier, total: i64) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.form_scores.insert(form_id.clone(), total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionType;
    use tokio_test::{assert_err, assert_ok};

    fn form() -> Identifier {
        Identifier::parse("form1").unwrap()
    }

    fn node(id: &str, page: u32) -> QuestionNode {
        let mut node = QuestionNode::new(QuestionType::Number, 1).with_id(id);
        node.form_id = Some(form());
        node.page = page;
        node
    }

    #[tokio::test]
    async fn test_commit_applies_whole_batch() {
        let store = InMemoryStore::new();
        assert_ok!(store.seed(vec![node("a", 1), node("b", 1), node("c", 2)]).await);

        let batch = WriteBatch {
            upserts: vec![node("d", 1)],
            deletes: vec![Identifier::parse("a").unwrap()],
            form_score_delta: 7,
        };
        assert_ok!(store.commit(&form(), 1, batch).await);

        let page1 = store.find_by_form_page(&form(), 1).await.unwrap();
        let ids: Vec<String> = page1.iter().map(|n| n.label()).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert_eq!(store.find_by_form(&form()).await.unwrap().len(), 3);
        assert_eq!(store.total_score(&form()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_commit_refuses_to_overwrite_other_form() {
        let store = InMemoryStore::new();
        let other = Identifier::parse("form2").unwrap();
        let mut foreign = node("x", 1);
        foreign.form_id = Some(other.clone());
        assert_ok!(store.seed(vec![foreign]).await);

        let batch = WriteBatch {
            upserts: vec![node("x", 1)],
            deletes: vec![],
            form_score_delta: 1,
        };
        assert_err!(store.commit(&form(), 1, batch).await);

        let mut stray = node("y", 1);
        stray.form_id = Some(other.clone());
        let batch = WriteBatch {
            upserts: vec![stray],
            deletes: vec![],
            form_score_delta: 0,
        };
        assert_err!(store.commit(&form(), 1, batch).await);

        let kept = store.find_by_form(&other).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_find_by_ids_spans_forms_and_pages() {
        let store = InMemoryStore::new();
        let mut elsewhere = node("b", 3);
        elsewhere.form_id = Identifier::parse("form2");
        assert_ok!(store.seed(vec![node("a", 1), elsewhere]).await);

        let ids = vec![
            Identifier::parse("a").unwrap(),
            Identifier::parse("b").unwrap(),
            Identifier::parse("missing").unwrap(),
        ];
        let found = store.find_by_ids(&ids).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let store = InMemoryStore::new();
        assert_ok!(store.seed(vec![node("a", 1)]).await);

        let mut missing_id = node("x", 1);
        missing_id.id = None;
        let batch = WriteBatch {
            upserts: vec![node("b", 1), missing_id],
            deletes: vec![Identifier::parse("a").unwrap()],
            form_score_delta: 3,
        };
        assert_err!(store.commit(&form(), 1, batch).await);

        let page1 = store.find_by_form_page(&form(), 1).await.unwrap();
        assert_eq!(page1.len(), 1);
        assert_eq!(page1[0].label(), "a");
        assert_eq!(store.total_score(&form()).await.unwrap(), 0);
        assert_eq!(store.commit_count(), 0);
    }
}
