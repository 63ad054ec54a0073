//! 批量对账流程 - 流程层
//!
//! 核心职责：用一页编辑后的题目替换已存储的同一页题目，只写必要的部分
//!
//! 流程顺序：
//! 1. 规范化日期 → 快速路径（内容完全相同则不写）
//! 2. 分配 ID → 回填条件分支 → 父子分值校验
//! 3. 删除 + 级联 → qIdx 重排 → 最小 upsert → 表单总分
//! 4. 作为一个写批次原子提交，再读回整页
//!
//! 同一页的对账在整个过程中持有页锁。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, ValidationError};
use crate::infrastructure::{NodeStore, PageLocks, WriteBatch};
use crate::models::{total_score, EdgeSet, Identifier, QuestionNode};
use crate::services::ComparisonCache;
use crate::workflow::reconcile_ctx::ReconcileCtx;

/// 对账做了什么
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 内容未变，没有任何写入
    pub fast_path: bool,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// qIdx 被下调的题目数
    pub renumbered: usize,
    /// 被删除的计分非条件题分值之和
    pub deleted_score: i64,
    /// 写入表单冗余总分的增量
    pub score_delta: i64,
}

/// 对账结果
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// 提交后该页的全部题目，按 qIdx 排序
    pub nodes: Vec<QuestionNode>,
    pub report: ReconcileReport,
}

/// 批量对账引擎
pub struct ReconcileEngine<S> {
    store: Arc<S>,
    locks: PageLocks,
    cache_capacity: usize,
}

impl<S: NodeStore> ReconcileEngine<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            locks: PageLocks::new(),
            cache_capacity: config.comparison_cache_capacity,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 用 `incoming` 替换 `(form_id, page)` 已存储的题目，返回提交后的整页题目
    pub async fn reconcile(
        &self,
        form_id: &str,
        page: u32,
        incoming: Vec<QuestionNode>,
    ) -> AppResult<Vec<QuestionNode>> {
        Ok(self.reconcile_with_report(form_id, page, incoming).await?.nodes)
    }

    /// 同 [`reconcile`](Self::reconcile)，并返回对账报告
    pub async fn reconcile_with_report(
        &self,
        form_id: &str,
        page: u32,
        mut incoming: Vec<QuestionNode>,
    ) -> AppResult<ReconcileOutcome> {
        let form_id = Identifier::parse(form_id).ok_or(ValidationError::MissingFormId)?;
        if page == 0 {
            return Err(ValidationError::InvalidPage { page }.into());
        }
        validate_payload(&incoming)?;

        let ctx = ReconcileCtx::new(form_id.clone(), page);
        info!("{} 开始对账，传入 {} 道题目", ctx, incoming.len());

        // ========== 步骤 1: 规范化 ==========
        for node in incoming.iter_mut() {
            node.normalize_dates();
            node.form_id = Some(form_id.clone());
            node.page = page;
            if node.question_type.is_display_only() {
                node.score = 0;
            }
        }

        let _guard = self.locks.acquire(&form_id, page).await;

        let persisted = self.store.find_by_form_page(&form_id, page).await?;
        let mut cache = ComparisonCache::new(self.cache_capacity);

        // ========== 步骤 2: 快速路径 ==========
        if is_unchanged(&incoming, &persisted, &mut cache) {
            info!("{} ⚡ 内容未变化，跳过写入", ctx);
            return Ok(ReconcileOutcome {
                nodes: sorted_by_q_idx(persisted),
                report: ReconcileReport {
                    fast_path: true,
                    ..Default::default()
                },
            });
        }

        // 本页之外已存在的 ID 不能被本页接管
        self.check_foreign_ids(&form_id, &incoming, &persisted).await?;

        // ========== 步骤 3: 分配 ID ==========
        for node in incoming.iter_mut().filter(|n| n.id.is_none()) {
            node.id = Some(Identifier::generate());
        }

        // ========== 步骤 4: 回填条件分支 ==========
        EdgeSet::from_nodes(&incoming).apply(&mut incoming);

        // ========== 步骤 5: 父子分值校验 ==========
        check_parent_scores(&incoming, &persisted)?;

        // ========== 步骤 6: 删除 + 级联 ==========
        let deleted = collect_deletions(&incoming, &persisted);
        let mut report = ReconcileReport::default();

        let before = incoming.len();
        incoming.retain(|n| n.id.as_ref().map_or(true, |id| !deleted.contains(id)));
        if incoming.len() < before {
            warn!(
                "{} ⚠️ {} 道传入题目挂在被删除的父题下，随父题一起删除",
                ctx,
                before - incoming.len()
            );
        }
        let mut survivor_edges = EdgeSet::from_nodes(&incoming);
        survivor_edges.remove_nodes(&deleted);
        survivor_edges.apply(&mut incoming);

        let deleted_nodes: Vec<&QuestionNode> = persisted
            .iter()
            .filter(|n| n.id.as_ref().is_some_and(|id| deleted.contains(id)))
            .collect();
        report.deleted = deleted_nodes.len();
        report.deleted_score = deleted_nodes.iter().map(|n| n.contributing_score()).sum();

        // ========== 步骤 7: qIdx 重排 ==========
        let deleted_q_idx: Vec<i64> = deleted_nodes
            .iter()
            .map(|n| n.q_idx)
            .filter(|q| *q > 0)
            .collect();
        report.renumbered = renumber(&mut incoming, &deleted_q_idx);

        // ========== 步骤 8: 最小 upsert ==========
        let persisted_by_id: HashMap<&Identifier, &QuestionNode> = persisted
            .iter()
            .filter_map(|n| n.id.as_ref().map(|id| (id, n)))
            .collect();
        let now = Utc::now();
        let mut upserts = Vec::new();
        for mut node in incoming.iter().cloned() {
            match node.id.as_ref().and_then(|id| persisted_by_id.get(id)) {
                Some(old) => {
                    if cache.nodes_equal(&node, old) {
                        continue;
                    }
                    node.created_at = old.created_at.or(Some(now));
                    report.updated += 1;
                }
                None => {
                    node.created_at = node.created_at.or(Some(now));
                    report.inserted += 1;
                }
            }
            node.updated_at = Some(now);
            upserts.push(node);
        }

        // ========== 步骤 9: 表单总分 ==========
        report.score_delta = total_score(&incoming) - total_score(&persisted);

        let batch = WriteBatch {
            upserts,
            deletes: deleted_nodes.iter().filter_map(|n| n.id.clone()).collect(),
            form_score_delta: report.score_delta,
        };

        debug!(
            "{} 写批次: upsert {}, 删除 {}, 总分增量 {}, 比较缓存 {} 条 / 命中 {}",
            ctx,
            batch.upserts.len(),
            batch.deletes.len(),
            batch.form_score_delta,
            cache.len(),
            cache.hits()
        );

        if !batch.is_empty() {
            self.store.commit(&form_id, page, batch).await?;
        }

        // ========== 步骤 10: 读回 ==========
        let nodes = sorted_by_q_idx(self.store.find_by_form_page(&form_id, page).await?);

        info!(
            "{} ✓ 对账完成: 新增 {}, 更新 {}, 删除 {}, 重排 {}, 总分变化 {:+}",
            ctx,
            report.inserted,
            report.updated,
            report.deleted,
            report.renumbered,
            report.score_delta
        );

        Ok(ReconcileOutcome { nodes, report })
    }
}

impl<S: NodeStore> ReconcileEngine<S> {
    /// 传入题目带的 ID 如果不在本页，就去整个存储里查：
    /// 属于其他表单或本表单其他页的都拒绝
    async fn check_foreign_ids(
        &self,
        form_id: &Identifier,
        incoming: &[QuestionNode],
        persisted: &[QuestionNode],
    ) -> AppResult<()> {
        let on_page: HashSet<&Identifier> =
            persisted.iter().filter_map(|n| n.id.as_ref()).collect();
        let unknown: Vec<Identifier> = incoming
            .iter()
            .filter_map(|n| n.id.as_ref())
            .filter(|id| !on_page.contains(id))
            .cloned()
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }

        let existing = self.store.find_by_ids(&unknown).await?;
        let Some(node) = existing.first() else {
            return Ok(());
        };
        let question = node.label();
        let err = match node.form_id.as_ref() {
            Some(owner) if owner == form_id => ValidationError::QuestionOnOtherPage {
                question,
                page: node.page,
            },
            owner => ValidationError::ForeignQuestion {
                question,
                form: owner.map_or_else(|| "未知".to_string(), Identifier::to_string),
            },
        };
        Err(err.into())
    }
}

/// 载荷本身的结构校验
fn validate_payload(incoming: &[QuestionNode]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for node in incoming {
        node.validate()?;
        if let Some(id) = &node.id {
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateQuestionId {
                    question: id.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// 传入与已存储的题目数量相同，且每道传入题目都能按 ID 找到内容相同的已存储题目
fn is_unchanged(
    incoming: &[QuestionNode],
    persisted: &[QuestionNode],
    cache: &mut ComparisonCache,
) -> bool {
    if incoming.len() != persisted.len() {
        return false;
    }
    let persisted_by_id: HashMap<&Identifier, &QuestionNode> = persisted
        .iter()
        .filter_map(|n| n.id.as_ref().map(|id| (id, n)))
        .collect();
    if persisted_by_id.len() != persisted.len() {
        return false;
    }
    incoming.iter().all(|node| {
        node.id
            .as_ref()
            .and_then(|id| persisted_by_id.get(id))
            .is_some_and(|old| cache.nodes_equal(node, old))
    })
}

/// 条件子题分值必须严格大于父题分值（父题按已存储数据定位）
fn check_parent_scores(
    incoming: &[QuestionNode],
    persisted: &[QuestionNode],
) -> Result<(), ValidationError> {
    for node in incoming.iter().filter(|n| n.score != 0) {
        let Some(parent_ref) = node.parent_content.as_ref() else {
            continue;
        };
        let parent = match (&parent_ref.parent_question_id, parent_ref.parent_q_idx) {
            (Some(parent_id), _) => persisted.iter().find(|p| p.id.as_ref() == Some(parent_id)),
            (None, Some(q_idx)) => persisted.iter().find(|p| p.q_idx == q_idx && !p.is_conditional()),
            (None, None) => None,
        };
        if let Some(parent) = parent {
            if node.score <= parent.score {
                return Err(ValidationError::ParentScoreGuard {
                    question: node.label(),
                    parent: parent.label(),
                    child_score: node.score,
                    parent_score: parent.score,
                });
            }
        }
    }
    Ok(())
}

/// 已存储但不在传入集合中的题目，加上从它们出发沿条件分支可达的全部题目
fn collect_deletions(incoming: &[QuestionNode], persisted: &[QuestionNode]) -> HashSet<Identifier> {
    let incoming_ids: HashSet<&Identifier> = incoming.iter().filter_map(|n| n.id.as_ref()).collect();
    let mut deleted: HashSet<Identifier> = persisted
        .iter()
        .filter_map(|n| n.id.as_ref())
        .filter(|id| !incoming_ids.contains(id))
        .cloned()
        .collect();
    if deleted.is_empty() {
        return deleted;
    }

    let persisted_edges = EdgeSet::from_nodes(persisted);
    let incoming_edges = EdgeSet::from_nodes(incoming);
    loop {
        let mut reached = persisted_edges.descendants(&deleted);
        reached.extend(incoming_edges.descendants(&deleted));
        reached.extend(
            incoming
                .iter()
                .filter(|n| n.parent_id().is_some_and(|p| deleted.contains(p)))
                .filter_map(|n| n.id.clone()),
        );

        let before = deleted.len();
        deleted.extend(reached);
        if deleted.len() == before {
            return deleted;
        }
    }
}

/// 每删掉一道 qIdx 更小的题，存活题目的 qIdx 就减一；qIdx 为 0 的题不参与
fn renumber(survivors: &mut [QuestionNode], deleted_q_idx: &[i64]) -> usize {
    if deleted_q_idx.is_empty() {
        return 0;
    }
    let mut renumbered = 0;
    for node in survivors.iter_mut().filter(|n| n.q_idx > 0) {
        let shift = deleted_q_idx.iter().filter(|q| **q < node.q_idx).count() as i64;
        if shift > 0 {
            node.q_idx -= shift;
            renumbered += 1;
        }
    }
    renumbered
}

fn sorted_by_q_idx(mut nodes: Vec<QuestionNode>) -> Vec<QuestionNode> {
    nodes.sort_by_key(|n| n.q_idx);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::{FormStore, InMemoryStore};
    use crate::models::{ChildRef, ConditionalEntry, QuestionType};
    use tokio_test::{assert_err, assert_ok};

    const FORM: &str = "form1";

    fn form_id() -> Identifier {
        Identifier::parse(FORM).unwrap()
    }

    fn engine() -> ReconcileEngine<InMemoryStore> {
        ReconcileEngine::new(Arc::new(InMemoryStore::new()), &Config::default())
    }

    fn stored(id: &str, q_idx: i64, score: u32) -> QuestionNode {
        let mut node = QuestionNode::new(QuestionType::Number, q_idx)
            .with_id(id)
            .with_score(score);
        node.form_id = Some(form_id());
        node
    }

    fn ids(nodes: &[QuestionNode]) -> Vec<String> {
        nodes.iter().map(QuestionNode::label).collect()
    }

    #[tokio::test]
    async fn test_identical_payload_performs_no_writes() {
        let engine = engine();
        assert_ok!(engine.store().seed(vec![stored("a", 1, 5)]).await);

        let outcome = engine
            .reconcile_with_report(FORM, 1, vec![stored("a", 1, 5)])
            .await
            .unwrap();

        assert!(outcome.report.fast_path);
        assert_eq!(engine.store().commit_count(), 0);
        assert_eq!(ids(&outcome.nodes), vec!["a"]);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_reconcile_is_idempotent() {
        let engine = engine();
        let mut parent = QuestionNode::new(QuestionType::MultipleChoice, 1)
            .with_choices(&[0, 1])
            .with_score(2);
        parent.conditional.push(ConditionalEntry {
            trigger_key: 1,
            child_id: ChildRef::Position(1),
        });
        let child = QuestionNode::new(QuestionType::Date, 0)
            .with_answer(crate::models::AnswerValue::Text("2024-02-02".into()));
        let incoming = vec![parent, child, QuestionNode::new(QuestionType::Number, 2).with_score(3)];

        let first = engine.reconcile(FORM, 1, incoming).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(engine.store().commit_count(), 1);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 5);

        let second = engine
            .reconcile_with_report(FORM, 1, first.clone())
            .await
            .unwrap();
        assert!(second.report.fast_path);
        assert_eq!(engine.store().commit_count(), 1);
        assert_eq!(second.nodes, first);
    }

    #[tokio::test]
    async fn test_position_reference_is_back_filled_with_assigned_id() {
        let engine = engine();
        let mut parent = QuestionNode::new(QuestionType::Selection, 1).with_choices(&[0, 1]);
        parent.conditional.push(ConditionalEntry {
            trigger_key: 0,
            child_id: ChildRef::Position(1),
        });
        parent.conditional.push(ConditionalEntry {
            trigger_key: 1,
            child_id: ChildRef::Position(7),
        });
        let child = QuestionNode::new(QuestionType::ShortAnswer, 0);

        let nodes = engine.reconcile(FORM, 1, vec![parent, child]).await.unwrap();
        let parent = nodes.iter().find(|n| n.q_idx == 1).unwrap();
        let child = nodes.iter().find(|n| n.q_idx == 0).unwrap();

        assert_eq!(parent.conditional.len(), 1);
        assert_eq!(
            parent.conditional[0].child_id,
            ChildRef::Id(child.id.clone().unwrap())
        );
        assert_eq!(child.parent_id(), parent.id.as_ref());
    }

    #[tokio::test]
    async fn test_omitting_conditional_child_keeps_total() {
        let engine = engine();
        let a = stored("a", 1, 10);
        let b = stored("b", 0, 5).with_parent("a", 0);
        assert_ok!(engine.store().seed(vec![a.clone(), b]).await);
        assert_ok!(engine.store().set_total_score(&form_id(), 10).await);

        let outcome = engine.reconcile_with_report(FORM, 1, vec![a]).await.unwrap();

        assert_eq!(ids(&outcome.nodes), vec!["a"]);
        assert_eq!(outcome.report.deleted, 1);
        assert_eq!(outcome.report.score_delta, 0);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_omitted_child_is_pruned_from_parent_conditional() {
        let engine = engine();
        let mut a = stored("a", 1, 10).with_choices(&[0, 1]);
        a.conditional.push(ConditionalEntry {
            trigger_key: 0,
            child_id: ChildRef::Id(Identifier::parse("b").unwrap()),
        });
        let b = stored("b", 0, 15).with_parent("a", 0);
        assert_ok!(engine.store().seed(vec![a.clone(), b]).await);

        // 父题的 conditional 仍然列着被删掉的子题
        let outcome = engine.reconcile_with_report(FORM, 1, vec![a]).await.unwrap();

        assert_eq!(ids(&outcome.nodes), vec!["a"]);
        assert!(outcome.nodes[0].conditional.is_empty());
        assert_eq!(outcome.report.deleted, 1);
        assert_eq!(outcome.report.updated, 1);

        let stored_page = engine.store().find_by_form_page(&form_id(), 1).await.unwrap();
        assert!(stored_page[0].conditional.is_empty());
    }

    #[tokio::test]
    async fn test_dangling_child_id_is_not_stored() {
        let engine = engine();
        let mut a = QuestionNode::new(QuestionType::MultipleChoice, 1)
            .with_id("a")
            .with_choices(&[0]);
        a.conditional.push(ConditionalEntry {
            trigger_key: 0,
            child_id: ChildRef::Id(Identifier::parse("ghost").unwrap()),
        });

        let nodes = engine.reconcile(FORM, 1, vec![a]).await.unwrap();
        assert!(nodes[0].conditional.is_empty());
    }

    #[tokio::test]
    async fn test_id_from_another_page_is_rejected() {
        let engine = engine();
        let x = QuestionNode::new(QuestionType::Number, 1).with_id("x").with_score(7);
        assert_ok!(engine.reconcile(FORM, 2, vec![x.clone()]).await);
        let commits = engine.store().commit_count();

        let result = engine.reconcile(FORM, 1, vec![x]).await;
        match result {
            Err(AppError::Validation(ValidationError::QuestionOnOtherPage { question, page })) => {
                assert_eq!(question, "x");
                assert_eq!(page, 2);
            }
            other => panic!("expected other-page error, got {:?}", other),
        }

        assert_eq!(engine.store().commit_count(), commits);
        assert_eq!(engine.store().find_by_form_page(&form_id(), 2).await.unwrap().len(), 1);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_id_from_another_form_is_rejected() {
        let engine = engine();
        let x = QuestionNode::new(QuestionType::Number, 1).with_id("x").with_score(7);
        assert_ok!(engine.reconcile(FORM, 1, vec![x.clone()]).await);

        let result = engine.reconcile("form2", 1, vec![x]).await;
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::ForeignQuestion { .. }))
        ));

        assert_eq!(engine.store().find_by_form(&form_id()).await.unwrap().len(), 1);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 7);
        let other = Identifier::parse("form2").unwrap();
        assert!(engine.store().find_by_form(&other).await.unwrap().is_empty());
        assert_eq!(engine.store().total_score(&other).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleting_parent_cascades_and_lowers_total() {
        let engine = engine();
        let a = stored("a", 1, 10);
        let b = stored("b", 0, 15).with_parent("a", 0);
        let c = stored("c", 2, 4);
        assert_ok!(engine.store().seed(vec![a, b.clone(), c.clone()]).await);
        assert_ok!(engine.store().set_total_score(&form_id(), 14).await);

        // b 仍在载荷里，但它的父题被删除了
        let outcome = engine.reconcile_with_report(FORM, 1, vec![b, c]).await.unwrap();

        assert_eq!(ids(&outcome.nodes), vec!["c"]);
        assert_eq!(outcome.report.deleted, 2);
        assert_eq!(outcome.report.deleted_score, 10);
        assert_eq!(outcome.report.score_delta, -10);
        assert_eq!(outcome.nodes[0].q_idx, 1);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_q_idx_renumbering_after_delete() {
        let engine = engine();
        let seeded = vec![stored("a", 1, 1), stored("b", 2, 1), stored("c", 3, 1), stored("d", 4, 1)];
        assert_ok!(engine.store().seed(seeded).await);

        let outcome = engine
            .reconcile_with_report(FORM, 1, vec![stored("a", 1, 1), stored("c", 3, 1), stored("d", 4, 1)])
            .await
            .unwrap();

        let q: Vec<(String, i64)> = outcome.nodes.iter().map(|n| (n.label(), n.q_idx)).collect();
        assert_eq!(
            q,
            vec![("a".to_string(), 1), ("c".to_string(), 2), ("d".to_string(), 3)]
        );
        assert_eq!(outcome.report.renumbered, 2);
        // a 没有变化，不重写
        assert_eq!(outcome.report.updated, 2);
    }

    #[tokio::test]
    async fn test_child_must_outscore_parent() {
        let engine = engine();
        assert_ok!(engine.store().seed(vec![stored("p", 1, 5)]).await);

        let child = QuestionNode::new(QuestionType::Number, 0)
            .with_id("kid")
            .with_score(5)
            .with_parent("p", 0);
        let result = engine
            .reconcile(FORM, 1, vec![stored("p", 1, 5), child.clone()])
            .await;
        match result {
            Err(AppError::Validation(ValidationError::ParentScoreGuard { question, .. })) => {
                assert_eq!(question, "kid");
            }
            other => panic!("expected parent score guard, got {:?}", other),
        }
        assert_eq!(engine.store().commit_count(), 0);

        let ok = engine
            .reconcile(FORM, 1, vec![stored("p", 1, 5), child.with_score(6)])
            .await;
        assert_ok!(ok);
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_rejected() {
        let engine = engine();
        let missing_form = engine.reconcile("  ", 1, vec![]).await;
        assert!(matches!(
            missing_form,
            Err(AppError::Validation(ValidationError::MissingFormId))
        ));

        let bad_page = engine.reconcile(FORM, 0, vec![]).await;
        assert!(matches!(
            bad_page,
            Err(AppError::Validation(ValidationError::InvalidPage { page: 0 }))
        ));

        let dup = engine
            .reconcile(FORM, 1, vec![stored("a", 1, 1), stored("a", 2, 1)])
            .await;
        assert_err!(dup);
    }

    #[tokio::test]
    async fn test_failed_commit_is_all_or_nothing() {
        let engine = engine();
        assert_ok!(engine.store().seed(vec![stored("a", 1, 3), stored("b", 2, 3)]).await);
        engine.store().set_fail_commits(true);

        let result = engine.reconcile(FORM, 1, vec![stored("b", 2, 9)]).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));

        engine.store().set_fail_commits(false);
        let page = engine.store().find_by_form_page(&form_id(), 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_display_only_score_is_cleared() {
        let engine = engine();
        let display = QuestionNode::new(QuestionType::TextBlock, 1).with_score(9);
        let nodes = engine.reconcile(FORM, 1, vec![display]).await.unwrap();
        assert_eq!(nodes[0].score, 0);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pages_are_independent() {
        let engine = Arc::new(engine());
        let e1 = engine.clone();
        let e2 = engine.clone();
        let h1 = tokio::spawn(async move {
            e1.reconcile(FORM, 1, vec![QuestionNode::new(QuestionType::Number, 1).with_score(2)])
                .await
        });
        let h2 = tokio::spawn(async move {
            e2.reconcile(FORM, 2, vec![QuestionNode::new(QuestionType::Number, 1).with_score(3)])
                .await
        });
        assert_ok!(h1.await.unwrap());
        assert_ok!(h2.await.unwrap());

        assert_eq!(engine.store().find_by_form(&form_id()).await.unwrap().len(), 2);
        assert_eq!(engine.store().total_score(&form_id()).await.unwrap(), 5);
    }
}
