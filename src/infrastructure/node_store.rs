//! 存储接口 - 基础设施层
//!
//! 引擎只通过这里的 trait 访问存储，查询执行、连接管理都在外部实现。

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Identifier, QuestionNode};

/// 一次对账产生的全部写操作
///
/// 存储实现必须把整个批次作为一个原子单元提交：并发读者只能看到
/// 提交前或提交后的状态。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    /// 按 ID 插入或整体替换
    pub upserts: Vec<QuestionNode>,
    /// 按 ID 删除
    pub deletes: Vec<Identifier>,
    /// 表单冗余总分的增量
    pub form_score_delta: i64,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty() && self.form_score_delta == 0
    }
}

/// 题目存储
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// 读取某个表单某一页的全部题目
    async fn find_by_form_page(&self, form_id: &Identifier, page: u32)
        -> AppResult<Vec<QuestionNode>>;

    /// 读取某个表单全部页的题目
    async fn find_by_form(&self, form_id: &Identifier) -> AppResult<Vec<QuestionNode>>;

    /// 按 ID 在整个存储中查找题目（不限表单和页），不存在的 ID 直接忽略
    async fn find_by_ids(&self, ids: &[Identifier]) -> AppResult<Vec<QuestionNode>>;

    /// 原子提交一个写批次
    ///
    /// 批次中的题目必须属于 `form_id`，已存储的同 ID 题目也必须属于 `form_id`。
    async fn commit(&self, form_id: &Identifier, page: u32, batch: WriteBatch) -> AppResult<()>;
}

/// 表单存储：读写冗余的表单总分
#[async_trait]
pub trait FormStore: Send + Sync {
    async fn total_score(&self, form_id: &Identifier) -> AppResult<i64>;

    async fn set_total_score(&self, form_id: &Identifier, total: i64) -> AppResult<()>;
}
