//! # Question Tree Engine
//!
//! 表单题目树的对账、展开与评分引擎
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目节点、答案、条件分支边集、表单定义
//! - `Identifier` - 有明确相等语义的 ID
//! - `EdgeSet` - `parentContent` 与 `conditional` 的唯一邻接表
//!
//! ### ② 基础设施层（Infrastructure）
//! - `NodeStore` / `FormStore` - 存储接口
//! - `InMemoryStore` - 整批原子提交的内存实现
//! - `PageLocks` - 按 (表单, 页) 串行化对账
//!
//! ### ③ 业务能力层（Services）
//! - `materialize` - 把无序题目展开成展示顺序
//! - `ComparisonCache` - 单次对账内的结构比较缓存
//! - `ScoringService` - 单题评分与答案形状校验
//!
//! ### ④ 流程层（Workflow）
//! - `ReconcileEngine` - 批量对账（最小写入、级联删除、qIdx 重排、总分维护）
//! - `SubmissionFlow` - 整份答卷评分
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/` - 二进制入口使用的批量表单驱动

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{FormStore, InMemoryStore, NodeStore, WriteBatch};
pub use models::{AnswerValue, Identifier, QuestionNode, QuestionType, Response, ResponseEntry};
pub use orchestrator::App;
pub use services::{materialize, number_questions, ScoringService};
pub use workflow::{ReconcileEngine, ReconcileReport, SubmissionFlow};
