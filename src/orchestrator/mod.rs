//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，只被二进制入口使用。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量表单处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载表单定义（Vec<FormDefinition>）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `form_processor` - 单个表单处理器
//! - 逐页调用对账引擎
//! - 读回表单，展开题目树并编号
//! - 给表单自带的示例答卷评分
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<FormDefinition>)
//!     ↓
//! form_processor (处理一张表单的所有页)
//!     ↓
//! workflow::{ReconcileEngine, SubmissionFlow}
//!     ↓
//! services (能力层：materialize / 结构比较 / 评分)
//!     ↓
//! infrastructure (存储：NodeStore / FormStore)
//! ```

pub mod batch_processor;
pub mod form_processor;

pub use batch_processor::{App, RunStats};
pub use form_processor::{process_form, FormStats};
