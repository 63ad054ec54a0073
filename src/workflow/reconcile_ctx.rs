//! 对账上下文
//!
//! 封装"我正在对账哪张表单的第几页"这一信息

use std::fmt::Display;

use crate::models::Identifier;

/// 对账上下文
#[derive(Debug, Clone)]
pub struct ReconcileCtx {
    /// 表单ID
    pub form_id: Identifier,

    /// 页码（从1开始）
    pub page: u32,
}

impl ReconcileCtx {
    pub fn new(form_id: Identifier, page: u32) -> Self {
        Self { form_id, page }
    }
}

impl Display for ReconcileCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[表单 {} 第 {} 页]", self.form_id, self.page)
    }
}
