//! 单个表单处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理单个表单定义文件，是表单级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **逐页对账**：按页把题目交给 `ReconcileEngine`
//! 2. **展示大纲**：读回整张表单，展开题目树并编号
//! 3. **示例答卷**：用 `SubmissionFlow` 给表单自带的答卷评分
//! 4. **统计输出**：记录新增/更新/删除数量和答卷得分

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::infrastructure::{FormStore, NodeStore};
use crate::models::FormDefinition;
use crate::services::{materialize, number_questions, NumberedQuestion};
use crate::utils::truncate_text;
use crate::workflow::{ReconcileEngine, SubmissionFlow};

/// 单个表单的处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormStats {
    pub pages: usize,
    pub failed_pages: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub responses_scored: usize,
    pub responses_rejected: usize,
    /// 表单冗余总分（对账后从存储读回）
    pub total_score: i64,
}

/// 处理单个表单
///
/// # 参数
/// - `engine`: 对账引擎
/// - `submission`: 答卷评分流程
/// - `form`: 表单定义
/// - `form_index`: 表单索引（用于日志）
/// - `config`: 配置
///
/// # 返回
/// 返回处理统计；页面对账失败不会中断其他页面
pub async fn process_form<S>(
    engine: &ReconcileEngine<S>,
    submission: &SubmissionFlow<S>,
    form: FormDefinition,
    form_index: usize,
    config: &Config,
) -> Result<FormStats>
where
    S: NodeStore + FormStore,
{
    let form_id = form.form_id.to_string();
    let pages = form.pages();

    log_form_start(form_index, &form.title, &form_id, form.questions.len(), pages.len());

    let mut stats = FormStats {
        pages: pages.len(),
        ..Default::default()
    };

    // ========== 逐页对账 ==========
    for (page, questions) in pages {
        match engine.reconcile_with_report(&form_id, page, questions).await {
            Ok(outcome) => {
                stats.inserted += outcome.report.inserted;
                stats.updated += outcome.report.updated;
                stats.deleted += outcome.report.deleted;
            }
            Err(e) => {
                error!("[表单 {}] ❌ 第 {} 页对账失败: {}", form_index, page, e);
                stats.failed_pages += 1;
            }
        }
    }

    // ========== 展示大纲 ==========
    let outline = build_outline(engine.store().as_ref(), &form).await?;
    log_outline(form_index, &outline, config.verbose_logging);

    // ========== 示例答卷 ==========
    for draft in form.responses {
        let who = draft.respondent.clone().unwrap_or_else(|| "匿名".to_string());
        match submission
            .score_submission(&form_id, draft.respondent, draft.entries)
            .await
        {
            Ok(response) => {
                info!(
                    "[表单 {}] 📝 答卷 {} 得分 {}",
                    form_index, who, response.total_score
                );
                stats.responses_scored += 1;
            }
            Err(e) if e.is_client_error() => {
                warn!("[表单 {}] ⚠️ 答卷 {} 被拒绝: {}", form_index, who, e);
                stats.responses_rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    stats.total_score = engine.store().total_score(&form.form_id).await?;

    log_form_complete(form_index, &stats);

    Ok(stats)
}

/// 读回整张表单，逐页展开后统一编号
async fn build_outline<S: NodeStore>(
    store: &S,
    form: &FormDefinition,
) -> Result<Vec<(u32, NumberedQuestion)>> {
    let nodes = store.find_by_form(&form.form_id).await?;
    let mut page_numbers: Vec<u32> = nodes.iter().map(|n| n.page).collect();
    page_numbers.sort_unstable();
    page_numbers.dedup();

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut pages = Vec::with_capacity(nodes.len());
    for page in page_numbers {
        let page_nodes: Vec<_> = nodes.iter().filter(|n| n.page == page).cloned().collect();
        for node in materialize(&page_nodes) {
            pages.push(page);
            ordered.push(node);
        }
    }

    Ok(pages.into_iter().zip(number_questions(ordered)).collect())
}

fn log_outline(form_index: usize, outline: &[(u32, NumberedQuestion)], verbose: bool) {
    for (page, item) in outline {
        let number = match item.number {
            Some(n) => format!("{:>3}.", n),
            None => "   ↳".to_string(),
        };
        let line = format!(
            "[表单 {}] 第 {} 页 {} [{}] {} ({} 分)",
            form_index,
            page,
            number,
            item.node.question_type,
            truncate_text(&item.node.content, 30),
            item.node.score
        );
        if verbose {
            info!("{}", line);
        } else {
            debug!("{}", line);
        }
    }
}

fn log_form_start(form_index: usize, title: &str, form_id: &str, questions: usize, pages: usize) {
    info!("\n{}", "─".repeat(60));
    info!("[表单 {}] 开始处理: {} ({})", form_index, title, form_id);
    info!("[表单 {}] 共 {} 道题目, {} 页", form_index, questions, pages);
}

fn log_form_complete(form_index: usize, stats: &FormStats) {
    info!(
        "[表单 {}] ✓ 处理完成: 新增 {}, 更新 {}, 删除 {}, 失败页 {}/{}",
        form_index, stats.inserted, stats.updated, stats.deleted, stats.failed_pages, stats.pages
    );
    info!(
        "[表单 {}] 表单总分 {}, 答卷评分 {} 份, 拒绝 {} 份",
        form_index, stats.total_score, stats.responses_scored, stats.responses_rejected
    );
}
