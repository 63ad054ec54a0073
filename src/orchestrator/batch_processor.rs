//! 批量表单处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量表单的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、写日志文件头、创建存储和流程对象
//! 2. **批量加载**：扫描并加载所有表单定义（`Vec<FormDefinition>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将表单分批次处理，每批完成后再开始下一批
//! 5. **全局统计**：汇总所有表单的处理结果

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::InMemoryStore;
use crate::models::{load_all_form_definitions, FormDefinition};
use crate::orchestrator::form_processor::{self, FormStats};
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_forms_loaded, log_startup,
    print_run_summary,
};
use crate::workflow::{ReconcileEngine, SubmissionFlow};

/// 应用主结构
pub struct App {
    config: Config,
    engine: Arc<ReconcileEngine<InMemoryStore>>,
    submission: Arc<SubmissionFlow<InMemoryStore>>,
}

/// 整次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// 加载到的表单数
    pub total: usize,
    /// 所有页都对账成功的表单数
    pub success: usize,
    pub failed: usize,
    pub failed_pages: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub responses_scored: usize,
    pub responses_rejected: usize,
}

impl RunStats {
    /// 累加一个表单的结果；`None` 表示表单处理中途失败
    pub fn absorb(&mut self, form: Option<&FormStats>) {
        let Some(form) = form else {
            self.failed += 1;
            return;
        };
        if form.failed_pages == 0 {
            self.success += 1;
        } else {
            self.failed += 1;
        }
        self.failed_pages += form.failed_pages;
        self.inserted += form.inserted;
        self.updated += form.updated;
        self.deleted += form.deleted;
        self.responses_scored += form.responses_scored;
        self.responses_rejected += form.responses_rejected;
    }
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        // 初始化日志文件
        init_log_file(&config)?;

        log_startup(&config);

        let store = Arc::new(InMemoryStore::new());
        let engine = Arc::new(ReconcileEngine::new(store.clone(), &config));
        let submission = Arc::new(SubmissionFlow::new(store, &config));

        Ok(Self {
            config,
            engine,
            submission,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        let all_forms = self.load_forms().await?;

        if all_forms.is_empty() {
            warn!("⚠️ 没有找到待处理的表单定义文件，程序结束");
            return Ok(RunStats::default());
        }

        log_forms_loaded(&all_forms, self.config.max_concurrent_forms);

        let stats = self.process_all_forms(all_forms).await?;

        print_run_summary(&stats, &self.config.output_log_file)?;

        Ok(stats)
    }

    async fn load_forms(&self) -> Result<Vec<FormDefinition>> {
        info!("\n📁 正在扫描表单定义...");
        load_all_form_definitions(&self.config.form_folder)
            .await
            .with_context(|| format!("无法加载表单目录: {}", self.config.form_folder))
    }

    /// 处理所有表单
    async fn process_all_forms(&self, all_forms: Vec<FormDefinition>) -> Result<RunStats> {
        let batch_size = self.config.max_concurrent_forms.max(1);
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total_forms = all_forms.len();
        let total_batches = total_forms.div_ceil(batch_size);
        let mut stats = RunStats {
            total: total_forms,
            ..Default::default()
        };

        // 分批处理
        for (batch_idx, batch_forms) in all_forms.chunks(batch_size).enumerate() {
            let batch_start = batch_idx * batch_size;
            let batch_num = batch_idx + 1;

            log_batch_start(batch_num, total_batches, batch_forms);

            let results = self
                .process_batch(batch_forms, batch_start, semaphore.clone())
                .await?;

            let mut batch_stats = RunStats {
                total: results.len(),
                ..Default::default()
            };
            for result in &results {
                batch_stats.absorb(result.as_ref());
                stats.absorb(result.as_ref());
            }

            log_batch_complete(batch_num, &batch_stats);
        }

        Ok(stats)
    }

    /// 处理单个批次，失败的表单返回 None
    async fn process_batch(
        &self,
        batch_forms: &[FormDefinition],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<Vec<Option<FormStats>>> {
        let mut handles = Vec::with_capacity(batch_forms.len());

        for (idx, form) in batch_forms.iter().enumerate() {
            let form_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let engine = self.engine.clone();
            let submission = self.submission.clone();
            let config = self.config.clone();
            let form = form.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                form_processor::process_form(&engine, &submission, form, form_index, &config)
                    .await
                    .map_err(|e| {
                        error!("[表单 {}] ❌ 处理过程中发生错误: {:#}", form_index, e);
                        e
                    })
            }));
        }

        // 等待本批所有任务完成
        let results = join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(Ok(form_stats)) => Some(form_stats),
                Ok(Err(_)) => None,
                Err(e) => {
                    error!("表单任务执行失败: {}", e);
                    None
                }
            })
            .collect();

        Ok(results)
    }
}
