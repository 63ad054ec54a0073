//! 日志工具模块
//!
//! 批量对账运行时的横幅输出，以及写入日志文件的运行摘要

use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::models::FormDefinition;
use crate::orchestrator::RunStats;

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 初始化日志文件，文件头记录本次运行的对账参数
pub fn init_log_file(config: &Config) -> Result<()> {
    let log_header = format!(
        "{bar}\n表单对账日志 - {}\n表单目录: {}\n并发表单数: {}\n比较缓存容量: {}\n文本相似度阈值: {:.2}\n{bar}\n\n",
        now(),
        config.form_folder,
        config.max_concurrent_forms,
        config.comparison_cache_capacity,
        config.text_similarity_threshold,
        bar = "=".repeat(60),
    );
    fs::write(&config.output_log_file, log_header)
        .with_context(|| format!("无法写入日志文件: {}", config.output_log_file))?;
    Ok(())
}

pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 题目树对账与评分");
    info!("📁 表单目录: {}", config.form_folder);
    info!("📊 最大并发表单数: {}", config.max_concurrent_forms);
    info!(
        "🧮 比较缓存容量: {} | 文本相似度阈值: {:.2}",
        config.comparison_cache_capacity, config.text_similarity_threshold
    );
    info!("{}", "=".repeat(60));
}

/// 记录表单加载信息（题目数与示例答卷数）
pub fn log_forms_loaded(forms: &[FormDefinition], max_concurrent: usize) {
    let questions: usize = forms.iter().map(|f| f.questions.len()).sum();
    let responses: usize = forms.iter().map(|f| f.responses.len()).sum();
    info!(
        "✓ 找到 {} 个表单，共 {} 道题目、{} 份示例答卷",
        forms.len(),
        questions,
        responses
    );
    info!("📋 将以每批 {} 个表单的方式对账\n", max_concurrent);
}

/// 记录批次开始信息，列出本批的表单ID
pub fn log_batch_start(batch_num: usize, total_batches: usize, forms: &[FormDefinition]) {
    let ids: Vec<String> = forms.iter().map(|f| f.form_id.to_string()).collect();
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批表单: {}", ids.join(", "));
    info!("{}", "=".repeat(60));
}

pub fn log_batch_complete(batch_num: usize, stats: &RunStats) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{} | 新增 {} 更新 {} 删除 {} | 答卷评分 {} 拒绝 {}",
        batch_num,
        stats.success,
        stats.total,
        stats.inserted,
        stats.updated,
        stats.deleted,
        stats.responses_scored,
        stats.responses_rejected
    );
    info!("{}", "─".repeat(60));
}

/// 运行摘要的各行文本，横幅和日志文件共用
pub fn summary_lines(stats: &RunStats) -> Vec<String> {
    vec![
        format!("✅ 表单成功: {}/{}", stats.success, stats.total),
        format!("❌ 表单失败: {}（失败页 {}）", stats.failed, stats.failed_pages),
        format!(
            "🔁 题目对账: 新增 {} / 更新 {} / 删除 {}",
            stats.inserted, stats.updated, stats.deleted
        ),
        format!(
            "📝 答卷评分: 成功 {} / 拒绝 {}",
            stats.responses_scored, stats.responses_rejected
        ),
    ]
}

/// 打印最终统计，并追加到日志文件末尾
pub fn print_run_summary(stats: &RunStats, log_file_path: &str) -> Result<()> {
    let lines = summary_lines(stats);
    let finished_at = now();

    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!("完成时间: {}", finished_at);
    info!("{}", "=".repeat(60));
    for line in &lines {
        info!("{}", line);
    }
    info!("{}", "=".repeat(60));

    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path))?;
    writeln!(file, "完成时间: {}", finished_at)?;
    for line in &lines {
        writeln!(file, "{}", line)?;
    }

    info!("\n日志已保存至: {}", log_file_path);
    Ok(())
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("你好世界", 2), "你好...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[test]
    fn test_summary_reports_reconcile_and_scoring_counts() {
        let stats = RunStats {
            total: 3,
            success: 2,
            failed: 1,
            failed_pages: 1,
            inserted: 7,
            updated: 2,
            deleted: 4,
            responses_scored: 5,
            responses_rejected: 1,
        };
        let lines = summary_lines(&stats);
        assert!(lines[0].contains("2/3"));
        assert!(lines[1].contains("失败页 1"));
        assert!(lines[2].contains("新增 7"));
        assert!(lines[2].contains("删除 4"));
        assert!(lines[3].contains("成功 5"));
        assert!(lines[3].contains("拒绝 1"));
    }

    #[test]
    fn test_log_file_gets_header_then_summary() {
        let path = std::env::temp_dir().join(format!(
            "question_tree_engine_log_{}.txt",
            ulid::Ulid::new()
        ));
        let config = Config {
            output_log_file: path.to_string_lossy().into_owned(),
            ..Config::default()
        };

        init_log_file(&config).unwrap();
        let stats = RunStats {
            total: 1,
            success: 1,
            responses_scored: 2,
            ..Default::default()
        };
        print_run_summary(&stats, &config.output_log_file).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("表单对账日志"));
        assert!(text.contains(&format!("表单目录: {}", config.form_folder)));
        assert!(text.contains("答卷评分: 成功 2"));
        fs::remove_file(&path).ok();
    }
}
