use crate::error::{AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 表单定义（TOML）存放目录
    pub form_folder: String,
    /// 同时处理的表单数量
    pub max_concurrent_forms: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- 引擎配置 ---
    /// 单次对账中结构比较缓存的容量
    pub comparison_cache_capacity: usize,
    /// 文本题词集相似度阈值（严格大于才给满分）
    pub text_similarity_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            form_folder: "forms".to_string(),
            max_concurrent_forms: 8,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            comparison_cache_capacity: 1000,
            text_similarity_threshold: 0.8,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            form_folder: std::env::var("FORM_FOLDER").unwrap_or(default.form_folder),
            max_concurrent_forms: std::env::var("MAX_CONCURRENT_FORMS").ok().and_then(|v| v.parse().ok()).filter(|n| *n > 0).unwrap_or(default.max_concurrent_forms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            comparison_cache_capacity: std::env::var("COMPARISON_CACHE_CAPACITY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.comparison_cache_capacity),
            text_similarity_threshold: std::env::var("TEXT_SIMILARITY_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.text_similarity_threshold),
        }
    }
}

impl Config {
    /// 校验配置取值范围
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.text_similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                name: "TEXT_SIMILARITY_THRESHOLD".to_string(),
                value: self.text_similarity_threshold.to_string(),
                expected: "0 到 1 之间的小数".to_string(),
            }
            .into());
        }
        if self.comparison_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "COMPARISON_CACHE_CAPACITY".to_string(),
                value: "0".to_string(),
                expected: "正整数".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
