use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AppError, AppResult, FileError};
use crate::models::form::FormDefinition;

/// 从 TOML 文件加载表单定义
pub async fn load_form_definition(toml_file_path: &Path) -> AppResult<FormDefinition> {
    let path_display = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_display, e))?;

    let form: FormDefinition = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path_display.clone(),
            source: e,
        })
    })?;

    Ok(form.with_file_path(path_display))
}

/// 从文件夹中加载所有表单定义，按文件名排序
///
/// 单个文件解析失败只记录警告，不影响其他文件。
pub async fn load_all_form_definitions(folder_path: &str) -> AppResult<Vec<FormDefinition>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut forms = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_form_definition(&path).await {
            Ok(form) => {
                tracing::info!("成功加载 {} 道题目", form.questions.len());
                forms.push(form);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(forms)
}
