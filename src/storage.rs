//! 附件目录管理模块
//!
//! # 设计思路
//!
//! 统一管理下载图片的落盘位置，规则与编辑器的附件目录设置一致：
//! - `./xxx`：当前笔记所在目录下的子目录
//! - 其他值：相对仓库根目录（`/` 即根目录本身）
//!
//! 目录不存在时自动创建，避免上层判断。
//!
//! # 实现思路
//!
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。
//! - 目标文件名冲突时改用随机名，循环直到找到未占用的名字。

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::AppError;
use crate::host::{normalize_relative, parent_folder};

const RANDOM_NAME_LEN: usize = 5;
const MAX_NAME_ATTEMPTS: usize = 32;

/// 计算附件目录（绝对路径），不创建。
pub fn attachment_dir(base: &Path, note_path: &str, attachment_folder_path: &str) -> PathBuf {
    let setting = attachment_folder_path.trim();
    let relative = if setting.starts_with("./") {
        format!("{}/{}", parent_folder(note_path), setting)
    } else {
        setting.to_string()
    };

    match normalize_relative(&relative) {
        Some(rel) if !rel.is_empty() => base.join(rel),
        Some(_) => base.to_path_buf(),
        None => {
            log::warn!("⚠️ 附件目录越过仓库根目录，回退为根目录: {}", attachment_folder_path);
            base.to_path_buf()
        }
    }
}

/// 获取附件目录，不存在时自动创建。
pub async fn ensure_attachment_dir(
    base: &Path,
    note_path: &str,
    attachment_folder_path: &str,
) -> Result<PathBuf, AppError> {
    let dir = attachment_dir(base, note_path, attachment_folder_path);
    if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(format!("创建附件目录 '{}' 失败: {}", dir.display(), e)))?;
        log::info!("📁 已创建附件目录 - {}", dir.display());
    }
    Ok(dir)
}

/// 把文件名中不允许的字符替换为 `-`。
pub fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect()
}

pub fn random_name() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// 在 `dir` 中为 `image-<stem><ext>` 选一个未占用的文件名。
///
/// 返回 `(显示名, 目标路径)`，显示名不含扩展名。
pub fn unique_image_target(dir: &Path, stem: &str, ext: &str) -> Result<(String, PathBuf), AppError> {
    let name = format!("image-{}", stem);
    let target = dir.join(format!("{}{}", name, ext));
    if !target.exists() {
        return Ok((name, target));
    }

    for _ in 0..MAX_NAME_ATTEMPTS {
        let name = format!("image-{}", random_name());
        let target = dir.join(format!("{}{}", name, ext));
        if !target.exists() {
            log::debug!("文件名冲突，改用随机名 - {}", target.display());
            return Ok((name, target));
        }
    }

    Err(AppError::Storage(format!("无法在 '{}' 中找到可用文件名", dir.display())))
}

/// 计算 `target` 相对 `from_dir` 的路径（`/` 分隔）。
///
/// 两者都应为绝对路径；无公共前缀时退回 `target` 本身。
pub fn relative_path(from_dir: &Path, target: &Path) -> String {
    let from: Vec<_> = from_dir.components().collect();
    let to: Vec<_> = target.components().collect();

    let common = from.iter().zip(to.iter()).take_while(|(a, b)| a == b).count();
    if common == 0 {
        return target.to_string_lossy().replace('\\', "/");
    }

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), from.len() - common).collect();
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );
    parts.join("/")
}
