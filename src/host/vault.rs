//! 仓库文件索引与目录型仓库
//!
//! # 设计思路
//!
//! 本地图片引用的写法五花八门：仓库相对路径、相对当前笔记的 `./x.png` / `../x.png`、
//! 或者只有文件名（编辑器的“最短路径”链接）。`VaultIndex` 按以下顺序解析：
//!
//! 1. 解码后的定位符作为仓库相对路径精确匹配
//! 2. 相对当前笔记所在目录解析后匹配
//! 3. 按文件名在整个仓库中查找（先出现者优先）
//!
//! # 实现思路
//!
//! - 索引在一次编排开始时构建一次，之后的查找都是 `HashMap` 命中。
//! - `FsVault` 使用 `walkdir` 遍历目录，跳过以 `.` 开头的隐藏目录/文件。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Vault;

/// 规范化 `/` 分隔的相对路径：去掉 `.`、折叠 `..`，越过根目录时返回 `None`。
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// 笔记所在目录（仓库相对路径），根目录为空串。
pub(crate) fn parent_folder(note_path: &str) -> &str {
    note_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// 一次编排使用的仓库文件索引。
#[derive(Debug, Default)]
pub struct VaultIndex {
    base: PathBuf,
    by_path: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl VaultIndex {
    pub fn build(vault: &dyn Vault) -> Self {
        let mut by_path = HashMap::new();
        let mut by_name = HashMap::new();

        for file in vault.files() {
            let name = file.rsplit('/').next().unwrap_or(file.as_str()).to_string();
            by_name.entry(name).or_insert_with(|| file.clone());
            by_path.insert(file.clone(), file);
        }

        Self {
            base: vault.base_path().to_path_buf(),
            by_path,
            by_name,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    /// 解析已解码的本地定位符，返回仓库内文件的绝对路径。
    pub fn resolve(&self, note_path: &str, decoded_locator: &str) -> Option<PathBuf> {
        self.resolve_relative(note_path, decoded_locator)
            .map(|relative| self.base.join(relative))
    }

    fn resolve_relative(&self, note_path: &str, decoded_locator: &str) -> Option<&String> {
        if let Some(found) = normalize_relative(decoded_locator).and_then(|p| self.by_path.get(&p)) {
            return Some(found);
        }

        let folder = parent_folder(note_path);
        if !folder.is_empty() {
            let joined = format!("{}/{}", folder, decoded_locator);
            if let Some(found) = normalize_relative(&joined).and_then(|p| self.by_path.get(&p)) {
                return Some(found);
            }
        }

        let name = decoded_locator.rsplit(['/', '\\']).next()?;
        self.by_name.get(name)
    }
}

/// 以本地目录作为仓库。
#[derive(Debug, Clone)]
pub struct FsVault {
    base: PathBuf,
    attachment_folder_path: String,
}

impl FsVault {
    pub fn new(base: impl Into<PathBuf>, attachment_folder_path: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            attachment_folder_path: attachment_folder_path.into(),
        }
    }
}

impl Vault for FsVault {
    fn base_path(&self) -> &Path {
        &self.base
    }

    fn files(&self) -> Vec<String> {
        WalkDir::new(&self.base)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::debug!("遍历仓库时跳过条目: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.base).ok()?;
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                Some(parts.join("/"))
            })
            .collect()
    }

    fn attachment_folder_path(&self) -> String {
        self.attachment_folder_path.clone()
    }
}
