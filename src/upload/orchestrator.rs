//! 批量上传编排
//!
//! # 设计思路
//!
//! 输入是过滤后的工作清单，输出是汇总计数，副作用是一次整篇文本回写：
//!
//! 1. 解析：本地引用解析为仓库内绝对路径，网络引用原样作为“路径”
//! 2. 解析不到的本地引用静默丢弃，只体现在 `failed` 计数里
//! 3. 解析结果为空：不发起任何上传
//! 4. 按稳定顺序调用 `UploaderPort::upload_files`
//! 5. 成功：第 N 个 URL 对应第 N 个路径（位置是唯一的对应关系），
//!    每一对都在“当前”文本上重新查找 `source_span` 并替换首个出现位置
//! 6. 开启“删除源文件”时，删除已上传且不再被引用的本地文件（失败只记日志）
//! 7. 失败：不改动文本
//!
//! # 实现思路
//!
//! - 上传返回后才读取全文，所有替换在内存中依次完成，最后 `set_value` 一次，
//!   对用户来说是一次原子的整篇替换。
//! - 后端返回的 URL 数量与输入不一致时，只消费可用长度，多出来的条目计为失败。

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::host::{DocumentEditor, VaultIndex};
use crate::reference::text::replace_first;
use crate::reference::{ImageReference, extract_references, is_image_path};
use crate::uploader::UploaderPort;

/// 已解析、可直接交给上传后端的工作项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub reference: ImageReference,
    /// 交给后端的路径：本地绝对路径或原始 URL。
    pub upload_path: String,
    /// 本地文件的绝对路径；网络图片为 `None`。
    pub local_path: Option<PathBuf>,
}

impl WorkItem {
    pub fn network(reference: ImageReference) -> Self {
        Self {
            upload_path: reference.locator.clone(),
            reference,
            local_path: None,
        }
    }

    pub fn local(reference: ImageReference, path: PathBuf) -> Self {
        Self {
            upload_path: path.to_string_lossy().to_string(),
            reference,
            local_path: Some(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    /// 没有可上传的文件，未发起上传。
    NothingToUpload,
    /// 上传后端返回成功，文本已回写。
    Completed,
    /// 上传后端返回失败，文本未改动。
    Failed,
}

/// 一次编排的汇总。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub status: UploadStatus,
    pub total_found: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl UploadSummary {
    fn new(status: UploadStatus, total_found: usize, succeeded: usize) -> Self {
        Self {
            status,
            total_found,
            succeeded,
            failed: total_found.saturating_sub(succeeded),
        }
    }

    /// 面向用户的汇总文案。
    pub fn message(&self) -> String {
        format!(
            "all: {}\nsuccess: {}\nfailed: {}",
            self.total_found, self.succeeded, self.failed
        )
    }
}

pub struct UploadOrchestrator {
    uploader: Arc<dyn UploaderPort>,
    delete_source: bool,
}

impl UploadOrchestrator {
    pub fn new(uploader: Arc<dyn UploaderPort>, delete_source: bool) -> Self {
        Self {
            uploader,
            delete_source,
        }
    }

    /// 把过滤后的引用解析为工作项，保持原有顺序。
    pub fn resolve(&self, worklist: &[ImageReference], index: &VaultIndex, note_path: &str) -> Vec<WorkItem> {
        worklist
            .iter()
            .filter_map(|reference| {
                if reference.is_network() {
                    return Some(WorkItem::network(reference.clone()));
                }

                let decoded = reference.decoded_locator();
                match index.resolve(note_path, &decoded) {
                    Some(path) if is_image_path(&path.to_string_lossy()) => {
                        Some(WorkItem::local(reference.clone(), path))
                    }
                    Some(path) => {
                        log::debug!("跳过非图片文件 - {}", path.display());
                        None
                    }
                    None => {
                        log::debug!("未在仓库中找到文件，跳过 - {}", decoded);
                        None
                    }
                }
            })
            .collect()
    }

    /// 完整流程：解析 + 上传 + 回写。
    pub async fn run(
        &self,
        editor: &dyn DocumentEditor,
        worklist: &[ImageReference],
        index: &VaultIndex,
    ) -> UploadSummary {
        let items = self.resolve(worklist, index, &editor.file_path());
        self.upload(editor, worklist.len(), items).await
    }

    /// 上传已解析的工作项并回写文本。
    ///
    /// `total_found` 为解析前的引用数量，解析阶段丢弃的条目计入 `failed`。
    pub async fn upload(&self, editor: &dyn DocumentEditor, total_found: usize, items: Vec<WorkItem>) -> UploadSummary {
        if items.is_empty() {
            log::info!("🈳 没有解析到可上传的图片文件");
            return UploadSummary::new(UploadStatus::NothingToUpload, total_found, 0);
        }

        let paths: Vec<String> = items.iter().map(|item| item.upload_path.clone()).collect();
        log::info!(
            "📤 开始上传 - 共 {} 个引用，解析出 {} 个文件（后端: {}）",
            total_found,
            paths.len(),
            self.uploader.name()
        );

        let result = self.uploader.upload_files(&paths).await;
        if !result.success {
            log::error!(
                "❌ 批量上传失败: {}",
                result.error_message.as_deref().unwrap_or("unknown")
            );
            return UploadSummary::new(UploadStatus::Failed, total_found, 0);
        }

        if result.result_urls.len() != items.len() {
            log::warn!(
                "⚠️ 上传结果数量与输入不一致（输入 {}，结果 {}），只使用可对应部分",
                items.len(),
                result.result_urls.len()
            );
        }

        let mut text = editor.value();
        let mut replaced: Vec<&WorkItem> = Vec::with_capacity(items.len());
        for (item, url) in items.iter().zip(result.result_urls.iter()) {
            let replacement = format!("![{}]({})", item.reference.display_name, url);
            match replace_first(&text, &item.reference.source_span, &replacement) {
                Some(next) => {
                    text = next;
                    replaced.push(item);
                }
                None => log::warn!("⚠️ 文本中已找不到原引用，跳过回写 - {}", item.reference.source_span),
            }
        }

        if !replaced.is_empty() {
            editor.set_value(&text);
        }

        if self.delete_source {
            self.delete_sources(&text, &replaced).await;
        }

        let summary = UploadSummary::new(UploadStatus::Completed, total_found, replaced.len());
        log::info!(
            "✅ 上传完成 - 成功 {} / 失败 {}",
            summary.succeeded,
            summary.failed
        );
        summary
    }

    /// 删除已上传且不再被引用的本地源文件，失败只记日志。
    async fn delete_sources(&self, text: &str, replaced: &[&WorkItem]) {
        // 写法不同的引用也可能指向同一文件，按文件名保守判断
        let still_referenced: HashSet<String> = extract_references(text)
            .iter()
            .filter(|reference| !reference.is_network())
            .map(ImageReference::file_name)
            .collect();

        let mut seen = HashSet::new();
        for item in replaced {
            let Some(path) = &item.local_path else {
                continue;
            };
            if !seen.insert(path.clone()) {
                continue;
            }
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if text.contains(&item.reference.source_span) || still_referenced.contains(&file_name) {
                log::debug!("源文件仍被引用，保留 - {}", path.display());
                continue;
            }

            match tokio::fs::remove_file(path).await {
                Ok(()) => log::info!("🗑️ 已删除源文件 - {}", path.display()),
                Err(err) => log::warn!("⚠️ 删除源文件失败 - {}: {}", path.display(), err),
            }
        }
    }
}
