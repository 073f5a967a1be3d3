//! # 下载编排模块（download）
//!
//! ## 设计思路
//!
//! 上传的逆向流程：把笔记里的网络图片下载到附件目录，再把引用改写为本地相对路径。
//!
//! 1. 提取全部引用，只保留定位符为网络 URL 且 URL 末段扩展名是图片的项
//! 2. 确定附件目录（不存在则创建）
//! 3. 逐项下载，文件名为 `image-<解码后的主文件名>`，冲突时改用随机名
//! 4. 全部下载结束后，在“当前”文本上按顺序逐条替换首个出现位置，回写一次
//! 5. 汇总计数（总数 / 成功 / 失败）
//!
//! ## 实现思路
//!
//! - 单项失败不终止整批，只记日志并计入失败数。
//! - 改写后的链接是相对当前笔记所在目录的路径，每一段单独做百分号编码，以 `/` 连接。

mod error;
mod loader;

pub use error::DownloadError;
pub use loader::ImageLoader;

use std::path::Path;

use crate::error::AppError;
use crate::host::{DocumentEditor, Vault, parent_folder};
use crate::reference::text::replace_first;
use crate::reference::{ImageReference, extract_references, is_image_extension, percent_decode, url_asset};
use crate::settings::PluginSettings;
use crate::storage::{ensure_attachment_dir, relative_path, sanitize_file_stem, unique_image_target};

/// 下载汇总。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl DownloadSummary {
    pub fn message(&self) -> String {
        format!(
            "all: {}\nsuccess: {}\nfailed: {}",
            self.total, self.succeeded, self.failed
        )
    }
}

/// 一项成功的下载：原引用 + 改写后的 Markdown。
#[derive(Debug)]
struct Downloaded {
    source_span: String,
    replacement: String,
}

pub struct DownloadOrchestrator {
    loader: ImageLoader,
}

impl DownloadOrchestrator {
    pub fn new(settings: &PluginSettings) -> Result<Self, AppError> {
        Ok(Self {
            loader: ImageLoader::new(settings)?,
        })
    }

    /// 筛选可下载的引用：网络 URL，且 URL 末段的扩展名是图片。
    pub fn candidates(text: &str) -> Vec<ImageReference> {
        extract_references(text)
            .into_iter()
            .filter(|reference| reference.is_network())
            .filter(|reference| {
                let asset = url_asset(&reference.locator);
                asset
                    .rfind('.')
                    .is_some_and(|idx| is_image_extension(&asset[idx..]))
            })
            .collect()
    }

    /// 下载当前笔记中的全部网络图片并改写引用。
    pub async fn run(&self, editor: &dyn DocumentEditor, vault: &dyn Vault) -> Result<DownloadSummary, AppError> {
        let candidates = Self::candidates(&editor.value());
        let total = candidates.len();
        if total == 0 {
            log::info!("🈳 没有需要下载的网络图片");
            return Ok(DownloadSummary::default());
        }

        let note_path = editor.file_path();
        let base = vault.base_path();
        let dir = ensure_attachment_dir(base, &note_path, &vault.attachment_folder_path()).await?;
        let note_dir = base.join(parent_folder(&note_path));
        log::info!("📥 开始下载 {} 张网络图片 → {}", total, dir.display());

        let mut downloaded = Vec::with_capacity(total);
        for reference in &candidates {
            match self.download_one(reference, &dir, &note_dir).await {
                Ok(item) => downloaded.push(item),
                Err(err) => log::warn!("⚠️ 下载失败，跳过 - {}: {}", reference.locator, err),
            }
        }

        let mut text = editor.value();
        let mut succeeded = 0;
        for item in &downloaded {
            match replace_first(&text, &item.source_span, &item.replacement) {
                Some(next) => {
                    text = next;
                    succeeded += 1;
                }
                None => log::warn!("⚠️ 文本中已找不到原引用，跳过回写 - {}", item.source_span),
            }
        }
        if succeeded > 0 {
            editor.set_value(&text);
        }

        let summary = DownloadSummary {
            total,
            succeeded,
            failed: total - succeeded,
        };
        log::info!("✅ 下载完成 - 成功 {} / 失败 {}", summary.succeeded, summary.failed);
        Ok(summary)
    }

    async fn download_one(
        &self,
        reference: &ImageReference,
        dir: &Path,
        note_dir: &Path,
    ) -> Result<Downloaded, AppError> {
        let asset = percent_decode(url_asset(&reference.locator));
        let (stem, ext) = match asset.rfind('.') {
            Some(idx) => (&asset[..idx], &asset[idx..]),
            None => (asset.as_str(), ""),
        };

        let (name, target) = unique_image_target(dir, &sanitize_file_stem(stem), ext)?;
        self.loader.download_to(&reference.locator, &target).await?;

        let link = encode_link(&relative_path(note_dir, &target));
        Ok(Downloaded {
            source_span: reference.source_span.clone(),
            replacement: format!("![{}]({})", name, link),
        })
    }
}

/// 逐段百分号编码，保留 `/` 分隔符。
fn encode_link(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
