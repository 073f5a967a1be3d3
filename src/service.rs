//! # 服务门面（service）
//!
//! ## 设计思路
//!
//! 宿主事件（命令、粘贴、拖放、文件菜单）统一抽象为 `DocumentRequest` 消息，
//! `ImageAutoUpload::dispatch` 把每条消息变成一次显式的流水线调用：
//!
//! ```text
//! UploadAll    → extract → filter → resolve → upload → substitute
//! UploadFile   → extract → 按文件名匹配 → upload → substitute
//! DownloadAll  → extract → download → substitute
//! Paste        → 网络图片文本上传 + 剪贴板图片占位符上传
//! Drop         → 每个文件一个占位符 → 批量上传 → 按位置解析占位符
//! ```
//!
//! ## 实现思路
//!
//! - 所有错误都在这里终止：写一条诊断日志 + 一条通用提示，绝不抛回宿主。
//! - 整篇回写的流程先经过 `DocumentGate`，同一笔记同时只允许一个。
//! - 粘贴由服务完整执行（包括默认的文本插入），这样网络图片替换一定发生在
//!   粘贴文本落入文档之后；只要服务改动了文档就返回 `true`，宿主不得再执行默认粘贴。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::download::DownloadOrchestrator;
use crate::error::AppError;
use crate::host::{DocumentEditor, Notifier, Vault, VaultIndex};
use crate::reference::{ImageReference, extract_references, filter_references, is_black_domain, is_image_path};
use crate::settings::PluginSettings;
use crate::upload::{DocumentGate, PlaceholderTracker, UploadOrchestrator, UploadStatus, WorkItem};
use crate::uploader::{UploaderPort, build_uploader};

/// 笔记 front-matter 中的上传开关。
pub const FRONT_MATTER_KEY: &str = "image-auto-upload";

pub const NOTICE_NO_IMAGES: &str = "No image files found";
pub const NOTICE_UPLOAD_ERROR: &str = "Upload error";
pub const NOTICE_DOWNLOAD_ERROR: &str = "Download error";
pub const NOTICE_BUSY: &str = "Please wait, this note is already being processed";

/// 剪贴板中的一个文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardFile {
    pub name: String,
    pub mime: String,
}

/// 一次粘贴携带的剪贴板内容。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub text: String,
    pub files: Vec<ClipboardFile>,
}

impl ClipboardPayload {
    fn first_is_image(&self) -> bool {
        self.files.first().is_some_and(|file| file.mime.starts_with("image"))
    }
}

/// 拖入编辑器的一个本地文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub name: String,
    pub mime: String,
    pub path: PathBuf,
}

impl DroppedFile {
    /// 按文件签名推断 MIME，识别不了时按扩展名兜底。
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mime = match infer::get_from_path(&path) {
            Ok(Some(kind)) => kind.mime_type().to_string(),
            _ if is_image_path(&name) => {
                format!("image/{}", crate::reference::extension_of(&name).trim_start_matches('.'))
            }
            _ => "application/octet-stream".to_string(),
        };

        Self { name, mime, path }
    }
}

/// 宿主发来的文档变更请求。
#[derive(Debug, Clone)]
pub enum DocumentRequest {
    /// 上传笔记中的全部图片。
    UploadAll,
    /// 下载笔记中的全部网络图片。
    DownloadAll,
    /// 上传仓库内的一个图片文件（仓库相对路径），并改写所有引用它的位置。
    UploadFile(String),
    Paste(ClipboardPayload),
    Drop(Vec<DroppedFile>),
}

pub struct ImageAutoUpload {
    settings: PluginSettings,
    uploader: Arc<dyn UploaderPort>,
    vault: Arc<dyn Vault>,
    notifier: Arc<dyn Notifier>,
    downloader: DownloadOrchestrator,
    gate: DocumentGate,
    tracker: PlaceholderTracker,
}

impl ImageAutoUpload {
    /// 按设置构建上传后端与下载器。
    pub fn new(settings: PluginSettings, vault: Arc<dyn Vault>, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let uploader = build_uploader(&settings)?;
        Self::with_uploader(settings, uploader, vault, notifier)
    }

    pub fn with_uploader(
        settings: PluginSettings,
        uploader: Arc<dyn UploaderPort>,
        vault: Arc<dyn Vault>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let downloader = DownloadOrchestrator::new(&settings)?;
        Ok(Self {
            settings,
            uploader,
            vault,
            notifier,
            downloader,
            gate: DocumentGate::new(),
            tracker: PlaceholderTracker::new(),
        })
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// 处理一条请求。返回 `true` 表示请求已由服务处理完毕；粘贴/拖放时宿主据此阻止默认行为，
    /// 返回 `false` 时才执行自己的默认粘贴/拖放。
    pub async fn dispatch(&self, editor: &dyn DocumentEditor, request: DocumentRequest) -> bool {
        match request {
            DocumentRequest::UploadAll => {
                self.upload_all(editor).await;
                true
            }
            DocumentRequest::DownloadAll => {
                self.download_all(editor).await;
                true
            }
            DocumentRequest::UploadFile(path) => self.upload_file(editor, &path).await,
            DocumentRequest::Paste(payload) => self.paste(editor, &payload).await,
            DocumentRequest::Drop(files) => self.drop_files(editor, &files).await,
        }
    }

    /// 上传笔记中的全部图片。
    pub async fn upload_all(&self, editor: &dyn DocumentEditor) {
        let note_path = editor.file_path();
        let Some(_guard) = self.gate.try_acquire(&note_path) else {
            self.notifier.notify(NOTICE_BUSY);
            return;
        };

        let references = extract_references(&editor.value());
        let worklist = filter_references(&references, &self.settings.filter_policy());
        let index = VaultIndex::build(self.vault.as_ref());

        let orchestrator = self.orchestrator();
        let items = orchestrator.resolve(&worklist, &index, &note_path);
        self.upload_items(editor, &orchestrator, worklist.len(), items).await;
    }

    /// 文件菜单：上传一个仓库内图片，并改写笔记中所有按文件名引用它的位置。
    pub async fn upload_file(&self, editor: &dyn DocumentEditor, vault_path: &str) -> bool {
        if !is_image_path(vault_path) {
            log::debug!("不是图片文件，忽略文件菜单上传 - {}", vault_path);
            return false;
        }

        let note_path = editor.file_path();
        let Some(_guard) = self.gate.try_acquire(&note_path) else {
            self.notifier.notify(NOTICE_BUSY);
            return true;
        };

        let file_name = vault_path.rsplit('/').next().unwrap_or(vault_path);
        let absolute = self.vault.base_path().join(vault_path);
        let items: Vec<WorkItem> = extract_references(&editor.value())
            .into_iter()
            .filter(|reference| reference.file_name() == file_name)
            .map(|reference| WorkItem::local(reference, absolute.clone()))
            .collect();

        let orchestrator = self.orchestrator();
        self.upload_items(editor, &orchestrator, items.len(), items).await;
        true
    }

    /// 下载笔记中的全部网络图片。
    pub async fn download_all(&self, editor: &dyn DocumentEditor) {
        let note_path = editor.file_path();
        let Some(_guard) = self.gate.try_acquire(&note_path) else {
            self.notifier.notify(NOTICE_BUSY);
            return;
        };

        match self.downloader.run(editor, self.vault.as_ref()).await {
            Ok(summary) => self.notifier.notify(&summary.message()),
            Err(err) => {
                log::error!("❌ 下载网络图片失败: {}", err);
                self.notifier.notify(NOTICE_DOWNLOAD_ERROR);
            }
        }
    }

    /// 处理一次粘贴。
    ///
    /// 剪贴板图片被接管、或文本已由服务插入时返回 `true`（宿主应阻止默认粘贴）；
    /// 没有可插入的文本、也没有接管图片时返回 `false`，交给宿主默认处理。
    pub async fn paste(&self, editor: &dyn DocumentEditor, payload: &ClipboardPayload) -> bool {
        let allow = editor.front_matter_flag(FRONT_MATTER_KEY, self.settings.upload_by_clip_switch);
        if !allow {
            return self.insert_text(editor, &payload.text);
        }

        if self.can_upload(payload) {
            let name = payload.files.first().map(|f| f.name.clone()).unwrap_or_default();
            let uploader = Arc::clone(&self.uploader);
            self.tracker
                .track(editor, &name, async move {
                    let result = uploader.upload_from_clipboard().await;
                    if result.is_success() {
                        Ok(result.data)
                    } else {
                        Err(result.data)
                    }
                })
                .await;
            return true;
        }

        if !self.insert_text(editor, &payload.text) {
            return false;
        }
        if self.settings.work_on_network {
            self.upload_pasted_links(editor, &payload.text).await;
        }
        true
    }

    /// 剪贴板第一个文件是图片时可上传；同时带有文本时由 `applyImage` 决定。
    pub fn can_upload(&self, payload: &ClipboardPayload) -> bool {
        if !payload.first_is_image() {
            return false;
        }
        if payload.text.is_empty() {
            true
        } else {
            self.settings.apply_image
        }
    }

    /// 处理一次拖放。返回 `true` 表示已接管。
    pub async fn drop_files(&self, editor: &dyn DocumentEditor, files: &[DroppedFile]) -> bool {
        let allow = editor.front_matter_flag(FRONT_MATTER_KEY, self.settings.upload_by_clip_switch);
        if !allow {
            return false;
        }
        if !files.first().is_some_and(|file| file.mime.starts_with("image")) {
            return false;
        }

        let tokens: Vec<_> = files
            .iter()
            .map(|_| {
                let token = self.tracker.insert(editor);
                self.tracker.mark_pending(&token);
                token
            })
            .collect();

        let paths: Vec<String> = files.iter().map(|f| f.path.to_string_lossy().to_string()).collect();
        let result = self.uploader.upload_files(&paths).await.ensure_count(paths.len());

        if !result.success {
            let reason = result.error_message.unwrap_or_else(|| "unknown".to_string());
            for token in &tokens {
                self.tracker.resolve_failure(editor, token, &reason);
            }
            self.notifier.notify(NOTICE_UPLOAD_ERROR);
            return true;
        }

        let mut urls = result.result_urls.into_iter();
        for (token, file) in tokens.iter().zip(files) {
            match urls.next() {
                Some(url) => {
                    self.tracker.resolve_success(editor, token, &file.name, &url);
                }
                None => {
                    self.tracker.resolve_failure(editor, token, "missing upload result");
                }
            }
        }
        true
    }

    fn orchestrator(&self) -> UploadOrchestrator {
        UploadOrchestrator::new(Arc::clone(&self.uploader), self.settings.delete_source)
    }

    async fn upload_items(
        &self,
        editor: &dyn DocumentEditor,
        orchestrator: &UploadOrchestrator,
        total_found: usize,
        items: Vec<WorkItem>,
    ) {
        if items.is_empty() {
            self.notifier.notify(NOTICE_NO_IMAGES);
            return;
        }
        self.notifier
            .notify(&format!("Found {} image files, start uploading", items.len()));

        let summary = orchestrator.upload(editor, total_found, items).await;
        match summary.status {
            UploadStatus::Failed => self.notifier.notify(NOTICE_UPLOAD_ERROR),
            _ => self.notifier.notify(&summary.message()),
        }
    }

    /// 粘贴文本中的网络图片：上传并替换为图床地址。
    async fn upload_pasted_links(&self, editor: &dyn DocumentEditor, text: &str) {
        let black_domains = self.settings.black_domains();
        let links: Vec<ImageReference> = extract_references(text)
            .into_iter()
            .filter(|reference| reference.is_network())
            .filter(|reference| !is_black_domain(&reference.locator, &black_domains))
            .collect();
        if links.is_empty() {
            return;
        }

        let note_path = editor.file_path();
        let Some(_guard) = self.gate.try_acquire(&note_path) else {
            self.notifier.notify(NOTICE_BUSY);
            return;
        };

        let items: Vec<WorkItem> = links.into_iter().map(WorkItem::network).collect();
        let summary = self.orchestrator().upload(editor, items.len(), items).await;
        if summary.status == UploadStatus::Failed {
            self.notifier.notify(NOTICE_UPLOAD_ERROR);
        }
    }

    /// 在光标处插入文本，返回是否真的插入了内容。
    fn insert_text(&self, editor: &dyn DocumentEditor, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        editor.replace_selection(text);
        true
    }
}

/// 仓库内的相对路径（`/` 分隔）；不在仓库内时返回 `None`。
pub fn vault_relative(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}
