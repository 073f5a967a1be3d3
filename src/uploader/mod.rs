//! # 上传端口模块（uploader）
//!
//! ## 设计思路
//!
//! 核心只依赖 `UploaderPort` 这一个契约，具体传输方式（本地 HTTP 守护进程 /
//! 调用外部可执行文件并解析输出）全部藏在端口之后：
//!
//! - `picgo`：PicGo 本地 HTTP 服务
//! - `picgo_core`：PicGo-Core 命令行子进程
//!
//! ## 契约要点
//!
//! - `upload_files` 要么全部成功（每个输入恰好一个 URL，顺序一致），
//!   要么 `success = false`，不允许返回被截断的“成功”列表。
//! - 输入与输出只靠位置对应，后端不得重排结果。
//! - 失败原因只进日志与 `error_message`，编排器不解析原因。

mod error;
mod picgo;
mod picgo_core;

use std::sync::Arc;

pub use error::UploadError;
pub use picgo::PicGoUploader;
pub use picgo_core::PicGoCoreUploader;

use crate::settings::{PluginSettings, UploaderKind};

/// 批量上传结果。
///
/// `success == true` 时 `result_urls.len()` 必须等于输入路径数。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchUploadResult {
    pub success: bool,
    pub result_urls: Vec<String>,
    pub error_message: Option<String>,
}

impl BatchUploadResult {
    pub fn success(result_urls: Vec<String>) -> Self {
        Self {
            success: true,
            result_urls,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result_urls: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    /// 校验结果数量，数量不一致的“成功”降级为失败。
    pub fn ensure_count(self, expected: usize) -> Self {
        if self.success && self.result_urls.len() != expected {
            let err = UploadError::CountMismatch {
                expected,
                actual: self.result_urls.len(),
            };
            log::warn!("⚠️ 上传后端违反数量契约，按失败处理: {err}");
            return Self::failure(err);
        }
        self
    }
}

impl From<Result<Vec<String>, UploadError>> for BatchUploadResult {
    fn from(result: Result<Vec<String>, UploadError>) -> Self {
        match result {
            Ok(urls) => Self::success(urls),
            Err(err) => Self::failure(err),
        }
    }
}

/// 剪贴板上传结果：`code == 0` 表示成功，此时 `data` 为图片 URL，否则为错误详情。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardUploadResult {
    pub code: i32,
    pub data: String,
}

impl ClipboardUploadResult {
    pub fn ok(url: impl Into<String>) -> Self {
        Self {
            code: 0,
            data: url.into(),
        }
    }

    pub fn err(detail: impl Into<String>) -> Self {
        Self {
            code: -1,
            data: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

impl From<Result<String, UploadError>> for ClipboardUploadResult {
    fn from(result: Result<String, UploadError>) -> Self {
        match result {
            Ok(url) => Self::ok(url),
            Err(err) => Self::err(err),
        }
    }
}

/// 上传能力抽象。
#[async_trait::async_trait]
pub trait UploaderPort: Send + Sync {
    /// 按顺序上传一批本地绝对路径（网络图片直接传原 URL）。
    async fn upload_files(&self, paths: &[String]) -> BatchUploadResult;

    /// 上传系统剪贴板中当前的图片。
    async fn upload_from_clipboard(&self) -> ClipboardUploadResult;

    /// 后端名称（用于日志）。
    fn name(&self) -> &'static str;
}

/// 按设置构建上传后端。
pub fn build_uploader(settings: &PluginSettings) -> Result<Arc<dyn UploaderPort>, UploadError> {
    let uploader: Arc<dyn UploaderPort> = match settings.uploader {
        UploaderKind::PicGo => Arc::new(PicGoUploader::new(settings)?),
        UploaderKind::PicGoCore => Arc::new(PicGoCoreUploader::new(settings)),
    };
    log::info!("📤 使用上传后端: {}", uploader.name());
    Ok(uploader)
}
