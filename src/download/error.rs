//! 下载链路错误类型。

/// 单张网络图片下载失败的原因。
///
/// 编排器只把它折算为失败计数并写日志，不会展示给用户。
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("超时错误：{0}")]
    Timeout(String),
}

impl From<DownloadError> for String {
    fn from(error: DownloadError) -> Self {
        error.to_string()
    }
}
