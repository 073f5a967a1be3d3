//! # 上传后端错误模型
//!
//! 后端内部使用该枚举做 `?` 传播；在端口边界统一折算为
//! `BatchUploadResult::failure` 或非零 `code`，编排器只看布尔值/返回码。

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("网络错误：{0}")]
    Network(String),

    #[error("上传服务返回异常：{0}")]
    Backend(String),

    #[error("响应格式错误：{0}")]
    InvalidResponse(String),

    #[error("子进程错误：{0}")]
    Process(String),

    #[error("结果数量不匹配：期望 {expected}，实际 {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

impl From<UploadError> for String {
    fn from(error: UploadError) -> Self {
        error.to_string()
    }
}
