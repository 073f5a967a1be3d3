//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，承载设置加载、附件目录、文件 I/O、
//! 上传后端与下载链路中所有“需要被上层感知”的失败。
//!
//! 注意：上传/下载的单项失败在编排器内部就被折算为计数，
//! 不会以 `AppError` 的形式逃逸到宿主事件系统；`AppError` 只在
//! 服务层边界被转换为一条通用提示 + 一条诊断日志。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `UploadError` / `DownloadError` / `std::io::Error` 提供 `From` 转换，无需手动 map。

use crate::download::DownloadError;
use crate::uploader::UploadError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 设置文件读写 / 解析失败
    #[error("设置错误: {0}")]
    Settings(String),

    /// 附件目录不可用
    #[error("附件目录不可用: {0}")]
    Storage(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 上传后端错误
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// 下载链路错误
    #[error("{0}")]
    Download(#[from] DownloadError),

    /// 当前笔记已有编排任务在执行
    #[error("笔记正在处理中: {0}")]
    DocumentBusy(String),

    /// 宿主环境不满足要求（无活动笔记等）
    #[error("宿主环境错误: {0}")]
    Host(String),
}
