//! # 图片自动上传：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            宿主 (编辑器 / 仓库 / 提示框 / 命令行)          │
//! │                                                          │
//! │  DocumentEditor ── Vault ── Notifier                     │
//! │       │                                                  │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ DocumentRequest (UploadAll / DownloadAll / ...)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                           │
//! │                                                          │
//! │  ┌─ service ──── ImageAutoUpload 门面，错误在此终止       │
//! │  │                                                       │
//! │  ├─ reference ── 提取 `![]()` + 策略过滤 + 首次出现替换   │
//! │  │                                                       │
//! │  ├─ upload ───── 批量编排 · 占位符状态机 · 笔记忙碌闸门   │
//! │  ├─ uploader ─── UploaderPort: PicGo(HTTP) / PicGo-Core   │
//! │  ├─ download ─── 网络图片下载到附件目录                   │
//! │  ├─ storage      附件目录 · 防冲突命名                    │
//! │  └─ settings     PluginSettings (JSON) · FilterPolicy     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 插件设置的加载/保存，派生过滤策略 |
//! | [`reference`] | 图片引用提取、过滤与文本替换原语 |
//! | [`uploader`] | 上传端口与两种后端 |
//! | [`upload`] | 上传编排、占位符生命周期、按笔记串行化 |
//! | [`download`] | 网络图片下载与引用改写 |
//! | [`storage`] | 附件目录的计算与自动创建、目标文件命名 |
//! | [`host`] | 宿主端口及命令行宿主实现 |
//! | [`service`] | 把宿主请求变成流水线调用 |

pub mod download;
pub mod error;
pub mod host;
pub mod reference;
pub mod service;
pub mod settings;
pub mod storage;
pub mod upload;
pub mod uploader;

pub use error::AppError;
pub use service::{ClipboardFile, ClipboardPayload, DocumentRequest, DroppedFile, ImageAutoUpload};
pub use settings::PluginSettings;
