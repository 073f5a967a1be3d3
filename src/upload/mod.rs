//! # 上传编排模块（upload）
//!
//! ## 设计思路
//!
//! 这是整条流水线里唯一有状态机与并发正确性问题的部分：
//!
//! - `orchestrator`：解析工作清单 → 批量上传 → 按顺序逐条“替换首个出现位置” → 可选删除源文件
//! - `placeholder`：粘贴/拖放时的“上传中”占位符生命周期（插入 → 等待 → 成功/失败）
//! - `gate`：按笔记串行化编排任务，同一笔记同时只允许一次整篇回写
//!
//! ## 调用链
//!
//! ```text
//! 宿主事件（命令 / 粘贴 / 拖放 / 文件菜单）
//!    ↓
//! reference::extract_references → reference::filter_references
//!    ↓
//! UploadOrchestrator（整篇）  或  PlaceholderTracker（单项交互）
//!    ↓
//! DocumentEditor 文本回写
//! ```

mod gate;
mod orchestrator;
mod placeholder;

pub use gate::{DocumentGate, DocumentGuard};
pub use orchestrator::{UploadOrchestrator, UploadStatus, UploadSummary, WorkItem};
pub use placeholder::{FAILURE_MARKER, PlaceholderState, PlaceholderToken, PlaceholderTracker};
