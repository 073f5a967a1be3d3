//! “上传中”占位符生命周期
//!
//! # 设计思路
//!
//! 粘贴/拖放是单项交互：用户需要立即看到反馈，而上传要等网络返回。
//! 每次交互走一个小状态机：
//!
//! ```text
//! Inserted ──mark_pending──▶ Pending ──▶ ResolvedSuccess
//!                                   └──▶ ResolvedFailure
//! ```
//!
//! - 插入：网络调用之前，同步地在光标处写入带唯一 id 的占位文本
//! - 成功：占位文本的首个出现位置替换为最终的图片 Markdown
//! - 失败：首个出现位置替换为失败标记，错误详情只进日志
//!
//! # 实现思路
//!
//! - id 使用 UUID v4（simple 格式），并发粘贴之间不会串位。
//! - 解析时按行重新扫描当前全文查找占位文本，不缓存插入时的位置；
//!   用户在等待期间删掉了占位文本时，替换静默跳过，但状态仍进入终态。
//! - 追踪表只保存未终结的占位符，进入终态即移除。

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::host::DocumentEditor;
use crate::reference::text::find_first_in_lines;

/// 上传失败时留在文本中的可见标记。
pub const FAILURE_MARKER: &str = "⚠️upload failed, check logs";

/// 一个已插入文档的占位符。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceholderToken {
    id: String,
    inserted_text: String,
}

impl PlaceholderToken {
    pub fn new() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        let inserted_text = format!("![Uploading file...{}]()", id);
        Self { id, inserted_text }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 写入文档的占位文本（不含结尾换行）。
    pub fn inserted_text(&self) -> &str {
        &self.inserted_text
    }
}

impl Default for PlaceholderToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderState {
    Inserted,
    Pending,
    ResolvedSuccess,
    ResolvedFailure,
}

impl PlaceholderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ResolvedSuccess | Self::ResolvedFailure)
    }
}

/// 追踪尚未终结的占位符。
#[derive(Debug, Default)]
pub struct PlaceholderTracker {
    states: Mutex<HashMap<String, PlaceholderState>>,
}

impl PlaceholderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在光标处插入占位文本（后跟换行）。
    pub fn insert(&self, editor: &dyn DocumentEditor) -> PlaceholderToken {
        let token = PlaceholderToken::new();
        editor.replace_selection(&format!("{}\n", token.inserted_text()));
        self.lock().insert(token.id.clone(), PlaceholderState::Inserted);
        log::debug!("⏳ 插入占位符 - {}", token.id);
        token
    }

    /// 上传请求已发出。
    pub fn mark_pending(&self, token: &PlaceholderToken) {
        if let Some(state) = self.lock().get_mut(&token.id) {
            if *state == PlaceholderState::Inserted {
                *state = PlaceholderState::Pending;
            }
        }
    }

    /// 占位符的当前状态；已终结或未知时返回 `None`。
    pub fn state(&self, token: &PlaceholderToken) -> Option<PlaceholderState> {
        self.lock().get(&token.id).copied()
    }

    /// 尚未终结的占位符数量。
    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }

    /// 用最终的图片引用替换占位文本。返回文本是否被修改。
    pub fn resolve_success(
        &self,
        editor: &dyn DocumentEditor,
        token: &PlaceholderToken,
        name: &str,
        url: &str,
    ) -> bool {
        let markdown = format!("![{}]({})", name, url);
        self.finish(editor, token, &markdown, PlaceholderState::ResolvedSuccess)
    }

    /// 用失败标记替换占位文本，错误详情只写日志。返回文本是否被修改。
    pub fn resolve_failure(&self, editor: &dyn DocumentEditor, token: &PlaceholderToken, reason: &str) -> bool {
        log::error!("❌ 上传失败 - 占位符 {}: {}", token.id, reason);
        self.finish(editor, token, FAILURE_MARKER, PlaceholderState::ResolvedFailure)
    }

    /// 插入占位符，等待上传结果并解析到对应终态。
    pub async fn track<F>(&self, editor: &dyn DocumentEditor, name: &str, upload: F) -> PlaceholderState
    where
        F: Future<Output = Result<String, String>>,
    {
        let token = self.insert(editor);
        self.mark_pending(&token);

        match upload.await {
            Ok(url) => {
                self.resolve_success(editor, &token, name, &url);
                PlaceholderState::ResolvedSuccess
            }
            Err(reason) => {
                self.resolve_failure(editor, &token, &reason);
                PlaceholderState::ResolvedFailure
            }
        }
    }

    fn finish(
        &self,
        editor: &dyn DocumentEditor,
        token: &PlaceholderToken,
        replacement: &str,
        terminal: PlaceholderState,
    ) -> bool {
        if self.lock().remove(&token.id).is_none() {
            log::warn!("⚠️ 占位符已终结或未登记，忽略重复解析 - {}", token.id);
            return false;
        }

        let text = editor.value();
        match find_first_in_lines(&text, token.inserted_text()) {
            Some((from, to)) => {
                editor.replace_range(replacement, from, to);
                log::debug!("占位符已解析为 {:?} - {}", terminal, token.id);
                true
            }
            None => {
                log::warn!("⚠️ 文本中已找不到占位符，跳过替换 - {}", token.id);
                false
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PlaceholderState>> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
