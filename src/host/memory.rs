//! 内存文档
//!
//! # 设计思路
//!
//! 命令行宿主与测试共用的 `DocumentEditor` 实现：全文 + 选区保存在 `Mutex` 中，
//! 语义对齐编辑器：`replace_selection` 后光标落在插入文本末尾，
//! 区间替换发生在光标之前时光标随之平移。
//!
//! # 实现思路
//!
//! 内部统一使用字节偏移；对外的 `Position` 在每次调用时按当前全文换算，
//! 无效位置（越界或落在 UTF-8 字符中间）直接忽略并记录警告。

use std::sync::Mutex;

use super::{DocumentEditor, Position};
use crate::reference::text::offset_of;

#[derive(Debug)]
struct DocumentState {
    text: String,
    /// 选区 `[start, end)` 的字节偏移；`start == end` 即光标。
    selection: (usize, usize),
    dirty: bool,
}

/// 基于内存的文档。
#[derive(Debug)]
pub struct MemoryDocument {
    path: String,
    state: Mutex<DocumentState>,
}

impl MemoryDocument {
    /// 创建文档，光标位于文末。
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            path: path.into(),
            state: Mutex::new(DocumentState {
                text,
                selection: (end, end),
                dirty: false,
            }),
        }
    }

    /// 移动光标；位置无效时返回 `false`。
    pub fn set_cursor(&self, pos: Position) -> bool {
        self.set_selection(pos, pos)
    }

    /// 设置选区；位置无效时返回 `false`。
    pub fn set_selection(&self, from: Position, to: Position) -> bool {
        let mut state = self.lock();
        match (offset_of(&state.text, from), offset_of(&state.text, to)) {
            (Some(start), Some(end)) => {
                state.selection = (start.min(end), start.max(end));
                true
            }
            _ => false,
        }
    }

    /// 自创建以来文本是否被修改过。
    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DocumentState> {
        // 锁中毒时沿用内部数据：文本本身总是完整的 String
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentEditor for MemoryDocument {
    fn value(&self) -> String {
        self.lock().text.clone()
    }

    fn set_value(&self, text: &str) {
        let mut state = self.lock();
        if state.text == text {
            return;
        }
        state.text = text.to_string();
        let mut cursor = state.selection.1.min(state.text.len());
        while !state.text.is_char_boundary(cursor) {
            cursor -= 1;
        }
        state.selection = (cursor, cursor);
        state.dirty = true;
    }

    fn replace_selection(&self, text: &str) {
        let mut state = self.lock();
        let (start, end) = state.selection;
        state.text.replace_range(start..end, text);
        let cursor = start + text.len();
        state.selection = (cursor, cursor);
        state.dirty = true;
    }

    fn replace_range(&self, text: &str, from: Position, to: Position) {
        let mut state = self.lock();
        let (Some(start), Some(end)) = (offset_of(&state.text, from), offset_of(&state.text, to)) else {
            log::warn!("⚠️ 忽略无效替换区间: {:?} - {:?}", from, to);
            return;
        };
        if start > end {
            log::warn!("⚠️ 忽略反向替换区间: {:?} - {:?}", from, to);
            return;
        }

        state.text.replace_range(start..end, text);

        let shift = |offset: usize| -> usize {
            if offset >= end {
                offset - (end - start) + text.len()
            } else if offset > start {
                start + text.len()
            } else {
                offset
            }
        };
        state.selection = (shift(state.selection.0), shift(state.selection.1));
        state.dirty = true;
    }

    fn file_path(&self) -> String {
        self.path.clone()
    }
}
