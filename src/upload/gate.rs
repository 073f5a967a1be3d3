//! 按笔记的“忙碌”闸门
//!
//! # 设计思路
//!
//! 两次整篇编排（例如快速连按两次“上传全部”）如果交错执行，后一次会拿着
//! 过期的工作清单回写全文。这里为每篇笔记维护一个忙碌标记：
//! 获取成功返回 RAII 守卫，守卫 `Drop` 时自动释放，即使中途提前返回也不会泄漏。
//!
//! # 实现思路
//!
//! `Mutex<HashSet<String>>` 保存正在处理的笔记路径；获取失败直接返回 `None`，
//! 不排队等待。

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct DocumentGate {
    busy: Mutex<HashSet<String>>,
}

impl DocumentGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用笔记；已被占用时返回 `None`。
    pub fn try_acquire(&self, document: &str) -> Option<DocumentGuard<'_>> {
        if !self.lock().insert(document.to_string()) {
            log::debug!("⏳ 笔记正在处理中 - {}", document);
            return None;
        }
        Some(DocumentGuard {
            gate: self,
            document: document.to_string(),
        })
    }

    pub fn is_busy(&self, document: &str) -> bool {
        self.lock().contains(document)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.busy.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 笔记占用守卫，`Drop` 时释放。
#[derive(Debug)]
pub struct DocumentGuard<'a> {
    gate: &'a DocumentGate,
    document: String,
}

impl Drop for DocumentGuard<'_> {
    fn drop(&mut self) {
        self.gate.lock().remove(&self.document);
    }
}
