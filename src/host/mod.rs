//! # 宿主端口模块（host）
//!
//! ## 设计思路
//!
//! 编辑器、仓库（vault）、提示框都属于宿主应用，核心只通过下面三个端口与之交互：
//!
//! - `DocumentEditor`：读/写全文、在光标处插入、替换指定行列区间、读取 front-matter 开关
//! - `Vault`：仓库根目录、仓库内文件列表、附件目录配置
//! - `Notifier`：一次性的用户提示（只报告汇总数量或通用错误）
//!
//! 同时提供命令行宿主使用的具体实现：`MemoryDocument`、`FsVault`、`ConsoleNotifier`。
//!
//! ## 实现思路
//!
//! 编辑器方法都是同步的：在协作式调度下，两次 `await` 之间对文本的读-改-写不会被打断。
//! 文本是共享可变资源，调用方每次都应重新读取当前全文，不要缓存旧快照的偏移。

mod front_matter;
mod memory;
mod vault;

use std::path::Path;

pub use front_matter::read_bool_flag;
pub use memory::MemoryDocument;
pub use vault::{FsVault, VaultIndex, normalize_relative};
pub(crate) use vault::parent_folder;

pub use crate::reference::text::Position;

/// 宿主编辑器端口。
pub trait DocumentEditor: Send + Sync {
    /// 当前全文。
    fn value(&self) -> String;

    /// 整体替换全文。
    fn set_value(&self, text: &str);

    /// 用 `text` 替换当前选区（无选区时即在光标处插入）。
    fn replace_selection(&self, text: &str);

    /// 替换 `[from, to)` 区间；区间无效时不做任何修改。
    fn replace_range(&self, text: &str, from: Position, to: Position);

    /// 当前笔记在仓库内的相对路径（`/` 分隔）。
    fn file_path(&self) -> String;

    /// 读取 front-matter 中的布尔开关，缺失或非布尔时返回 `default`。
    fn front_matter_flag(&self, key: &str, default: bool) -> bool {
        read_bool_flag(&self.value(), key).unwrap_or(default)
    }
}

/// 宿主仓库端口。
pub trait Vault: Send + Sync {
    /// 仓库根目录（绝对路径）。
    fn base_path(&self) -> &Path;

    /// 仓库内全部文件的相对路径（`/` 分隔）。
    fn files(&self) -> Vec<String>;

    /// 附件目录配置：`/` 为仓库根目录，`./xxx` 为当前笔记目录下的子目录。
    fn attachment_folder_path(&self) -> String;
}

/// 用户提示端口。
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// 命令行宿主：提示直接打印到标准输出。
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        log::info!("🔔 {}", message.replace('\n', " | "));
        println!("{message}");
    }
}
