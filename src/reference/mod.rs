//! # 图片引用模块（reference）
//!
//! ## 设计思路
//!
//! 笔记文本里的 `![name](locator)` 是整条流水线的输入，也是最后文本替换的锚点。
//! 本模块只做纯文本层面的事情，不碰文件系统与网络：
//!
//! - `extract`：从原始文本中按出现顺序提取全部图片引用（不去重）
//! - `filter`：按策略（网络开关、域名黑名单）筛出待上传清单
//! - `text`：“替换首个出现位置”的文本原语，所有回写都走这里
//!
//! ## 实现思路
//!
//! `ImageReference::source_span` 保存正则命中的原始子串，替换时按字面量重新扫描
//! 当前文本，而不是缓存提取时的偏移量。百分号解码只用于显示名与本地路径解析，
//! 绝不用于替换匹配。

mod extract;
mod filter;
pub mod text;

pub use extract::extract_references;
pub use filter::{filter_references, is_black_domain};

/// 可识别为图片的扩展名（小写，含点）。
pub const IMAGE_EXTENSIONS: [&str; 8] = [
    ".png", ".jpg", ".jpeg", ".bmp", ".gif", ".svg", ".tiff", ".webp",
];

/// 文本中的一次图片引用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// 文本中命中的原始子串，例如 `![a](./img.png)`。
    pub source_span: String,
    /// 显示名（alt 文本，已做百分号解码）。
    pub display_name: String,
    /// 原样保留的本地路径或 URL。
    pub locator: String,
}

impl ImageReference {
    pub fn is_network(&self) -> bool {
        is_network_locator(&self.locator)
    }

    /// 百分号解码后的定位符，用于本地文件解析。
    pub fn decoded_locator(&self) -> String {
        percent_decode(&self.locator)
    }

    /// 解码后定位符的最后一段（文件名）。
    pub fn file_name(&self) -> String {
        let decoded = self.decoded_locator();
        decoded
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(decoded.as_str())
            .to_string()
    }
}

pub fn is_network_locator(locator: &str) -> bool {
    let lower = locator.get(..8).unwrap_or(locator).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// 百分号解码；非法 UTF-8 序列时原样返回。
pub fn percent_decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// 小写扩展名（含点），无扩展名时返回空串。
pub fn extension_of(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

pub fn is_image_path(path: &str) -> bool {
    is_image_extension(&extension_of(path))
}

/// URL 最后一段路径，去掉查询串与片段。
///
/// `https://a.com/x/pic.png?w=1#top` → `pic.png`
pub fn url_asset(url: &str) -> &str {
    let tail = url.rsplit('/').next().unwrap_or(url);
    let tail = tail.split('?').next().unwrap_or(tail);
    tail.split('#').next().unwrap_or(tail)
}
