//! 图片引用提取
//!
//! # 设计思路
//!
//! 只认两种形态：
//! 1. `![alt](<无空白路径>.<扩展名>)`：本地或远程、带扩展名的路径
//! 2. `![alt](http(s)://...)`：任意网络地址
//!
//! 提取结果保持文本中从前到后的顺序，相同字面量出现两次就是两条引用。
//!
//! # 实现思路
//!
//! - 通过 `once_cell::sync::Lazy` 在首次调用时编译正则，后续零成本复用。
//! - 路径部分使用惰性量词，`![a](x.png)![b](y.png)` 这种紧挨着的写法会拆成两条。
//! - alt 文本不允许包含 `]`，路径不允许包含 `)`，否则第一种形态会从一条引用一直吞到同一行的下一条引用。

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ImageReference, percent_decode};

static IMAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]\n]*)\]\(([^\s)]+?\.\w+)\)|!\[([^\]\n]*)\]\((https?://.*?)\)").unwrap()
});

/// 从笔记文本中提取全部图片引用。
///
/// 没有命中时返回空序列，不存在失败路径。
pub fn extract_references(text: &str) -> Vec<ImageReference> {
    IMAGE_LINK
        .captures_iter(text)
        .filter_map(|caps| {
            let source_span = caps.get(0)?.as_str().to_string();
            let name = caps.get(1).or_else(|| caps.get(3))?.as_str();
            let locator = caps.get(2).or_else(|| caps.get(4))?.as_str().to_string();

            Some(ImageReference {
                source_span,
                display_name: percent_decode(name),
                locator,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_textual_order() {
        let text = "![a](http://x.com/1.png) text ![b](./local.png)";
        let refs = extract_references(text);

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].source_span, "![a](http://x.com/1.png)");
        assert_eq!(refs[0].locator, "http://x.com/1.png");
        assert_eq!(refs[1].source_span, "![b](./local.png)");
        assert_eq!(refs[1].display_name, "b");
    }

    #[test]
    fn keeps_duplicates() {
        let text = "![a](./img.png)\n![a](./img.png)";
        let refs = extract_references(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], refs[1]);
    }

    #[test]
    fn decodes_display_name_but_not_locator() {
        let refs = extract_references("![my%20shot](assets/my%20shot.png)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].display_name, "my shot");
        assert_eq!(refs[0].locator, "assets/my%20shot.png");
        assert_eq!(refs[0].source_span, "![my%20shot](assets/my%20shot.png)");
    }

    #[test]
    fn network_url_without_extension_is_matched() {
        let refs = extract_references("see ![](https://img.example.com/raw?id=42) here");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].locator, "https://img.example.com/raw?id=42");
        assert_eq!(refs[0].display_name, "");
    }

    #[test]
    fn adjacent_references_are_split() {
        let refs = extract_references("![a](x.png)![b](y.jpg)");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].locator, "x.png");
        assert_eq!(refs[1].locator, "y.jpg");
    }

    #[test]
    fn network_reference_without_extension_does_not_swallow_next_one() {
        let refs = extract_references("![a](https://x.com/a.png?w=1) ![b](./local.png)");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].source_span, "![a](https://x.com/a.png?w=1)");
        assert_eq!(refs[1].source_span, "![b](./local.png)");
    }

    #[test]
    fn reference_without_extension_does_not_merge_with_next_one() {
        let refs = extract_references("![a](noext)![b](y.png)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_span, "![b](y.png)");
        assert_eq!(refs[0].locator, "y.png");
    }

    #[test]
    fn badge_wrapped_in_link_stops_at_its_own_paren() {
        let refs = extract_references("[![build](https://ci.com/badge)](https://ci.com)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_span, "![build](https://ci.com/badge)");
        assert_eq!(refs[0].locator, "https://ci.com/badge");
    }

    #[test]
    fn plain_links_and_text_yield_nothing() {
        assert!(extract_references("").is_empty());
        assert!(extract_references("[link](http://x.com/1.png) and ![alt](noext)").is_empty());
    }
}
