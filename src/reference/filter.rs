//! 引用过滤
//!
//! # 设计思路
//!
//! 过滤是输入引用 + 策略的纯函数：不改变顺序、没有副作用、不依赖先前状态。
//!
//! - 网络图片：网络开关关闭时丢弃；命中黑名单域名时无论开关都丢弃。
//! - 本地图片：永远保留，找不到文件的情况留给编排器的解析阶段处理。
//!
//! # 实现思路
//!
//! 黑名单按“域名匹配”而非任意子串：主机名等于条目，或以 `.条目` 结尾。
//! `evil.com` 会拦住 `evil.com` / `img.evil.com`，但不会拦住 `notevil.com`。

use reqwest::Url;

use super::ImageReference;
use crate::settings::FilterPolicy;

/// 按策略筛出待上传引用，保持原有顺序。
pub fn filter_references(references: &[ImageReference], policy: &FilterPolicy) -> Vec<ImageReference> {
    references
        .iter()
        .filter(|reference| {
            if !reference.is_network() {
                return true;
            }
            if is_black_domain(&reference.locator, &policy.black_domains) {
                log::debug!("🚫 黑名单域名，跳过 - {}", reference.locator);
                return false;
            }
            policy.work_on_network
        })
        .cloned()
        .collect()
}

/// 判断 URL 的主机名是否命中黑名单。
///
/// 无法解析的 URL 视为未命中。
pub fn is_black_domain(url: &str, black_domains: &[String]) -> bool {
    if black_domains.is_empty() {
        return false;
    }

    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.trim_end_matches('.').to_ascii_lowercase()))
    else {
        return false;
    };

    black_domains.iter().any(|domain| {
        let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
        !domain.is_empty()
            && (host == domain
                || (host.len() > domain.len()
                    && host.ends_with(&domain)
                    && host.as_bytes()[host.len() - domain.len() - 1] == b'.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::extract_references;

    fn policy(work_on_network: bool, domains: &[&str]) -> FilterPolicy {
        FilterPolicy {
            work_on_network,
            black_domains: domains.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn network_toggle_off_keeps_only_local() {
        let refs = extract_references("![a](http://x.com/1.png) text ![b](./local.png)");
        let worklist = filter_references(&refs, &policy(false, &[]));

        assert_eq!(worklist.len(), 1);
        assert_eq!(worklist[0].locator, "./local.png");
    }

    #[test]
    fn network_toggle_on_keeps_order() {
        let refs = extract_references("![b](./local.png) ![a](http://x.com/1.png) ![c](c.jpg)");
        let worklist = filter_references(&refs, &policy(true, &[]));
        let locators: Vec<_> = worklist.iter().map(|r| r.locator.as_str()).collect();
        assert_eq!(locators, vec!["./local.png", "http://x.com/1.png", "c.jpg"]);
    }

    #[test]
    fn blacklist_is_domain_match_not_substring() {
        let domains = vec!["evil.com".to_string()];
        assert!(is_black_domain("https://evil.com/x.png", &domains));
        assert!(is_black_domain("https://img.EVIL.com/x.png", &domains));
        assert!(!is_black_domain("https://notevil.com/x.png", &domains));
        assert!(!is_black_domain("https://evil.com.cn/x.png", &domains));
        assert!(!is_black_domain("not a url", &domains));
    }

    #[test]
    fn blacklist_applies_regardless_of_toggle() {
        let refs = extract_references("![a](https://evil.com/x.png) ![b](https://notevil.com/x.png)");

        let on = filter_references(&refs, &policy(true, &["evil.com"]));
        assert_eq!(on.len(), 1);
        assert_eq!(on[0].locator, "https://notevil.com/x.png");

        let off = filter_references(&refs, &policy(false, &["evil.com"]));
        assert!(off.is_empty());
    }

    #[test]
    fn local_references_never_blacklisted() {
        let refs = extract_references("![a](evil.com/x.png)");
        let worklist = filter_references(&refs, &policy(false, &["evil.com"]));
        assert_eq!(worklist.len(), 1);
    }
}
