//! front-matter 开关读取
//!
//! 笔记开头 `---` 包围的 YAML 块，例如：
//!
//! ```text
//! ---
//! image-auto-upload: false
//! ---
//! ```

use serde_yaml::Value;

/// 读取 front-matter 中 `key` 对应的布尔值。
///
/// 没有 front-matter、YAML 非法、键不存在或值不是布尔时返回 `None`。
pub fn read_bool_flag(text: &str, key: &str) -> Option<bool> {
    let block = front_matter_block(text)?;
    let value: Value = match serde_yaml::from_str(block) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("front-matter 解析失败，忽略: {err}");
            return None;
        }
    };
    value.get(key)?.as_bool()
}

fn front_matter_block(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix("---")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}
