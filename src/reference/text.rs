//! 文本替换原语
//!
//! 所有回写都基于“在当前文本中重新查找字面量，替换第一个出现位置”，
//! 不缓存任何提取阶段的偏移量。

/// 行/列位置，`ch` 为该行内的字节偏移。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// 替换 `text` 中 `target` 的第一个出现位置。
///
/// 未找到（或 `target` 为空）时返回 `None`，原文保持不变。
pub fn replace_first(text: &str, target: &str, replacement: &str) -> Option<String> {
    if target.is_empty() {
        return None;
    }
    let start = text.find(target)?;

    let mut result = String::with_capacity(text.len() - target.len() + replacement.len());
    result.push_str(&text[..start]);
    result.push_str(replacement);
    result.push_str(&text[start + target.len()..]);
    Some(result)
}

/// 按行查找 `target` 的第一个出现位置，返回起止位置。
///
/// 只在单行内匹配，跨行的目标永远找不到。
pub fn find_first_in_lines(text: &str, target: &str) -> Option<(Position, Position)> {
    if target.is_empty() || target.contains('\n') {
        return None;
    }

    text.split('\n').enumerate().find_map(|(line, content)| {
        content
            .find(target)
            .map(|ch| (Position::new(line, ch), Position::new(line, ch + target.len())))
    })
}

/// 把行/列位置换算为整段文本中的字节偏移。
///
/// 行号越界或列越过行尾时返回 `None`。
pub fn offset_of(text: &str, pos: Position) -> Option<usize> {
    let mut offset = 0;
    for (idx, line) in text.split('\n').enumerate() {
        if idx == pos.line {
            if pos.ch > line.len() || !line.is_char_boundary(pos.ch) {
                return None;
            }
            return Some(offset + pos.ch);
        }
        offset += line.len() + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_first_only_touches_first_occurrence() {
        let text = "a ![x](1.png) b ![x](1.png)";
        let once = replace_first(text, "![x](1.png)", "![x](http://cdn/1.png)").expect("found");
        assert_eq!(once, "a ![x](http://cdn/1.png) b ![x](1.png)");

        let twice = replace_first(&once, "![x](1.png)", "![x](http://cdn/2.png)").expect("found");
        assert_eq!(twice, "a ![x](http://cdn/1.png) b ![x](http://cdn/2.png)");

        assert!(replace_first(&twice, "![x](1.png)", "z").is_none());
    }

    #[test]
    fn replace_first_rejects_empty_target() {
        assert!(replace_first("abc", "", "x").is_none());
    }

    #[test]
    fn find_in_lines_reports_line_and_column() {
        let text = "first\nsecond TOKEN here\nTOKEN";
        let (from, to) = find_first_in_lines(text, "TOKEN").expect("found");
        assert_eq!(from, Position::new(1, 7));
        assert_eq!(to, Position::new(1, 12));
        assert!(find_first_in_lines(text, "a\nb").is_none());
    }

    #[test]
    fn offsets_roundtrip_with_positions() {
        let text = "ab\ncd\n";
        assert_eq!(offset_of(text, Position::new(0, 0)), Some(0));
        assert_eq!(offset_of(text, Position::new(1, 1)), Some(4));
        assert_eq!(offset_of(text, Position::new(2, 0)), Some(6));
        assert_eq!(offset_of(text, Position::new(1, 3)), None);
        assert_eq!(offset_of(text, Position::new(5, 0)), None);
    }
}
