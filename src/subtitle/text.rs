//! 字幕文本清理
//!
//! - 移除 ASS 覆盖代码 `{\an8}`、`{\pos(100,200)}` 等 `{ }` 块
//! - 移除 HTML 风格标签 `<i>`、`<font color=...>` 等 `< >` 块
//! - `\N` / `\n` 转义 → 真实换行
//! - 去掉首尾空白和换行
//!
//! 清理结果为空时调用方应当丢弃该条目。

/// 移除 open/close 括起来的所有块，按嵌套深度计数
///
/// 多余的 close 被忽略（深度不会小于 0）；未闭合的 open 之后的内容全部视为块内并丢弃。
pub fn strip_bracket_codes(s: &str, open: char, close: char) -> String {
    let mut result = String::with_capacity(s.len());
    let mut depth = 0usize;

    for ch in s.chars() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            result.push(ch);
        }
    }

    result
}

/// 移除 ASS/SSA 覆盖代码 `{...}`
pub fn strip_override_codes(s: &str) -> String {
    strip_bracket_codes(s, '{', '}')
}

/// 移除 `<...>` 标记
pub fn strip_markup(s: &str) -> String {
    strip_bracket_codes(s, '<', '>')
}

/// 完整清理：去标签 → 转义换行 → 首尾修剪
pub fn clean(s: &str) -> String {
    let stripped = strip_override_codes(&strip_markup(s));

    let mut out = String::with_capacity(stripped.len());
    let mut chars = stripped.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && matches!(chars.peek(), Some('N') | Some('n')) {
            chars.next();
            out.push('\n');
        } else {
            out.push(ch);
        }
    }

    out.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_override_codes() {
        assert_eq!(strip_override_codes("{\\b1}Hello{\\b0} World"), "Hello World");
        assert_eq!(strip_override_codes("{\\an8}{\\pos(100,200)}Top"), "Top");
    }

    #[test]
    fn test_nested_and_unbalanced_brackets() {
        assert_eq!(strip_override_codes("a{b{c}d}e"), "ae");
        // 多余的闭括号被忽略
        assert_eq!(strip_override_codes("a}b}}c"), "abc");
        // 未闭合的开括号吞掉余下内容
        assert_eq!(strip_override_codes("keep{drop all of this"), "keep");
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<i>italic</i> and <font color=\"red\">red</font>"), "italic and red");
    }

    #[test]
    fn test_clean_line_breaks_and_trim() {
        assert_eq!(clean("Line 1\\NLine 2"), "Line 1\nLine 2");
        assert_eq!(clean("Line 1\\nLine 2"), "Line 1\nLine 2");
        assert_eq!(clean("  \\N{\\i1}<b>Hi</b>{\\i0}\\N \r\n"), "Hi");
    }

    #[test]
    fn test_clean_empty_result() {
        assert_eq!(clean("{\\pos(1,2)}"), "");
        assert_eq!(clean("<br>\\N\\n  "), "");
        assert_eq!(clean(""), "");
    }

    #[test]
    fn test_other_escapes_kept() {
        assert_eq!(clean("a\\hb"), "a\\hb");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "{\\an8}<i>Hello</i>\\Nworld ",
            "  plain  ",
            "a}b<c>d{e",
            "\\N\\NTwo\\nlines\\N",
            "<b>{\\c&H0000FF&}red</b>, and, commas",
            "",
        ];
        for s in samples {
            let once = clean(s);
            assert_eq!(clean(&once), once, "input: {:?}", s);
        }
    }
}
