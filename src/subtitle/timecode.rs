//! 时间码解析
//!
//! 两种固定字段的时间码：
//! - SRT：`HH:MM:SS,mmm`（毫秒）
//! - ASS/SSA：`H:MM:SS.cc`（厘秒）
//!
//! 解析是宽松的：某个字段格式不对就按 0 计，不报错。
//! 很多字幕文件本身就不规范，这里刻意保留这种行为。

/// 解析字段开头的整数（可带符号），解析不出来返回 0
fn lenient_int(field: &str) -> i64 {
    let field = field.trim_start();
    let (sign, digits) = match field.as_bytes().first() {
        Some(b'-') => (-1, &field[1..]),
        Some(b'+') => (1, &field[1..]),
        _ => (1, field),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|v| sign * v).unwrap_or(0)
}

/// `H:M:S` + 小数字段 → 四个整数，缺失的字段为 0
fn split_fields(ts: &str, frac_sep: char) -> [i64; 4] {
    let (clock, frac) = match ts.split_once(frac_sep) {
        Some((clock, frac)) => (clock, frac),
        None => (ts, ""),
    };

    let mut fields = [0i64; 4];
    for (slot, part) in fields.iter_mut().zip(clock.splitn(3, ':')) {
        *slot = lenient_int(part);
    }
    fields[3] = lenient_int(frac);
    fields
}

/// SRT 时间码 → 秒：`01:23:45,678` → 5025.678
pub fn parse_srt_time(ts: &str) -> f64 {
    let [h, m, s, ms] = split_fields(ts.trim(), ',');
    h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + ms as f64 / 1000.0
}

/// ASS 时间码 → 秒：`1:23:45.67` → 5025.67
pub fn parse_ass_time(ts: &str) -> f64 {
    let [h, m, s, cs] = split_fields(ts.trim(), '.');
    h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + cs as f64 / 100.0
}
