use super::text;
use log::debug;

/// 一条字幕：[start, end) 区间 + 清理后的文本
///
/// 构造后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    start: f64,
    end: f64,
    text: String,
}

impl SubtitleEntry {
    /// 清理原始文本并构造条目；文本清理后为空时返回 None
    ///
    /// 零长度或倒置的区间照样保留（宽松解析的结果），只是永远不会被 `active_text` 命中。
    pub fn new(start: f64, end: f64, raw_text: &str) -> Option<Self> {
        let text = text::clean(raw_text);
        if text.is_empty() {
            return None;
        }
        if start.is_nan() || end.is_nan() {
            debug!("丢弃时间戳无效的字幕: {:?}", text);
            return None;
        }
        Some(Self {
            start: start.max(0.0),
            end,
            text,
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// 字幕轨道：按 start 升序排列的条目序列
///
/// 两种填充方式：
/// - 整体加载（SRT / ASS，见 loader.rs），替换全部条目
/// - 实时插入（内嵌字幕流解码线程），二分查找插入位置，插入后仍保持有序
///
/// 本身不是线程安全的：解码线程插入、渲染线程查询时，调用方必须用同一把锁保护两者。
#[derive(Debug, Clone, Default)]
pub struct SubtitleTrack {
    entries: Vec<SubtitleEntry>,
}

impl SubtitleTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    /// 用已排好序的条目整体替换
    pub(crate) fn replace(&mut self, entries: Vec<SubtitleEntry>) {
        self.entries = entries;
    }

    /// 按 start 稳定排序
    pub fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    /// 实时插入一条字幕（内嵌字幕流）
    ///
    /// 文本清理后为空则什么都不做。解码顺序"基本"按时间，但流结构变化时不保证严格单调，
    /// 所以用二分查找定位插入点，而不是追加后整体重排。
    /// 相同 start 的条目插在已有条目之后，查询时后插入的优先。
    pub fn add_live_entry(&mut self, start: f64, end: f64, raw_text: &str) {
        let Some(entry) = SubtitleEntry::new(start, end, raw_text) else {
            return;
        };
        let idx = self.entries.partition_point(|e| e.start <= entry.start);
        self.entries.insert(idx, entry);
    }

    /// 查询 t 时刻应显示的文本，没有则返回空串
    ///
    /// 二分查找 start <= t 的最后一条，t 落在它的 [start, end) 内才返回。O(log n)，不修改轨道。
    pub fn active_text(&self, t: f64) -> &str {
        let idx = self.entries.partition_point(|e| e.start <= t);
        match idx.checked_sub(1).map(|i| &self.entries[i]) {
            Some(entry) if entry.contains(t) => &entry.text,
            _ => "",
        }
    }

    /// 检查有序不变式（测试与调试日志用）
    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].start <= w[1].start)
    }
}
