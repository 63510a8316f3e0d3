use super::timecode::{parse_ass_time, parse_srt_time};
use super::track::{SubtitleEntry, SubtitleTrack};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 外部字幕扩展名，按优先级排列：.srt > .ass > .ssa
pub const SUBTITLE_EXTENSIONS: [&str; 3] = ["srt", "ass", "ssa"];

/// ASS 默认格式中 Text 是第 10 个字段
const DEFAULT_ASS_TEXT_INDEX: usize = 9;

/// 读取字幕文件：容忍非 UTF-8 字节，去掉 UTF-8 BOM
fn read_subtitle_file(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
            Some(content.to_string())
        }
        Err(e) => {
            warn!("读取字幕文件失败: {} - {}", path.display(), e);
            None
        }
    }
}

/// 解析 SRT 时间行：`00:01:30,500 --> 00:01:33,400 X1:100 ...`
///
/// 结束时间之后的位置信息等附加内容丢弃。
fn parse_srt_range(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next().unwrap_or("");
    Some((parse_srt_time(start.trim()), parse_srt_time(end)))
}

/// 按 ASS Format 约定切分 Dialogue 数据
///
/// 前 text_index 列各自在第一个逗号处切开，Text 列吃掉剩下的整行，
/// 所以字幕正文里的逗号不会被当成分隔符。列数不足返回 None。
fn split_dialogue(data: &str, text_index: usize) -> Option<Vec<&str>> {
    let mut fields = Vec::with_capacity(text_index + 1);
    let mut rest = data;

    for _ in 0..text_index {
        let (field, tail) = rest.split_once(',')?;
        fields.push(field);
        rest = tail;
    }
    fields.push(rest);

    Some(fields)
}

/// 解析 `Format:` 行，返回 Text 字段的位置（大小写敏感，找不到用默认值）
fn parse_format_line(fields: &str) -> usize {
    fields.split(',')
        .position(|field| field.trim() == "Text")
        .unwrap_or(DEFAULT_ASS_TEXT_INDEX)
}

impl SubtitleTrack {
    /// 解析 SRT 内容并替换当前条目，至少接受一条时返回 true
    pub fn load_srt_str(&mut self, content: &str) -> bool {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut entries = Vec::new();
        let mut in_entry = false;
        let mut range = (0.0, 0.0);
        let mut text_buf = String::new();

        let mut flush = |in_entry: &mut bool, range: (f64, f64), text_buf: &mut String| {
            if *in_entry && !text_buf.is_empty() {
                if let Some(entry) = SubtitleEntry::new(range.0, range.1, text_buf) {
                    entries.push(entry);
                }
            }
            text_buf.clear();
            *in_entry = false;
        };

        for line in content.lines() {
            let line = line.trim_end_matches('\r');

            // 空行：结束当前条目
            if line.trim().is_empty() {
                flush(&mut in_entry, range, &mut text_buf);
                continue;
            }

            // 序号行（纯数字）：开始新条目
            if line.bytes().all(|b| b.is_ascii_digit()) {
                flush(&mut in_entry, range, &mut text_buf);
                in_entry = true;
                range = (0.0, 0.0);
                continue;
            }

            // 时间行
            if let Some(parsed) = parse_srt_range(line) {
                // 缺序号的文件：时间行本身开启条目
                if !text_buf.is_empty() {
                    flush(&mut in_entry, range, &mut text_buf);
                }
                in_entry = true;
                range = parsed;
                continue;
            }

            if in_entry {
                if !text_buf.is_empty() {
                    text_buf.push('\n');
                }
                text_buf.push_str(line);
            }
        }
        flush(&mut in_entry, range, &mut text_buf);

        debug!("解析 SRT 字幕完成，共 {} 条字幕", entries.len());
        self.replace(entries);
        self.is_loaded()
    }

    /// 解析 ASS/SSA 内容并替换当前条目，至少接受一条时返回 true
    ///
    /// 这种格式不保证文件内按时间排列，加载后整体重排。
    pub fn load_ass_str(&mut self, content: &str) -> bool {
        let mut entries = Vec::new();
        let mut in_events = false;
        let mut text_index = DEFAULT_ASS_TEXT_INDEX;

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with(';') || line.starts_with('!') {
                continue;
            }

            // 段落头
            if line.starts_with('[') {
                in_events = line.contains("[Events]");
                continue;
            }
            if !in_events {
                continue;
            }

            if let Some(fields) = line.strip_prefix("Format:") {
                text_index = parse_format_line(fields);
                continue;
            }

            let Some(data) = line.strip_prefix("Dialogue:") else {
                continue;
            };
            let Some(fields) = split_dialogue(data, text_index) else {
                continue;
            };
            // 第 1、2 列固定是 Start / End
            if fields.len() < 3 {
                continue;
            }

            let start = parse_ass_time(fields[1].trim());
            let end = parse_ass_time(fields[2].trim());
            if let Some(entry) = SubtitleEntry::new(start, end, fields[text_index]) {
                entries.push(entry);
            }
        }

        debug!("解析 ASS 字幕完成，共 {} 条字幕", entries.len());
        self.replace(entries);
        self.sort_entries();
        self.is_loaded()
    }

    /// 从文件加载 SRT
    pub fn load_srt(&mut self, path: &Path) -> bool {
        match read_subtitle_file(path) {
            Some(content) => self.load_srt_str(&content),
            None => false,
        }
    }

    /// 从文件加载 ASS / SSA
    pub fn load_ass(&mut self, path: &Path) -> bool {
        match read_subtitle_file(path) {
            Some(content) => self.load_ass_str(&content),
            None => false,
        }
    }

    /// 查找并加载与媒体文件同目录、同名的外部字幕
    ///
    /// 依次探测 .srt、.ass、.ssa，第一个解析出至少一条字幕的文件胜出。
    /// 返回加载成功的字幕文件路径。
    pub fn load_file(&mut self, media_path: &Path) -> Option<PathBuf> {
        for ext in SUBTITLE_EXTENSIONS {
            let candidate = media_path.with_extension(ext);
            if !candidate.is_file() {
                continue;
            }

            let ok = if ext == "srt" {
                self.load_srt(&candidate)
            } else {
                self.load_ass(&candidate)
            };

            if ok {
                info!("📝 外部字幕加载完成: {}（{} 条）", candidate.display(), self.len());
                return Some(candidate);
            }
            warn!("字幕文件没有有效条目，跳过: {}", candidate.display());
        }

        self.clear();
        None
    }
}
