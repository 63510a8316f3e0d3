// 字幕：文本清理、时间码解析、字幕轨道（整体加载 + 实时插入 + O(log n) 查询）

pub mod loader;
pub mod text;
pub mod timecode;
pub mod track;

pub use loader::SUBTITLE_EXTENSIONS;
pub use text::{clean, strip_bracket_codes, strip_markup, strip_override_codes};
pub use timecode::{parse_ass_time, parse_srt_time};
pub use track::{SubtitleEntry, SubtitleTrack};
