// 媒体播放引擎：解封装 + 解码 + 同步调度，附带字幕和渲染侧辅助

pub mod core;
pub mod player;
pub mod renderer;
pub mod subtitle;

pub use core::{PlaybackState, PlayerConfig, PlayerError, Result, VideoFrame};
pub use player::{create_player, MediaKind, MediaPlayer, Player};
pub use subtitle::SubtitleTrack;
