// 播放器核心模块

pub mod audio_output;
pub mod audio_player;
pub mod decoder;
pub mod demuxer;
pub mod demuxer_source; // Demuxer 抽象接口
pub mod image_player;
pub mod playback;
pub mod scheduler;
pub mod video_player;

#[cfg(test)]
pub(crate) mod fakes;

pub use audio_output::{AudioOutput, AudioQueue, AudioSink};
pub use audio_player::AudioPlayer;
pub use decoder::{AudioDecode, DecodedSubtitle, SubtitleDecode, VideoDecode};
pub use demuxer::{Demuxer, StreamRequirement};
pub use demuxer_source::{DemuxerSource, MediaPacket, PacketKind};
pub use image_player::{ImageFrame, ImagePlayer};
pub use playback::Playback;
pub use scheduler::{FrameBuffer, Pipeline, PlaybackShared, Scheduler};
pub use video_player::VideoPlayer;

use crate::core::{PlaybackState, PlayerConfig, Result, VideoFrame};
use log::info;
use std::path::Path;

/// 按扩展名识别为图片
pub const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "gif", "webp", "tif", "tiff"];

/// 按扩展名识别为纯音频
pub const AUDIO_EXTENSIONS: [&str; 8] = ["mp3", "wav", "flac", "ogg", "aac", "ape", "m4a", "opus"];

/// 三种播放器共有的能力
pub trait MediaPlayer {
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);

    /// 消费端每帧调用一次；返回 false 表示已结束
    fn update(&mut self) -> bool;

    /// 返回切换后是否处于暂停
    fn toggle_pause(&mut self) -> bool;
    fn seek(&mut self, secs: f64);
    fn set_volume(&mut self, volume: f32);

    fn position(&self) -> f64;
    fn length(&self) -> f64;
    fn volume(&self) -> f32;
    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn state(&self) -> PlaybackState;

    /// 当前要显示的画面；纯音频没有
    fn texture(&self) -> Option<&VideoFrame>;
    fn subtitle_text(&self) -> String;

    /// 播放进度 0.0 - 1.0，时长未知时为 0
    fn progress(&self) -> f64 {
        let length = self.length();
        if length > 0.0 {
            (self.position() / length).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl MediaPlayer for VideoPlayer {
    fn play(&mut self) -> Result<()> {
        VideoPlayer::play(self)
    }
    fn stop(&mut self) {
        VideoPlayer::stop(self)
    }
    fn update(&mut self) -> bool {
        VideoPlayer::update(self)
    }
    fn toggle_pause(&mut self) -> bool {
        VideoPlayer::toggle_pause(self)
    }
    fn seek(&mut self, secs: f64) {
        VideoPlayer::seek(self, secs)
    }
    fn set_volume(&mut self, volume: f32) {
        VideoPlayer::set_volume(self, volume)
    }
    fn position(&self) -> f64 {
        VideoPlayer::position(self)
    }
    fn length(&self) -> f64 {
        VideoPlayer::length(self)
    }
    fn volume(&self) -> f32 {
        VideoPlayer::volume(self)
    }
    fn is_playing(&self) -> bool {
        VideoPlayer::is_playing(self)
    }
    fn is_paused(&self) -> bool {
        VideoPlayer::is_paused(self)
    }
    fn is_ended(&self) -> bool {
        VideoPlayer::is_ended(self)
    }
    fn state(&self) -> PlaybackState {
        VideoPlayer::state(self)
    }
    fn texture(&self) -> Option<&VideoFrame> {
        VideoPlayer::texture(self)
    }
    fn subtitle_text(&self) -> String {
        VideoPlayer::subtitle_text(self)
    }
}

impl MediaPlayer for AudioPlayer {
    fn play(&mut self) -> Result<()> {
        AudioPlayer::play(self)
    }
    fn stop(&mut self) {
        AudioPlayer::stop(self)
    }
    fn update(&mut self) -> bool {
        AudioPlayer::update(self)
    }
    fn toggle_pause(&mut self) -> bool {
        AudioPlayer::toggle_pause(self)
    }
    fn seek(&mut self, secs: f64) {
        AudioPlayer::seek(self, secs)
    }
    fn set_volume(&mut self, volume: f32) {
        AudioPlayer::set_volume(self, volume)
    }
    fn position(&self) -> f64 {
        AudioPlayer::position(self)
    }
    fn length(&self) -> f64 {
        AudioPlayer::length(self)
    }
    fn volume(&self) -> f32 {
        AudioPlayer::volume(self)
    }
    fn is_playing(&self) -> bool {
        AudioPlayer::is_playing(self)
    }
    fn is_paused(&self) -> bool {
        AudioPlayer::is_paused(self)
    }
    fn is_ended(&self) -> bool {
        AudioPlayer::is_ended(self)
    }
    fn state(&self) -> PlaybackState {
        AudioPlayer::state(self)
    }
    fn texture(&self) -> Option<&VideoFrame> {
        None
    }
    fn subtitle_text(&self) -> String {
        AudioPlayer::subtitle_text(self)
    }
}

impl MediaPlayer for ImagePlayer {
    fn play(&mut self) -> Result<()> {
        ImagePlayer::play(self)
    }
    fn stop(&mut self) {
        ImagePlayer::stop(self)
    }
    fn update(&mut self) -> bool {
        ImagePlayer::update(self)
    }
    fn toggle_pause(&mut self) -> bool {
        ImagePlayer::toggle_pause(self)
    }
    fn seek(&mut self, secs: f64) {
        ImagePlayer::seek(self, secs)
    }
    // 图片没有音量
    fn set_volume(&mut self, _volume: f32) {}
    fn position(&self) -> f64 {
        ImagePlayer::position(self)
    }
    fn length(&self) -> f64 {
        ImagePlayer::length(self)
    }
    fn volume(&self) -> f32 {
        0.0
    }
    fn is_playing(&self) -> bool {
        ImagePlayer::is_playing(self)
    }
    fn is_paused(&self) -> bool {
        ImagePlayer::is_paused(self)
    }
    fn is_ended(&self) -> bool {
        ImagePlayer::is_ended(self)
    }
    fn state(&self) -> PlaybackState {
        ImagePlayer::state(self)
    }
    fn texture(&self) -> Option<&VideoFrame> {
        ImagePlayer::texture(self)
    }
    fn subtitle_text(&self) -> String {
        String::new()
    }
}

/// 一个播放项：封闭的三种播放器
///
/// 变体特有的操作（如动图逐帧）通过 match 取得，不做向下转型。
pub enum Player {
    Video(VideoPlayer),
    Image(ImagePlayer),
    Audio(AudioPlayer),
}

impl Player {
    fn inner(&self) -> &dyn MediaPlayer {
        match self {
            Player::Video(p) => p,
            Player::Image(p) => p,
            Player::Audio(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn MediaPlayer {
        match self {
            Player::Video(p) => p,
            Player::Image(p) => p,
            Player::Audio(p) => p,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Player::Video(_) => MediaKind::Video,
            Player::Image(_) => MediaKind::Image,
            Player::Audio(_) => MediaKind::Audio,
        }
    }
}

impl MediaPlayer for Player {
    fn play(&mut self) -> Result<()> {
        self.inner_mut().play()
    }
    fn stop(&mut self) {
        self.inner_mut().stop()
    }
    fn update(&mut self) -> bool {
        self.inner_mut().update()
    }
    fn toggle_pause(&mut self) -> bool {
        self.inner_mut().toggle_pause()
    }
    fn seek(&mut self, secs: f64) {
        self.inner_mut().seek(secs)
    }
    fn set_volume(&mut self, volume: f32) {
        self.inner_mut().set_volume(volume)
    }
    fn position(&self) -> f64 {
        self.inner().position()
    }
    fn length(&self) -> f64 {
        self.inner().length()
    }
    fn volume(&self) -> f32 {
        self.inner().volume()
    }
    fn is_playing(&self) -> bool {
        self.inner().is_playing()
    }
    fn is_paused(&self) -> bool {
        self.inner().is_paused()
    }
    fn is_ended(&self) -> bool {
        self.inner().is_ended()
    }
    fn state(&self) -> PlaybackState {
        self.inner().state()
    }
    fn texture(&self) -> Option<&VideoFrame> {
        self.inner().texture()
    }
    fn subtitle_text(&self) -> String {
        self.inner().subtitle_text()
    }
}

/// 播放项类型（按扩展名判断）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

impl MediaKind {
    /// 图片、音频扩展名之外的一律按视频尝试
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }
}

/// 按扩展名创建播放器；返回错误表示该项无效，调用方应跳到下一项
pub fn create_player(path: &Path, config: &PlayerConfig) -> Result<Player> {
    let kind = MediaKind::from_path(path);
    info!("📂 打开 {:?}: {}", kind, path.display());

    let player = match kind {
        MediaKind::Image => Player::Image(ImagePlayer::open(path, config)?),
        MediaKind::Audio => Player::Audio(AudioPlayer::open(path, config)?),
        MediaKind::Video => Player::Video(VideoPlayer::open(path, config)?),
    };
    Ok(player)
}
