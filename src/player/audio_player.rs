use crate::core::{log_ctx, MediaInfo, PlaybackState, PlayerConfig, Result, SubtitleSource};
use crate::player::demuxer::{Demuxer, StreamRequirement};
use crate::player::audio_output::AudioOutput;
use crate::player::playback::Playback;
use crate::player::scheduler::{FrameBuffer, Pipeline};
use crate::player::video_player::{load_external_subtitles, open_audio};
use crate::subtitle::SubtitleTrack;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// 纯音频播放器
///
/// 同一个调度器的纯音频模式：没有画面，音频按参考时钟提前 `audio_lead_ms` 推送，
/// 位置取参考时钟。只支持外部字幕文件。
pub struct AudioPlayer {
    playback: Playback,
    audio_output: Option<AudioOutput>,
    media_info: MediaInfo,
    path: PathBuf,
}

impl AudioPlayer {
    /// 打开音频文件。没有音频流时返回错误；没有可用的输出设备时静音播放
    pub fn open(path: &Path, config: &PlayerConfig) -> Result<Self> {
        let mut demuxer = Demuxer::open(path, StreamRequirement::Audio)?;
        demuxer.drop_subtitle_stream();
        let media_info = demuxer.media_info().clone();

        let (subtitles, external) = load_external_subtitles(path);
        let subtitle_source = match external {
            Some(file) => {
                info!("{} 📝 使用外部字幕: {}", log_ctx(), file.display());
                SubtitleSource::External
            }
            None => SubtitleSource::None,
        };

        let (audio, sink, audio_output) = match open_audio(&demuxer, config) {
            Some(chain) => (Some(chain.decoder), Some(chain.sink), Some(chain.output)),
            None => {
                warn!("{} ⚠️ 没有可用的音频链路，只按时钟推进进度", log_ctx());
                (None, None, None)
            }
        };

        let pipeline = Pipeline {
            demuxer: Box::new(demuxer),
            video: None,
            audio,
            subtitle: None,
            sink,
        };

        let mut player = Self::from_pipeline(pipeline, subtitles, subtitle_source, media_info, path, config);
        player.audio_output = audio_output;
        Ok(player)
    }

    pub fn from_pipeline(
        pipeline: Pipeline,
        subtitles: SubtitleTrack,
        subtitle_source: SubtitleSource,
        media_info: MediaInfo,
        path: &Path,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            playback: Playback::new(pipeline, FrameBuffer::new(0, 0), subtitles, subtitle_source, config),
            audio_output: None,
            media_info,
            path: path.to_path_buf(),
        }
    }

    pub fn play(&mut self) -> Result<()> {
        self.playback.start()
    }

    pub fn stop(&mut self) {
        self.playback.stop();
        if let Some(output) = self.audio_output.as_mut() {
            output.stop();
        }
    }

    /// 没有画面可取，只报告是否仍在播放
    pub fn update(&mut self) -> bool {
        !self.playback.is_ended()
    }

    pub fn toggle_pause(&self) -> bool {
        self.playback.toggle_pause()
    }

    pub fn seek(&self, secs: f64) {
        self.playback.seek(secs);
    }

    pub fn set_volume(&self, volume: f32) {
        self.playback.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.playback.volume()
    }

    pub fn position(&self) -> f64 {
        self.playback.position()
    }

    pub fn length(&self) -> f64 {
        self.playback.length()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.playback.is_paused()
    }

    pub fn is_ended(&self) -> bool {
        self.playback.is_ended()
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn subtitle_text(&self) -> String {
        self.playback.subtitle_text()
    }

    pub fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
