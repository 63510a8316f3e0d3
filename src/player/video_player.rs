use crate::core::{
    log_ctx, MediaInfo, PlaybackState, PlayerConfig, PlayerError, Result, SubtitleSource, VideoFrame,
};
use crate::player::audio_output::{AudioOutput, AudioSink};
use crate::player::decoder::{
    AudioDecode, FfmpegAudioDecoder, FfmpegSubtitleDecoder, FfmpegVideoDecoder, SubtitleDecode,
};
use crate::player::demuxer::{Demuxer, StreamRequirement};
use crate::player::playback::Playback;
use crate::player::scheduler::{FrameBuffer, Pipeline};
use crate::subtitle::SubtitleTrack;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// 音频链路：解码器和样本队列交给调度线程，设备流留在播放器线程
pub(crate) struct AudioChain {
    pub decoder: Box<dyn AudioDecode>,
    pub sink: Box<dyn AudioSink>,
    pub output: AudioOutput,
}

/// 打开音频链路（输出设备 + 匹配其配置的解码器）；任何一步失败都返回 None，播放继续但没有声音
pub(crate) fn open_audio(demuxer: &Demuxer, config: &PlayerConfig) -> Option<AudioChain> {
    let stream = demuxer.audio_stream()?;

    let mut output = match AudioOutput::new(config.audio_sample_rate, config.audio_channels) {
        Ok(output) => output,
        Err(e) => {
            warn!("{} ⚠️ 音频输出不可用，静音播放: {}", log_ctx(), e);
            return None;
        }
    };
    if let Err(e) = output.start() {
        warn!("{} ⚠️ 音频输出启动失败，静音播放: {}", log_ctx(), e);
        return None;
    }

    let (rate, channels) = output.get_config();
    match FfmpegAudioDecoder::from_stream_with_config(stream, rate, channels) {
        Ok(decoder) => Some(AudioChain {
            decoder: Box::new(decoder),
            sink: Box::new(output.queue()),
            output,
        }),
        Err(e) => {
            warn!("{} ⚠️ 音频解码器创建失败，静音播放: {}", log_ctx(), e);
            None
        }
    }
}

/// 查找同名外部字幕文件，返回加载好的轨道（可能为空）和其路径
pub(crate) fn load_external_subtitles(path: &Path) -> (SubtitleTrack, Option<PathBuf>) {
    let mut track = SubtitleTrack::new();
    let found = track.load_file(path);
    (track, found)
}

/// 视频播放器
///
/// 外部字幕优先；找不到外部字幕文件时才启用内嵌字幕流。
pub struct VideoPlayer {
    // 先停调度线程，再关设备流
    playback: Playback,
    audio_output: Option<AudioOutput>,
    texture: Option<VideoFrame>,
    media_info: MediaInfo,
    path: PathBuf,
}

impl VideoPlayer {
    /// 打开视频文件。容器或视频流打不开时返回错误，不会进行任何部分播放
    pub fn open(path: &Path, config: &PlayerConfig) -> Result<Self> {
        let mut demuxer = Demuxer::open(path, StreamRequirement::Video)?;
        let media_info = demuxer.media_info().clone();

        let video_stream = demuxer.video_stream().ok_or(PlayerError::NoVideoStream)?;
        let video = FfmpegVideoDecoder::from_stream(video_stream)?;

        // ========== 字幕来源 ==========
        let (subtitles, external) = load_external_subtitles(path);
        let mut subtitle: Option<Box<dyn SubtitleDecode>> = None;
        let subtitle_source = if let Some(file) = external {
            info!("{} 📝 使用外部字幕: {}", log_ctx(), file.display());
            SubtitleSource::External
        } else if let Some(stream) = demuxer.subtitle_stream() {
            match FfmpegSubtitleDecoder::from_stream(stream) {
                Ok(decoder) => {
                    subtitle = Some(Box::new(decoder));
                    info!("{} 📝 使用内嵌字幕流", log_ctx());
                    SubtitleSource::Embedded
                }
                Err(e) => {
                    warn!("{} ⚠️ 内嵌字幕解码器创建失败（忽略字幕）: {}", log_ctx(), e);
                    SubtitleSource::None
                }
            }
        } else {
            SubtitleSource::None
        };
        if subtitle_source != SubtitleSource::Embedded {
            demuxer.drop_subtitle_stream();
        }

        // ========== 音频（可缺） ==========
        let (audio, sink, audio_output) = match open_audio(&demuxer, config) {
            Some(chain) => (Some(chain.decoder), Some(chain.sink), Some(chain.output)),
            None => {
                demuxer.drop_audio_stream();
                (None, None, None)
            }
        };

        let frame = FrameBuffer::new(media_info.width, media_info.height);
        let pipeline = Pipeline {
            demuxer: Box::new(demuxer),
            video: Some(Box::new(video)),
            audio,
            subtitle,
            sink,
        };

        let mut player =
            Self::from_pipeline(pipeline, frame, subtitles, subtitle_source, media_info, path, config);
        player.audio_output = audio_output;
        Ok(player)
    }

    /// 用已经组装好的管线构造（测试或自定义数据源）
    pub fn from_pipeline(
        pipeline: Pipeline,
        frame: FrameBuffer,
        subtitles: SubtitleTrack,
        subtitle_source: SubtitleSource,
        media_info: MediaInfo,
        path: &Path,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            playback: Playback::new(pipeline, frame, subtitles, subtitle_source, config),
            audio_output: None,
            texture: None,
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

    /// 消费端每帧调用：取走新画面，返回是否仍在播放（未结束）
    pub fn update(&mut self) -> bool {
        self.playback.take_frame(&mut self.texture);
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

    pub fn texture(&self) -> Option<&VideoFrame> {
        self.texture.as_ref()
    }

    pub fn subtitle_text(&self) -> String {
        self.playback.subtitle_text()
    }

    pub fn subtitle_source(&self) -> SubtitleSource {
        self.playback.subtitle_source()
    }

    pub fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
