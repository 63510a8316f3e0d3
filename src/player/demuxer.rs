use crate::core::{log_ctx, MediaInfo, PlayerError, Result};
use crate::player::demuxer_source::{DemuxerSource, MediaPacket, PacketKind};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{format, media};
use log::{debug, info, warn};
use std::path::Path;

/// 打开文件时必须存在的主流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRequirement {
    /// 视频播放：没有视频流即打开失败，音频流可缺
    Video,
    /// 纯音频播放：没有音频流即打开失败，不读取视频包
    Audio,
}

/// 解封装器 - 负责读取媒体文件并分离音视频/字幕流
pub struct Demuxer {
    input_ctx: format::context::Input,
    video_stream_index: Option<usize>,
    audio_stream_index: Option<usize>,
    subtitle_stream_index: Option<usize>,
    video_time_base: f64,
    audio_time_base: f64,
    subtitle_time_base: f64,
    media_info: MediaInfo, // 缓存媒体信息
    source_path: String,   // 媒体源路径（用于描述）
}

/// AVRational → 秒/单位
fn time_base_secs(stream: &format::stream::Stream) -> f64 {
    let tb = stream.time_base();
    if tb.denominator() == 0 {
        return 0.0;
    }
    tb.numerator() as f64 / tb.denominator() as f64
}

impl Demuxer {
    /// 打开媒体文件
    pub fn open(path: &Path, requirement: StreamRequirement) -> Result<Self> {
        let source_path = path.display().to_string();
        info!("{} 正在打开文件: {}", log_ctx(), source_path);

        let input_ctx = format::input(&path)
            .map_err(|e| PlayerError::OpenError(format!("无法打开文件 {}: {}", source_path, e)))?;

        // 查找视频流和音频流（纯音频模式不读视频包，封面图之类的视频流直接忽略）
        let video_stream_index = match requirement {
            StreamRequirement::Video => input_ctx.streams().best(media::Type::Video).map(|s| s.index()),
            StreamRequirement::Audio => None,
        };

        let audio_stream_index = input_ctx
            .streams()
            .best(media::Type::Audio)
            .map(|s| s.index());

        let subtitle_stream_index = input_ctx
            .streams()
            .best(media::Type::Subtitle)
            .map(|s| s.index());

        match requirement {
            StreamRequirement::Video if video_stream_index.is_none() => {
                return Err(PlayerError::NoVideoStream)
            }
            StreamRequirement::Audio if audio_stream_index.is_none() => {
                return Err(PlayerError::NoAudioStream)
            }
            _ => {}
        }

        debug!("视频流索引: {:?}", video_stream_index);
        debug!("音频流索引: {:?}", audio_stream_index);
        debug!("字幕流索引: {:?}", subtitle_stream_index);

        let stream_tb = |idx: Option<usize>| {
            idx.and_then(|i| input_ctx.stream(i))
                .map(|s| time_base_secs(&s))
                .unwrap_or(0.0)
        };
        let video_time_base = stream_tb(video_stream_index);
        let audio_time_base = stream_tb(audio_stream_index);
        let subtitle_time_base = stream_tb(subtitle_stream_index);

        let mut demuxer = Self {
            input_ctx,
            video_stream_index,
            audio_stream_index,
            subtitle_stream_index,
            video_time_base,
            audio_time_base,
            subtitle_time_base,
            media_info: MediaInfo::default(), // 临时默认值
            source_path,
        };

        // 获取并缓存媒体信息
        demuxer.media_info = demuxer.extract_media_info();
        info!(
            "{} ✅ 打开成功: 时长 {:.2}s, 视频 {} {}x{}, 音频 {} {}Hz/{}ch",
            log_ctx(),
            demuxer.media_info.duration,
            demuxer.media_info.video_codec,
            demuxer.media_info.width,
            demuxer.media_info.height,
            demuxer.media_info.audio_codec,
            demuxer.media_info.sample_rate,
            demuxer.media_info.channels,
        );

        Ok(demuxer)
    }

    /// 提取媒体信息（内部使用），拿不到的字段保持默认值
    fn extract_media_info(&self) -> MediaInfo {
        let mut info = MediaInfo {
            duration: (self.input_ctx.duration().max(0) as f64) / f64::from(ffmpeg::ffi::AV_TIME_BASE),
            video_codec: "none".to_string(),
            audio_codec: "none".to_string(),
            ..MediaInfo::default()
        };

        if let Some(stream) = self.video_stream() {
            let params = stream.parameters();
            info.video_codec = params.id().name().to_string();
            let fps = stream.avg_frame_rate();
            if fps.denominator() != 0 {
                info.fps = fps.numerator() as f64 / fps.denominator() as f64;
            }
            match ffmpeg::codec::context::Context::from_parameters(params)
                .and_then(|ctx| ctx.decoder().video())
            {
                Ok(decoder) => {
                    info.width = decoder.width();
                    info.height = decoder.height();
                }
                Err(e) => warn!("读取视频参数失败: {}", e),
            }
        }

        if let Some(stream) = self.audio_stream() {
            let params = stream.parameters();
            info.audio_codec = params.id().name().to_string();
            match ffmpeg::codec::context::Context::from_parameters(params)
                .and_then(|ctx| ctx.decoder().audio())
            {
                Ok(decoder) => {
                    info.sample_rate = decoder.rate();
                    info.channels = decoder.channels();
                }
                Err(e) => warn!("读取音频参数失败: {}", e),
            }
        }

        info
    }

    /// 获取视频流
    pub fn video_stream(&self) -> Option<format::stream::Stream> {
        self.video_stream_index.and_then(|idx| self.input_ctx.stream(idx))
    }

    /// 获取音频流
    pub fn audio_stream(&self) -> Option<format::stream::Stream> {
        self.audio_stream_index.and_then(|idx| self.input_ctx.stream(idx))
    }

    /// 获取字幕流
    pub fn subtitle_stream(&self) -> Option<format::stream::Stream> {
        self.subtitle_stream_index.and_then(|idx| self.input_ctx.stream(idx))
    }

    /// 不再读取字幕包（使用外部字幕或内嵌字幕解码器打不开时）
    pub fn drop_subtitle_stream(&mut self) {
        if self.subtitle_stream_index.take().is_some() {
            debug!("忽略内嵌字幕流");
        }
    }

    /// 不再读取音频包（没有可用的音频输出时）
    pub fn drop_audio_stream(&mut self) {
        if self.audio_stream_index.take().is_some() {
            debug!("忽略音频流");
        }
    }

    /// 获取媒体信息
    pub fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    fn to_secs(ts: Option<i64>, time_base: f64) -> Option<f64> {
        ts.map(|t| t as f64 * time_base)
    }
}

// 实现 DemuxerSource trait
impl DemuxerSource for Demuxer {
    fn read_packet(&mut self) -> Result<Option<MediaPacket>> {
        loop {
            match self.input_ctx.packets().next() {
                Some((stream, packet)) => {
                    let stream_index = stream.index();

                    // 判断包类型
                    let (kind, time_base) = if Some(stream_index) == self.video_stream_index {
                        (PacketKind::Video, self.video_time_base)
                    } else if Some(stream_index) == self.audio_stream_index {
                        (PacketKind::Audio, self.audio_time_base)
                    } else if Some(stream_index) == self.subtitle_stream_index {
                        (PacketKind::Subtitle, self.subtitle_time_base)
                    } else {
                        // 否则跳过这个包，继续循环
                        continue;
                    };

                    let pts = Self::to_secs(packet.pts().or(packet.dts()), time_base);
                    return Ok(Some(MediaPacket::new(kind, pts, packet)));
                }
                None => return Ok(None),
            }
        }
    }

    fn seek(&mut self, secs: f64) -> Result<()> {
        // 秒 → AV_TIME_BASE（微秒），区间上界为目标本身：落在目标之前（含）最近的关键帧
        let timestamp = (secs.max(0.0) * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
        self.input_ctx.seek(timestamp, ..timestamp)?;
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.media_info.duration
    }

    fn description(&self) -> String {
        format!("FFmpeg Demuxer: {}", self.source_path)
    }
}
