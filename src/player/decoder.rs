use crate::core::{AudioFrame, PlayerError, Result, SampleFormat, VideoFrame};
use crate::player::demuxer_source::MediaPacket;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::ffi::AVSubtitleType;
use ffmpeg_next::{codec, format, software, util};
use log::{debug, info, warn};
use std::ffi::CStr;

/// 视频解码接口
///
/// 一个包送进去之后用 `receive_frame` 逐帧取出；只有真正要显示的帧才调用
/// `convert_into` 做像素转换，调度线程在帧缓冲锁内调用它。
pub trait VideoDecode: Send {
    fn send_packet(&mut self, packet: &MediaPacket) -> Result<()>;

    /// 取出下一帧并返回其显示时间（秒）；当前包没有更多帧时返回 None
    fn receive_frame(&mut self) -> Option<f64>;

    /// 把最近一次 `receive_frame` 取到的帧转换为 RGBA 写入 `out`
    fn convert_into(&mut self, out: &mut VideoFrame) -> Result<()>;

    /// seek 后丢弃内部缓冲
    fn flush(&mut self);

    fn size(&self) -> (u32, u32);
}

/// 音频解码接口：一个包 → 0~n 个已转换为输出格式的帧
pub trait AudioDecode: Send {
    fn decode(&mut self, packet: &MediaPacket) -> Result<Vec<AudioFrame>>;
    fn flush(&mut self);
}

/// 解码出的一条内嵌字幕
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedSubtitle {
    /// 显示时长（秒），流里没给出时为 None
    pub display_secs: Option<f64>,
    /// 每个文本区域的原始文本（尚未清理）
    pub rects: Vec<String>,
}

/// 字幕解码接口
pub trait SubtitleDecode: Send {
    /// 返回 Ok(None) 表示这个包没有产出字幕
    fn decode(&mut self, packet: &MediaPacket) -> Result<Option<DecodedSubtitle>>;
    fn flush(&mut self);
}

fn stream_time_base(stream: &format::stream::Stream) -> f64 {
    let tb = stream.time_base();
    if tb.denominator() == 0 {
        return 0.0;
    }
    tb.numerator() as f64 / tb.denominator() as f64
}

// ============= 视频解码器 =============

/// 软件视频解码器（YUV → RGBA）
pub struct FfmpegVideoDecoder {
    decoder: codec::decoder::Video,
    scaler: Option<software::scaling::Context>,
    decoded: util::frame::Video,
    rgba: util::frame::Video,
    time_base: f64,
    last_pts: f64,
}

// SwsContext 本身不是 Send，但我们确保只在单个线程中使用它
// 这是安全的，因为每个解码器实例只会在调度线程中使用
unsafe impl Send for FfmpegVideoDecoder {}

impl FfmpegVideoDecoder {
    /// 从视频流创建解码器
    pub fn from_stream(stream: format::stream::Stream) -> Result<Self> {
        let context = codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context.decoder().video()?;
        let time_base = stream_time_base(&stream);

        info!(
            "创建视频解码器: {}x{}, 格式: {:?}",
            decoder.width(),
            decoder.height(),
            decoder.format()
        );

        Ok(Self {
            decoder,
            scaler: None,
            decoded: util::frame::Video::empty(),
            rgba: util::frame::Video::empty(),
            time_base,
            last_pts: 0.0,
        })
    }

    /// 输入格式或尺寸变化时重建 scaler
    fn ensure_scaler(&mut self) -> Result<()> {
        let (format, width, height) = (self.decoded.format(), self.decoded.width(), self.decoded.height());
        let stale = match &self.scaler {
            Some(scaler) => {
                let input = scaler.input();
                input.format != format || input.width != width || input.height != height
            }
            None => true,
        };
        if stale {
            debug!("🔧 初始化像素转换: {:?} {}x{} → RGBA", format, width, height);
            self.scaler = Some(software::scaling::Context::get(
                format,
                width,
                height,
                util::format::Pixel::RGBA,
                width,
                height,
                software::scaling::Flags::BILINEAR,
            )?);
            self.rgba = util::frame::Video::empty();
        }
        Ok(())
    }
}

impl VideoDecode for FfmpegVideoDecoder {
    fn send_packet(&mut self, packet: &MediaPacket) -> Result<()> {
        match self.decoder.send_packet(&packet.packet) {
            Ok(()) => Ok(()),
            Err(ffmpeg::Error::Eof) => {
                debug!("视频解码器收到 EOF（send_packet），执行 flush 并忽略本次包");
                self.decoder.flush();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn receive_frame(&mut self) -> Option<f64> {
        match self.decoder.receive_frame(&mut self.decoded) {
            Ok(()) => {
                let pts = self
                    .decoded
                    .timestamp()
                    .or(self.decoded.pts())
                    .map(|ts| ts as f64 * self.time_base)
                    .unwrap_or(self.last_pts);
                self.last_pts = pts;
                Some(pts)
            }
            // EAGAIN / EOF：这个包的帧取完了
            Err(ffmpeg::Error::Eof) | Err(ffmpeg::Error::Other { .. }) => None,
            Err(e) => {
                warn!("视频解码错误（已跳过）: {}", e);
                None
            }
        }
    }

    fn convert_into(&mut self, out: &mut VideoFrame) -> Result<()> {
        self.ensure_scaler()?;
        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| PlayerError::DecodeError("像素转换未初始化".into()))?;
        scaler.run(&self.decoded, &mut self.rgba)?;

        let width = self.rgba.width();
        let height = self.rgba.height();
        out.ensure_size(width, height);
        out.pts = self.last_pts;

        // 按行复制（去掉 stride 填充）
        let row_size = width as usize * 4;
        let stride = self.rgba.stride(0);
        let src = self.rgba.data(0);
        for (y, dst_row) in out.data.chunks_exact_mut(row_size).enumerate() {
            let offset = y * stride;
            dst_row.copy_from_slice(&src[offset..offset + row_size]);
        }
        Ok(())
    }

    fn flush(&mut self) {
        self.decoder.flush();
    }

    fn size(&self) -> (u32, u32) {
        (self.decoder.width(), self.decoder.height())
    }
}

// ============= 音频解码器 =============

/// 音频解码器（重采样为交错 f32，匹配输出设备的采样率和声道数）
pub struct FfmpegAudioDecoder {
    decoder: codec::decoder::Audio,
    resampler: Option<software::resampling::Context>,
    time_base: f64,
    target_channels: u16,    // 目标声道数（用于声道转换）
    target_sample_rate: u32, // 目标采样率
    next_pts: f64,           // 帧没有时间戳时按样本数推算
}

unsafe impl Send for FfmpegAudioDecoder {}

impl FfmpegAudioDecoder {
    /// 从音频流创建解码器（指定目标配置）
    pub fn from_stream_with_config(
        stream: format::stream::Stream,
        target_sample_rate: u32,
        target_channels: u16,
    ) -> Result<Self> {
        let context = codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context.decoder().audio()?;
        let time_base = stream_time_base(&stream);

        info!(
            "创建音频解码器: {} Hz, {} 声道 → 目标: {} Hz, {} 声道",
            decoder.rate(),
            decoder.channels(),
            target_sample_rate,
            target_channels
        );

        Ok(Self {
            decoder,
            resampler: None,
            time_base,
            target_channels,
            target_sample_rate,
            next_pts: 0.0,
        })
    }

    fn target_layout(&self) -> util::channel_layout::ChannelLayout {
        match self.target_channels {
            1 => util::channel_layout::ChannelLayout::MONO,
            6 => util::channel_layout::ChannelLayout::_5POINT1,
            _ => util::channel_layout::ChannelLayout::STEREO,
        }
    }

    /// 转换音频帧为 f32 格式（支持声道转换和重采样）
    fn convert_frame(&mut self, frame: &util::frame::Audio) -> Result<AudioFrame> {
        let target_format = util::format::Sample::F32(util::format::sample::Type::Packed);
        let target_layout = self.target_layout();

        if self.resampler.is_none() {
            // 有些解码器不填声道布局，按声道数取默认布局
            let source_layout = if frame.channel_layout().is_empty() {
                util::channel_layout::ChannelLayout::default(i32::from(frame.channels()))
            } else {
                frame.channel_layout()
            };

            debug!(
                "🔧 初始化音频重采样器: {}Hz/{}ch → {}Hz/{}ch",
                frame.rate(),
                frame.channels(),
                self.target_sample_rate,
                self.target_channels
            );

            self.resampler = Some(software::resampling::Context::get(
                frame.format(),
                source_layout,
                frame.rate(),
                target_format,
                target_layout,
                self.target_sample_rate,
            )?);
        }

        let resampler = self
            .resampler
            .as_mut()
            .ok_or_else(|| PlayerError::DecodeError("重采样器未初始化".into()))?;

        // 输出帧必须按采样率比例 + swr 内部积压分配，否则多出的样本一直留在 swr 里
        let pending = resampler
            .delay()
            .map_or(0, |delay| usize::try_from(delay.output).unwrap_or(0));
        let capacity =
            resampled_capacity(frame.samples(), frame.rate(), self.target_sample_rate, pending);
        let mut resampled = util::frame::Audio::new(target_format, capacity, target_layout);
        resampler.run(frame, &mut resampled)?;

        let pts = frame
            .timestamp()
            .map(|ts| ts as f64 * self.time_base)
            .unwrap_or(self.next_pts);
        if frame.rate() > 0 {
            self.next_pts = pts + frame.samples() as f64 / frame.rate() as f64;
        }

        // 交错 f32：样本数 × 目标声道数
        let sample_count = resampled.samples() * self.target_channels as usize;
        let data: Vec<f32> = resampled
            .data(0)
            .chunks_exact(4)
            .take(sample_count)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(AudioFrame {
            pts,
            sample_rate: self.target_sample_rate,
            channels: self.target_channels,
            format: SampleFormat::F32,
            data,
        })
    }
}

impl AudioDecode for FfmpegAudioDecoder {
    fn decode(&mut self, packet: &MediaPacket) -> Result<Vec<AudioFrame>> {
        let mut frames = Vec::new();

        match self.decoder.send_packet(&packet.packet) {
            Ok(()) => {}
            Err(ffmpeg::Error::Eof) => {
                debug!("音频解码器收到 EOF（send_packet），执行 flush 并忽略本次包");
                self.decoder.flush();
                return Ok(frames);
            }
            Err(e) => return Err(e.into()),
        }

        let mut decoded = util::frame::Audio::empty();
        // EAGAIN / EOF 都表示这个包取完了
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            frames.push(self.convert_frame(&decoded)?);
        }

        Ok(frames)
    }

    fn flush(&mut self) {
        self.decoder.flush();
        // swr 里积压的是 seek 之前的样本，整个重建
        self.resampler = None;
        self.next_pts = 0.0;
    }
}

/// 重采样输出帧需要的样本容量：按采样率换算（向上取整）+ 积压 + 余量
pub(crate) fn resampled_capacity(in_samples: usize, in_rate: u32, out_rate: u32, pending: usize) -> usize {
    const SLACK: usize = 32;
    let converted = if in_rate == 0 {
        in_samples
    } else {
        let (num, den) = (in_samples as u64 * u64::from(out_rate), u64::from(in_rate));
        ((num + den - 1) / den) as usize
    };
    converted + pending + SLACK
}

// ============= 字幕解码器 =============

/// 内嵌 ASS 事件行 "ReadOrder,Layer,Style,Name,MarginL,MarginR,MarginV,Effect,Text" 取 Text 字段
///
/// 旧格式带 "Dialogue:" 前缀，Text 是第 10 个字段；两种都不匹配时原样返回
pub fn ass_event_text(event: &str) -> &str {
    let (body, text_index) = match event.strip_prefix("Dialogue:") {
        Some(rest) => (rest, 9),
        None => (event, 8),
    };
    body.splitn(text_index + 1, ',')
        .nth(text_index)
        .unwrap_or(event)
}

/// 字幕解码器（只处理文本类字幕，位图字幕跳过）
pub struct FfmpegSubtitleDecoder {
    decoder: codec::decoder::Subtitle,
}

unsafe impl Send for FfmpegSubtitleDecoder {}

impl FfmpegSubtitleDecoder {
    /// 从字幕流创建解码器
    pub fn from_stream(stream: format::stream::Stream) -> Result<Self> {
        let context = codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = context.decoder().subtitle()?;
        info!("创建字幕解码器: {:?}", decoder.id());
        Ok(Self { decoder })
    }
}

impl SubtitleDecode for FfmpegSubtitleDecoder {
    fn decode(&mut self, packet: &MediaPacket) -> Result<Option<DecodedSubtitle>> {
        let mut subtitle = ffmpeg::codec::subtitle::Subtitle::default();

        let got = match self.decoder.decode(&packet.packet, &mut subtitle) {
            Ok(got) => got,
            // EAGAIN 时不视为错误
            Err(ffmpeg::Error::Other { .. }) => false,
            Err(e) => return Err(e.into()),
        };
        if !got {
            return Ok(None);
        }

        // end_display_time 单位为毫秒，0 表示未给出
        let end_ms = subtitle.end();
        let display_secs = (end_ms > 0).then(|| f64::from(end_ms) / 1000.0);

        let mut rects = Vec::new();
        for rect in subtitle.rects() {
            unsafe {
                let raw = rect.as_ptr();
                match (*raw).type_ {
                    AVSubtitleType::SUBTITLE_TEXT if !(*raw).text.is_null() => {
                        rects.push(CStr::from_ptr((*raw).text).to_string_lossy().into_owned());
                    }
                    AVSubtitleType::SUBTITLE_ASS if !(*raw).ass.is_null() => {
                        let event = CStr::from_ptr((*raw).ass).to_string_lossy();
                        rects.push(ass_event_text(&event).to_string());
                    }
                    AVSubtitleType::SUBTITLE_BITMAP => {
                        debug!("跳过位图字幕（仅支持文本字幕）");
                    }
                    _ => {}
                }
            }
        }

        // ✅ 必须释放 FFmpeg subtitle，否则泄漏
        unsafe {
            ffmpeg_next::ffi::avsubtitle_free(subtitle.as_mut_ptr());
        }

        Ok(Some(DecodedSubtitle { display_secs, rects }))
    }

    fn flush(&mut self) {
        self.decoder.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ass_event_text_modern_layout() {
        assert_eq!(ass_event_text("0,0,Default,,0,0,0,,Hello, world"), "Hello, world");
        assert_eq!(ass_event_text("12,1,Top,Bob,10,10,20,,{\\an8}Hi"), "{\\an8}Hi");
    }

    #[test]
    fn test_ass_event_text_legacy_dialogue() {
        let event = "Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hi, there";
        assert_eq!(ass_event_text(event), "Hi, there");
    }

    #[test]
    fn test_upsampling_capacity_holds_all_samples() {
        // 44.1k → 48k：1024 个输入样本换算成 1115 个输出样本
        let capacity = resampled_capacity(1024, 44_100, 48_000, 0);
        assert!(capacity >= 1115);
        assert!(capacity > 1024);
        // swr 已有积压时一并留出空间
        assert_eq!(resampled_capacity(1024, 44_100, 48_000, 200), capacity + 200);
    }

    #[test]
    fn test_capacity_same_rate_and_downsampling() {
        assert_eq!(resampled_capacity(1024, 48_000, 48_000, 0), 1024 + 32);
        assert_eq!(resampled_capacity(960, 48_000, 44_100, 0), 882 + 32);
        // 采样率未知时按输入样本数
        assert_eq!(resampled_capacity(100, 0, 48_000, 5), 137);
    }

    #[test]
    fn test_ass_event_text_plain_fallback() {
        assert_eq!(ass_event_text("just text"), "just text");
    }
}
