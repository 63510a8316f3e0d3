use crate::core::Result;
use ffmpeg_next as ffmpeg;
use ffmpeg::Packet;

/// Packet 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Video,
    Audio,
    Subtitle,
}

/// 媒体包（可跨线程传递）
pub struct MediaPacket {
    pub packet: Packet,
    pub kind: PacketKind,
    /// 按所属流的 time_base 换算好的显示时间戳（秒）
    pub pts: Option<f64>,
}

// 实现 Send，允许跨线程传递
unsafe impl Send for MediaPacket {}

impl MediaPacket {
    pub fn new(kind: PacketKind, pts: Option<f64>, packet: Packet) -> Self {
        Self { packet, kind, pts }
    }
}

/// Demuxer 数据源抽象接口
///
/// 调度线程只通过这个 trait 读包和 seek，不关心背后是 FFmpeg 还是别的实现
pub trait DemuxerSource: Send {
    /// 读取下一个媒体包
    ///
    /// 返回：
    /// - Ok(Some(packet)): 成功读取一个包（只会返回已选中的视频/音频/字幕流）
    /// - Ok(None): 到达文件末尾
    /// - Err(e): 读取错误
    fn read_packet(&mut self) -> Result<Option<MediaPacket>>;

    /// Seek 到 secs 之前（含）最近的关键帧
    fn seek(&mut self, secs: f64) -> Result<()>;

    /// 总时长（秒），未知为 0
    fn duration(&self) -> f64;

    /// 获取描述信息（用于调试）
    fn description(&self) -> String;
}
