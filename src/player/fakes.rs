//! 测试用的假解封装器/解码器/音频输出，不依赖真实媒体文件

use crate::core::{AudioFrame, PlayerError, Result, SampleFormat, VideoFrame};
use crate::player::audio_output::AudioSink;
use crate::player::decoder::{AudioDecode, DecodedSubtitle, SubtitleDecode, VideoDecode};
use crate::player::demuxer_source::{DemuxerSource, MediaPacket, PacketKind};
use ffmpeg_next::Packet;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct CallRecord {
    packets_read: usize,
    seeks: Vec<f64>,
    converted: usize,
    video_flushes: usize,
    audio_flushes: usize,
    subtitle_flushes: usize,
    subtitle_decodes: usize,
    samples_pushed: usize,
    sink_clears: usize,
    gain: Option<f32>,
}

/// 所有假对象共享的调用记录
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<CallRecord>>);

impl CallLog {
    pub fn packets_read(&self) -> usize {
        self.0.lock().packets_read
    }
    pub fn seeks(&self) -> Vec<f64> {
        self.0.lock().seeks.clone()
    }
    pub fn converted(&self) -> usize {
        self.0.lock().converted
    }
    pub fn video_flushes(&self) -> usize {
        self.0.lock().video_flushes
    }
    pub fn audio_flushes(&self) -> usize {
        self.0.lock().audio_flushes
    }
    pub fn subtitle_flushes(&self) -> usize {
        self.0.lock().subtitle_flushes
    }
    pub fn subtitle_decodes(&self) -> usize {
        self.0.lock().subtitle_decodes
    }
    pub fn samples_pushed(&self) -> usize {
        self.0.lock().samples_pushed
    }
    pub fn sink_clears(&self) -> usize {
        self.0.lock().sink_clears
    }
    pub fn gain(&self) -> Option<f32> {
        self.0.lock().gain
    }
}

pub struct FakeDemuxer {
    packets: Vec<(PacketKind, Option<f64>)>,
    cursor: usize,
    duration: f64,
    calls: CallLog,
}

impl FakeDemuxer {
    pub fn from_packets(calls: &CallLog, packets: Vec<(PacketKind, Option<f64>)>) -> Self {
        let duration = packets
            .iter()
            .filter_map(|(_, pts)| *pts)
            .fold(0.0, f64::max);
        Self {
            packets,
            cursor: 0,
            duration,
            calls: calls.clone(),
        }
    }

    /// count 个视频包，pts = i * step
    pub fn video_frames(calls: &CallLog, count: usize, step: f64) -> Self {
        let packets = (0..count)
            .map(|i| (PacketKind::Video, Some(i as f64 * step)))
            .collect();
        Self::from_packets(calls, packets)
    }
}

impl DemuxerSource for FakeDemuxer {
    fn read_packet(&mut self) -> Result<Option<MediaPacket>> {
        let Some(&(kind, pts)) = self.packets.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        self.calls.0.lock().packets_read += 1;
        Ok(Some(MediaPacket::new(kind, pts, Packet::empty())))
    }

    fn seek(&mut self, secs: f64) -> Result<()> {
        self.calls.0.lock().seeks.push(secs);
        self.cursor = self
            .packets
            .iter()
            .position(|(_, pts)| pts.unwrap_or(0.0) >= secs)
            .unwrap_or(self.packets.len());
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn description(&self) -> String {
        format!("fake demuxer ({} packets)", self.packets.len())
    }
}

pub struct FakeVideo {
    pending: VecDeque<f64>,
    current: f64,
    fail_at: Option<f64>,
    calls: CallLog,
}

impl FakeVideo {
    pub fn new(calls: CallLog) -> Self {
        Self {
            pending: VecDeque::new(),
            current: 0.0,
            fail_at: None,
            calls,
        }
    }

    /// pts 等于 fail_at 的包解码失败
    pub fn failing_at(calls: CallLog, fail_at: f64) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::new(calls)
        }
    }
}

impl VideoDecode for FakeVideo {
    fn send_packet(&mut self, packet: &MediaPacket) -> Result<()> {
        let pts = packet.pts.unwrap_or(0.0);
        if self.fail_at.is_some_and(|bad| (bad - pts).abs() < 1e-9) {
            return Err(PlayerError::DecodeError("corrupt packet".into()));
        }
        self.pending.push_back(pts);
        Ok(())
    }

    fn receive_frame(&mut self) -> Option<f64> {
        let pts = self.pending.pop_front()?;
        self.current = pts;
        Some(pts)
    }

    fn convert_into(&mut self, out: &mut VideoFrame) -> Result<()> {
        out.ensure_size(2, 2);
        out.pts = self.current;
        out.data.fill(0xff);
        self.calls.0.lock().converted += 1;
        Ok(())
    }

    fn flush(&mut self) {
        self.pending.clear();
        self.calls.0.lock().video_flushes += 1;
    }

    fn size(&self) -> (u32, u32) {
        (2, 2)
    }
}

pub struct FakeAudio {
    calls: CallLog,
}

impl FakeAudio {
    pub const SAMPLES_PER_FRAME: usize = 8;

    pub fn new(calls: CallLog) -> Self {
        Self { calls }
    }
}

impl AudioDecode for FakeAudio {
    fn decode(&mut self, packet: &MediaPacket) -> Result<Vec<AudioFrame>> {
        Ok(vec![AudioFrame {
            pts: packet.pts.unwrap_or(0.0),
            sample_rate: 48000,
            channels: 2,
            format: SampleFormat::F32,
            data: vec![0.1; Self::SAMPLES_PER_FRAME],
        }])
    }

    fn flush(&mut self) {
        self.calls.0.lock().audio_flushes += 1;
    }
}

pub struct FakeSubtitles {
    display_secs: Option<f64>,
    calls: CallLog,
}

impl FakeSubtitles {
    pub fn new(calls: CallLog) -> Self {
        Self {
            display_secs: Some(1.0),
            calls,
        }
    }

    pub fn without_duration(calls: CallLog) -> Self {
        Self {
            display_secs: None,
            calls,
        }
    }
}

impl SubtitleDecode for FakeSubtitles {
    fn decode(&mut self, packet: &MediaPacket) -> Result<Option<DecodedSubtitle>> {
        self.calls.0.lock().subtitle_decodes += 1;
        let label = packet.pts.map_or_else(|| "?".to_string(), |pts| pts.to_string());
        Ok(Some(DecodedSubtitle {
            display_secs: self.display_secs,
            rects: vec![format!("<i>line @{}</i>", label)],
        }))
    }

    fn flush(&mut self) {
        self.calls.0.lock().subtitle_flushes += 1;
    }
}

pub struct FakeSink {
    calls: CallLog,
}

impl FakeSink {
    pub fn new(calls: CallLog) -> Self {
        Self { calls }
    }
}

impl AudioSink for FakeSink {
    fn push_samples(&mut self, samples: &[f32]) {
        self.calls.0.lock().samples_pushed += samples.len();
    }

    fn clear(&mut self) {
        self.calls.0.lock().sink_clears += 1;
    }

    fn set_gain(&mut self, gain: f32) {
        self.calls.0.lock().gain = Some(gain);
    }
}
