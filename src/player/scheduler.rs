use crate::core::{log_ctx, PacingClock, PlayerConfig, SharedState, SubtitleSource, VideoFrame};
use crate::player::audio_output::AudioSink;
use crate::player::decoder::{AudioDecode, SubtitleDecode, VideoDecode};
use crate::player::demuxer_source::{DemuxerSource, MediaPacket, PacketKind};
use crate::subtitle::SubtitleTrack;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// 最近一帧已转换好的画面；`ready` 表示消费端还没取走
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub frame: VideoFrame,
    pub ready: bool,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: VideoFrame::blank(width, height),
            ready: false,
        }
    }
}

/// 调度线程与播放门面共享的状态
///
/// 两个锁域：帧缓冲和字幕轨道各一把锁，其余都是原子量。
/// 任何地方都不同时持有两把锁。
#[derive(Clone)]
pub struct PlaybackShared {
    pub state: Arc<SharedState>,
    pub frame: Arc<Mutex<FrameBuffer>>,
    pub subtitles: Arc<Mutex<SubtitleTrack>>,
}

impl PlaybackShared {
    pub fn new(volume: f32, frame: FrameBuffer, subtitles: SubtitleTrack) -> Self {
        Self {
            state: Arc::new(SharedState::new(volume)),
            frame: Arc::new(Mutex::new(frame)),
            subtitles: Arc::new(Mutex::new(subtitles)),
        }
    }
}

/// 调度线程独占的解封装器、解码器和音频输出
///
/// 没有视频解码器时为纯音频模式：音频按参考时钟节拍推送，位置取参考时钟。
pub struct Pipeline {
    pub demuxer: Box<dyn DemuxerSource>,
    pub video: Option<Box<dyn VideoDecode>>,
    pub audio: Option<Box<dyn AudioDecode>>,
    pub subtitle: Option<Box<dyn SubtitleDecode>>,
    pub sink: Option<Box<dyn AudioSink>>,
}

impl Pipeline {
    pub fn is_audio_only(&self) -> bool {
        self.video.is_none()
    }
}

/// 参考时钟 + 可被唤醒的有界等待
struct Pacer {
    clock: PacingClock,
    wake_rx: Receiver<()>,
    state: Arc<SharedState>,
    poll: Duration,
    pause_quantum: Duration,
}

impl Pacer {
    /// 睡 d，被 stop/seek/暂停切换唤醒时提前返回；返回实际睡了多久
    fn sleep(&self, d: Duration) -> Duration {
        let start = Instant::now();
        if let Err(RecvTimeoutError::Disconnected) = self.wake_rx.recv_timeout(d) {
            // 门面已经不在了，退化为普通 sleep
            thread::sleep(d);
        }
        start.elapsed()
    }

    /// 暂停一个量子，参考点后移实际暂停的时长
    fn pause_tick(&mut self) {
        let slept = self.sleep(self.pause_quantum);
        self.clock.hold(slept);
    }

    /// 等到参考时钟走到 pts
    ///
    /// 返回 false 表示等待被 stop 或新的 seek 打断，调用方应放弃这一帧。
    fn wait_until(&mut self, pts: f64) -> bool {
        loop {
            if !self.state.is_running() || self.state.has_pending_seek() {
                return false;
            }
            if self.state.is_paused() {
                self.pause_tick();
                continue;
            }
            match self.clock.until(pts) {
                Some(remaining) => {
                    self.sleep(remaining.min(self.poll));
                }
                None => return true,
            }
        }
    }
}

/// 解码/同步调度器：单线程读包、解码、按时间戳节拍、发布帧和位置
pub struct Scheduler {
    pipeline: Pipeline,
    shared: PlaybackShared,
    subtitle_source: SubtitleSource,
    pacer: Pacer,
    audio_lead: f64,
    ended_idle: Duration,
    default_subtitle_secs: f64,
    applied_volume: Option<f32>,
    frames_shown: u64,
}

const LOG_FIRST_N: u64 = 5;

impl Scheduler {
    pub fn new(
        pipeline: Pipeline,
        shared: PlaybackShared,
        subtitle_source: SubtitleSource,
        config: &PlayerConfig,
        wake_rx: Receiver<()>,
    ) -> Self {
        let pacer = Pacer {
            clock: PacingClock::new(),
            wake_rx,
            state: shared.state.clone(),
            poll: config.pacing_poll(),
            pause_quantum: config.pause_quantum(),
        };
        Self {
            pipeline,
            shared,
            subtitle_source,
            pacer,
            audio_lead: config.audio_lead(),
            ended_idle: config.ended_idle(),
            default_subtitle_secs: config.default_subtitle_secs,
            applied_volume: None,
            frames_shown: 0,
        }
    }

    /// 线程主循环，直到 running 被清除
    pub fn run(mut self) {
        info!(
            "{} 🎬 调度线程启动: {} ({}, 字幕: {:?})",
            log_ctx(),
            self.pipeline.demuxer.description(),
            if self.pipeline.is_audio_only() { "纯音频" } else { "视频" },
            self.subtitle_source,
        );

        self.pacer.clock.reset_to(self.shared.state.position());
        while self.shared.state.is_running() {
            self.iterate();
        }

        info!("{} ⏹ 调度线程退出，共显示 {} 帧", log_ctx(), self.frames_shown);
    }

    /// 循环体执行一次
    pub(crate) fn iterate(&mut self) {
        self.sync_volume();

        // ========== 1. 处理 seek ==========
        if let Some(target) = self.shared.state.take_seek() {
            self.apply_seek(target);
        }

        // ========== 2. 暂停 ==========
        if self.shared.state.is_paused() {
            self.pacer.pause_tick();
            return;
        }

        // ========== 3. 读包 ==========
        let packet = match self.pipeline.demuxer.read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                self.idle_at_end();
                return;
            }
            Err(e) => {
                warn!("{} ⚠️ 读包失败，按结束处理: {}", log_ctx(), e);
                self.idle_at_end();
                return;
            }
        };

        // ========== 4~6. 按流类型分发 ==========
        match packet.kind {
            PacketKind::Video => self.handle_video(&packet),
            PacketKind::Audio => self.handle_audio(&packet),
            PacketKind::Subtitle => self.handle_subtitle(&packet),
        }
    }

    /// 音量变化时下发给音频输出
    fn sync_volume(&mut self) {
        let volume = self.shared.state.volume();
        if self.applied_volume != Some(volume) {
            if let Some(sink) = self.pipeline.sink.as_mut() {
                sink.set_gain(volume);
            }
            self.applied_volume = Some(volume);
        }
    }

    fn apply_seek(&mut self, target: f64) {
        info!("{} ⏩ Seek 到 {:.3}s", log_ctx(), target);

        if let Err(e) = self.pipeline.demuxer.seek(target) {
            warn!("{} ❌ Seek 失败（继续从当前位置读取）: {}", log_ctx(), e);
        }

        if let Some(video) = self.pipeline.video.as_mut() {
            video.flush();
        }
        if let Some(audio) = self.pipeline.audio.as_mut() {
            audio.flush();
        }
        if let Some(subtitle) = self.pipeline.subtitle.as_mut() {
            subtitle.flush();
        }
        if let Some(sink) = self.pipeline.sink.as_mut() {
            sink.clear();
        }

        // 内嵌字幕条目属于旧位置，外部字幕与播放位置无关
        if self.subtitle_source == SubtitleSource::Embedded {
            self.shared.subtitles.lock().clear();
        }

        self.pacer.clock.reset_to(target);
        self.shared.state.set_position(target);
        self.shared.state.set_ended(false);
    }

    fn idle_at_end(&mut self) {
        // seek 已在排队：不要把它刚清除的 ended 又置回去
        if self.shared.state.has_pending_seek() {
            return;
        }
        if !self.shared.state.is_ended() {
            if !self.shared.state.mark_ended() {
                return;
            }
            info!("{} 🏁 播放结束 @ {:.3}s", log_ctx(), self.shared.state.position());
        }
        self.pacer.sleep(self.ended_idle);
    }

    fn handle_video(&mut self, packet: &MediaPacket) {
        let Some(decoder) = self.pipeline.video.as_mut() else {
            return;
        };

        if let Err(e) = decoder.send_packet(packet) {
            debug!("视频包解码失败（已跳过）: {}", e);
            return;
        }

        while let Some(pts) = decoder.receive_frame() {
            // ========== 4. 按时间戳节拍 ==========
            if !self.pacer.wait_until(pts) {
                return;
            }

            // ========== 5. 转换并发布（帧缓冲锁内） ==========
            let mut buffer = self.shared.frame.lock();
            match decoder.convert_into(&mut buffer.frame) {
                Ok(()) => {
                    buffer.frame.pts = pts;
                    self.shared.state.set_position(pts);
                    buffer.ready = true;
                }
                Err(e) => {
                    warn!("帧转换失败（已跳过）: {}", e);
                    continue;
                }
            }
            drop(buffer);

            self.frames_shown += 1;
            if self.frames_shown <= LOG_FIRST_N {
                debug!("{} 🖼 显示第 {} 帧 pts={:.3}s", log_ctx(), self.frames_shown, pts);
            }
        }
    }

    fn handle_audio(&mut self, packet: &MediaPacket) {
        let audio_only = self.pipeline.video.is_none();
        let Some(decoder) = self.pipeline.audio.as_mut() else {
            // 没有音频链路的纯音频播放：按包时间戳推进进度
            if let (true, Some(pts)) = (audio_only, packet.pts) {
                if self.pacer.wait_until(pts) {
                    self.shared.state.set_position(pts);
                }
            }
            return;
        };

        let frames = match decoder.decode(packet) {
            Ok(frames) => frames,
            Err(e) => {
                debug!("音频包解码失败（已跳过）: {}", e);
                return;
            }
        };

        for frame in frames {
            if audio_only {
                // 纯音频：提前 audio_lead 推送，设备缓冲不至于欠载
                if !self.pacer.wait_until(frame.pts - self.audio_lead) {
                    return;
                }
                self.shared.state.set_position(self.pacer.clock.now().max(0.0));
            }
            if let Some(sink) = self.pipeline.sink.as_mut() {
                sink.push_samples(&frame.data);
            }
        }
    }

    fn handle_subtitle(&mut self, packet: &MediaPacket) {
        if self.subtitle_source != SubtitleSource::Embedded {
            return;
        }
        let Some(decoder) = self.pipeline.subtitle.as_mut() else {
            return;
        };

        let decoded = match decoder.decode(packet) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => return,
            Err(e) => {
                debug!("字幕包解码失败（已跳过）: {}", e);
                return;
            }
        };

        let start = packet.pts.unwrap_or(0.0);
        let duration = decoded
            .display_secs
            .filter(|secs| *secs > 0.0)
            .unwrap_or(self.default_subtitle_secs);

        // ========== 6. 实时插入（字幕锁内） ==========
        let mut track = self.shared.subtitles.lock();
        for raw in &decoded.rects {
            track.add_live_entry(start, start + duration, raw);
        }
    }
}
