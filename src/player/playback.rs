use crate::core::{log_ctx, PlaybackState, PlayerConfig, Result, SubtitleSource, VideoFrame};
use crate::player::scheduler::{FrameBuffer, PlaybackShared, Pipeline, Scheduler};
use crate::subtitle::SubtitleTrack;
use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};
use std::thread::{self, JoinHandle};

/// 播放门面：持有调度线程，对外提供 start/stop/暂停/seek 与状态查询
///
/// 所有查询都是对已发布状态的读取；只有字幕查询和取帧需要拿锁。
pub struct Playback {
    shared: PlaybackShared,
    scheduler: Option<Scheduler>, // start 之前持有，start 时移交给调度线程
    worker: Option<JoinHandle<()>>,
    wake_tx: Sender<()>,
    subtitle_source: SubtitleSource,
    length: f64,
}

impl Playback {
    pub fn new(
        pipeline: Pipeline,
        frame: FrameBuffer,
        subtitles: SubtitleTrack,
        subtitle_source: SubtitleSource,
        config: &PlayerConfig,
    ) -> Self {
        let length = pipeline.demuxer.duration();
        let shared = PlaybackShared::new(config.volume, frame, subtitles);
        let (wake_tx, wake_rx) = bounded(1);
        let scheduler = Scheduler::new(pipeline, shared.clone(), subtitle_source, config, wake_rx);

        Self {
            shared,
            scheduler: Some(scheduler),
            worker: None,
            wake_tx,
            subtitle_source,
            length,
        }
    }

    /// 启动调度线程；已经在运行时什么都不做
    pub fn start(&mut self) -> Result<()> {
        if self.shared.state.is_stopped() {
            warn!("{} 播放已停止，不能重新开始", log_ctx());
            return Ok(());
        }
        let Some(scheduler) = self.scheduler.take() else {
            return Ok(());
        };

        self.shared.state.set_running(true);
        let spawned = thread::Builder::new()
            .name("mp-scheduler".into())
            .spawn(move || scheduler.run());

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("{} ▶️ 开始播放", log_ctx());
                Ok(())
            }
            Err(e) => {
                self.shared.state.set_running(false);
                error!("{} ❌ 启动调度线程失败: {}", log_ctx(), e);
                Err(e.into())
            }
        }
    }

    /// 停止并等待调度线程退出；返回后调度线程不会再写任何共享状态
    ///
    /// 停止是终态，之后的 start 不会再启动。
    pub fn stop(&mut self) {
        self.shared.state.set_running(false);
        self.shared.state.mark_stopped();
        self.wake();

        if let Some(worker) = self.worker.take() {
            info!("{} ⏹ 等待调度线程退出...", log_ctx());
            if worker.join().is_err() {
                error!("{} ❌ 调度线程异常退出", log_ctx());
            }
        }
        // 没启动过的解码管线直接释放
        self.scheduler = None;
    }

    fn wake(&self) {
        // 容量为 1：已有未消费的唤醒就不必再发
        let _ = self.wake_tx.try_send(());
    }

    /// 切换暂停，返回切换后是否处于暂停
    pub fn toggle_pause(&self) -> bool {
        let paused = self.shared.state.toggle_paused();
        self.wake();
        info!("{} {}", log_ctx(), if paused { "⏸ 暂停" } else { "▶️ 继续" });
        paused
    }

    /// 发布 seek 目标（钳到 ≥ 0），同时清除 ended
    pub fn seek(&self, secs: f64) {
        self.shared.state.request_seek(secs);
        self.wake();
    }

    pub fn set_volume(&self, volume: f32) {
        self.shared.state.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.shared.state.volume()
    }

    pub fn position(&self) -> f64 {
        self.shared.state.position()
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.shared.state.is_paused()
    }

    pub fn is_ended(&self) -> bool {
        self.shared.state.is_ended()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.playback_state()
    }

    pub fn subtitle_source(&self) -> SubtitleSource {
        self.subtitle_source
    }

    /// 当前位置应显示的字幕
    pub fn subtitle_text(&self) -> String {
        let position = self.position();
        self.shared.subtitles.lock().active_text(position).to_string()
    }

    /// 有新帧时拷贝到消费端的纹理并清除 ready；返回是否拷贝了新帧
    pub fn take_frame(&self, texture: &mut Option<VideoFrame>) -> bool {
        let mut buffer = self.shared.frame.lock();
        if !buffer.ready {
            return false;
        }
        match texture {
            Some(tex) => {
                tex.ensure_size(buffer.frame.width, buffer.frame.height);
                tex.data.copy_from_slice(&buffer.frame.data);
                tex.pts = buffer.frame.pts;
            }
            None => *texture = Some(buffer.frame.clone()),
        }
        buffer.ready = false;
        true
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::demuxer_source::PacketKind;
    use crate::player::fakes::{FakeDemuxer, FakeSink, FakeSubtitles, FakeVideo, CallLog};
    use std::time::{Duration, Instant};

    fn config() -> PlayerConfig {
        PlayerConfig {
            pause_quantum_ms: 5,
            ended_idle_ms: 5,
            ..PlayerConfig::default()
        }
    }

    fn playback(demuxer: FakeDemuxer, calls: &CallLog, subtitles: SubtitleTrack, source: SubtitleSource) -> Playback {
        let pipeline = Pipeline {
            demuxer: Box::new(demuxer),
            video: Some(Box::new(FakeVideo::new(calls.clone()))),
            audio: None,
            subtitle: Some(Box::new(FakeSubtitles::new(calls.clone()))),
            sink: Some(Box::new(FakeSink::new(calls.clone()))),
        };
        Playback::new(pipeline, FrameBuffer::new(2, 2), subtitles, source, &config())
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_state_transitions() {
        let calls = CallLog::default();
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 3, 0.01),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );
        assert_eq!(playback.state(), PlaybackState::Idle);

        playback.start().unwrap();
        wait_for(|| playback.is_ended());
        assert_eq!(playback.state(), PlaybackState::Ended);
        assert_eq!(calls.converted(), 3);

        playback.stop();
        assert_eq!(playback.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_start_is_idempotent_and_stop_is_terminal() {
        let calls = CallLog::default();
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 2, 0.01),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );

        playback.start().unwrap();
        playback.start().unwrap();
        wait_for(|| playback.is_ended());
        playback.stop();
        playback.stop();

        playback.start().unwrap();
        assert_eq!(playback.state(), PlaybackState::Stopped);
        assert_eq!(calls.converted(), 2);
    }

    #[test]
    fn test_stop_joins_promptly_while_pacing() {
        let calls = CallLog::default();
        let demuxer = FakeDemuxer::from_packets(&calls, vec![(PacketKind::Video, Some(30.0))]);
        let mut playback = playback(demuxer, &calls, SubtitleTrack::new(), SubtitleSource::None);

        playback.start().unwrap();
        wait_for(|| calls.packets_read() == 1);

        let start = Instant::now();
        playback.stop();
        assert!(start.elapsed() < Duration::from_secs(1));

        // stop 返回后位置不再变化
        let position = playback.position();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(playback.position(), position);
    }

    #[test]
    fn test_seek_before_start_and_clamp() {
        let calls = CallLog::default();
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 50, 0.1),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );

        playback.seek(-3.0);
        playback.start().unwrap();
        wait_for(|| !calls.seeks().is_empty());
        assert_eq!(calls.seeks(), vec![0.0]);

        playback.seek(4.5);
        wait_for(|| playback.position() >= 4.5);
        assert_eq!(calls.seeks(), vec![0.0, 4.5]);
        playback.stop();
    }

    #[test]
    fn test_seek_resurrects_ended_stream() {
        let calls = CallLog::default();
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 2, 0.01),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );

        playback.start().unwrap();
        wait_for(|| playback.is_ended());
        playback.seek(0.0);
        wait_for(|| calls.converted() >= 4);
        wait_for(|| playback.is_ended());
        assert_eq!(calls.seeks(), vec![0.0]);
        playback.stop();
    }

    #[test]
    fn test_pause_toggle_stops_progress() {
        let calls = CallLog::default();
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 200, 0.01),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );

        playback.start().unwrap();
        wait_for(|| calls.converted() >= 2);
        assert!(playback.toggle_pause());
        assert!(playback.is_paused());
        assert_eq!(playback.state(), PlaybackState::Paused);

        // 给调度线程一个量子观察到暂停
        thread::sleep(Duration::from_millis(30));
        let frozen = calls.converted();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(calls.converted(), frozen);

        assert!(!playback.toggle_pause());
        wait_for(|| calls.converted() > frozen);
        playback.stop();
    }

    #[test]
    fn test_take_frame_copies_once() {
        let calls = CallLog::default();
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 1, 0.0),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );
        let mut texture = None;
        assert!(!playback.take_frame(&mut texture));

        playback.start().unwrap();
        wait_for(|| playback.is_ended());

        assert!(playback.take_frame(&mut texture));
        let texture = texture.unwrap();
        assert_eq!((texture.width, texture.height), (2, 2));
        assert!(texture.data.iter().all(|&b| b == 0xff));

        let mut again = Some(texture);
        assert!(!playback.take_frame(&mut again));
        playback.stop();
    }

    #[test]
    fn test_subtitle_text_follows_position() {
        let calls = CallLog::default();
        let mut subtitles = SubtitleTrack::new();
        assert!(subtitles.load_srt_str("1\n00:00:00,000 --> 00:00:10,000\nHello\n"));
        let mut playback = playback(
            FakeDemuxer::video_frames(&calls, 1, 0.0),
            &calls,
            subtitles,
            SubtitleSource::External,
        );

        assert_eq!(playback.subtitle_text(), "Hello");
        playback.seek(20.0);
        playback.start().unwrap();
        wait_for(|| playback.position() >= 20.0);
        assert_eq!(playback.subtitle_text(), "");
        // 外部字幕 seek 后仍可查询
        playback.seek(1.0);
        wait_for(|| playback.position() < 20.0);
        assert_eq!(playback.subtitle_text(), "Hello");
        playback.stop();
    }

    #[test]
    fn test_volume_is_clamped() {
        let calls = CallLog::default();
        let playback = playback(
            FakeDemuxer::from_packets(&calls, vec![]),
            &calls,
            SubtitleTrack::new(),
            SubtitleSource::None,
        );
        playback.set_volume(3.0);
        assert_eq!(playback.volume(), 1.0);
        playback.set_volume(-1.0);
        assert_eq!(playback.volume(), 0.0);
    }
}
