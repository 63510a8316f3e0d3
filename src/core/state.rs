use super::types::PlaybackState;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// 没有待处理 seek 的哨兵值
const NO_SEEK: f64 = -1.0;

/// 调度线程与消费线程共享的播放状态
///
/// 全部是原子标量：调度线程写、渲染线程读，不会出现撕裂。
/// f64/f32 以位模式存进 AtomicU64/AtomicU32。
#[derive(Debug)]
pub struct SharedState {
    running: AtomicBool,
    paused: AtomicBool,
    ended: AtomicBool,
    stopped: AtomicBool,
    position: AtomicU64,
    seek_target: AtomicU64,
    volume: AtomicU32,
}

impl SharedState {
    pub fn new(volume: f32) -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            position: AtomicU64::new(0f64.to_bits()),
            seek_target: AtomicU64::new(NO_SEEK.to_bits()),
            volume: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// 切换暂停，返回切换后的值
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    /// 有 seek 在排队时不算结束：seek 会把流拉回来
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst) && !self.has_pending_seek()
    }

    pub fn set_ended(&self, ended: bool) {
        self.ended.store(ended, Ordering::SeqCst);
    }

    /// 调度线程读到流末尾时调用；置位后发现并发的 seek 则撤销，返回最终是否结束
    pub fn mark_ended(&self) -> bool {
        self.ended.store(true, Ordering::SeqCst);
        if self.has_pending_seek() {
            self.ended.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::SeqCst))
    }

    pub fn set_position(&self, pos: f64) {
        self.position.store(pos.to_bits(), Ordering::SeqCst);
    }

    /// 发布 seek 目标（负数钳到 0），同时清除 ended：seek 可以让已结束的流复活
    pub fn request_seek(&self, target: f64) {
        let target = if target.is_finite() { target.max(0.0) } else { 0.0 };
        self.seek_target.store(target.to_bits(), Ordering::SeqCst);
        self.ended.store(false, Ordering::SeqCst);
    }

    pub fn has_pending_seek(&self) -> bool {
        f64::from_bits(self.seek_target.load(Ordering::SeqCst)) >= 0.0
    }

    /// 取走待处理的 seek 目标（原子交换，不会丢掉并发写入的新目标）
    pub fn take_seek(&self) -> Option<f64> {
        let target = f64::from_bits(self.seek_target.swap(NO_SEEK.to_bits(), Ordering::SeqCst));
        (target >= 0.0).then_some(target)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::SeqCst))
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.is_stopped() {
            PlaybackState::Stopped
        } else if !self.is_running() {
            PlaybackState::Idle
        } else if self.is_ended() {
            PlaybackState::Ended
        } else if self.is_paused() {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }
}
