use std::time::{Duration, Instant};

/// 节拍参考时钟 - 用于把解码出的帧时间戳对齐到墙钟
///
/// 当前播放时间 = base_pts + (now - base_instant)。
/// 只由调度线程持有，不需要加锁。
#[derive(Debug, Clone)]
pub struct PacingClock {
    base_pts: f64,          // 基准位置（秒）
    base_instant: Instant,  // 基准时刻
}

impl PacingClock {
    pub fn new() -> Self {
        Self {
            base_pts: 0.0,
            base_instant: Instant::now(),
        }
    }

    /// 当前播放时间（秒）
    pub fn now(&self) -> f64 {
        self.base_pts + self.base_instant.elapsed().as_secs_f64()
    }

    /// 以"现在"为 pos 重新锚定（seek 后使用：参考点 = now - target）
    pub fn reset_to(&mut self, pos: f64) {
        self.base_pts = pos;
        self.base_instant = Instant::now();
    }

    /// 参考点后移 d（暂停期间调用，恢复后不会一次性"追帧"）
    pub fn hold(&mut self, d: Duration) {
        self.base_pts -= d.as_secs_f64();
    }

    /// 距离 pts 到点还剩多久；已到点返回 None
    pub fn until(&self, pts: f64) -> Option<Duration> {
        let remaining = pts - self.now();
        if remaining > 0.0 {
            Some(Duration::from_secs_f64(remaining))
        } else {
            None
        }
    }
}

impl Default for PacingClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_reset_to_anchors_position() {
        let mut clock = PacingClock::new();
        clock.reset_to(42.0);
        let now = clock.now();
        assert!(now >= 42.0 && now < 42.5, "now = {}", now);
    }

    #[test]
    fn test_hold_cancels_elapsed_time() {
        let mut clock = PacingClock::new();
        clock.reset_to(1.0);
        thread::sleep(Duration::from_millis(30));
        clock.hold(Duration::from_millis(30));
        let now = clock.now();
        assert!(now >= 1.0 && now < 1.05, "now = {}", now);
    }

    #[test]
    fn test_until() {
        let mut clock = PacingClock::new();
        clock.reset_to(0.0);
        assert!(clock.until(-1.0).is_none());
        let remaining = clock.until(10.0).unwrap();
        assert!(remaining > Duration::from_secs(9));
    }
}
