use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 播放器配置
///
/// 不可变值，构造播放器时显式传入；没有全局可变配置。
/// 读取配置文件不在本 crate 范围内，缺省字段使用默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// 初始音量 0.0 - 1.0
    pub volume: f32,
    /// 图片显示时长（秒）
    pub image_display_secs: f32,
    /// 暂停时每次休眠的时长
    pub pause_quantum_ms: u64,
    /// 节拍等待的轮询上限
    pub pacing_poll_ms: u64,
    /// 播放到末尾后的空闲等待
    pub ended_idle_ms: u64,
    /// 内嵌字幕没有给出显示时长时的默认值（秒）
    pub default_subtitle_secs: f64,
    /// 纯音频模式下音频领先墙钟的量
    pub audio_lead_ms: u64,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            image_display_secs: 5.0,
            pause_quantum_ms: 10,
            pacing_poll_ms: 1,
            ended_idle_ms: 100,
            default_subtitle_secs: 3.0,
            audio_lead_ms: 200,
            audio_sample_rate: 48000,
            audio_channels: 2,
        }
    }
}

impl PlayerConfig {
    pub fn pause_quantum(&self) -> Duration {
        Duration::from_millis(self.pause_quantum_ms.max(1))
    }

    pub fn pacing_poll(&self) -> Duration {
        Duration::from_millis(self.pacing_poll_ms.max(1))
    }

    pub fn ended_idle(&self) -> Duration {
        Duration::from_millis(self.ended_idle_ms.max(1))
    }

    pub fn audio_lead(&self) -> f64 {
        self.audio_lead_ms as f64 / 1000.0
    }
}
