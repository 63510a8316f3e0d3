use crate::core::{PlayerError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, SupportedStreamConfigRange};
use crossbeam::queue::SegQueue;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// 音频输出接口：调度线程只负责推样本，播放节奏由设备回调决定
pub trait AudioSink: Send {
    /// 追加交错 f32 样本
    fn push_samples(&mut self, samples: &[f32]);

    /// 丢弃尚未播放的样本（seek 时调用）
    fn clear(&mut self);

    /// 设置增益 (0.0 - 1.0)
    fn set_gain(&mut self, gain: f32);
}

/// 设备不支持请求的配置时依次尝试
const FALLBACK_CONFIGS: [(u32, u16); 4] = [
    (48000, 2), // 最常见
    (44100, 2), // CD 音质
    (48000, 1),
    (44100, 1),
];

/// 设备回调与调度线程之间的样本队列 + 增益
///
/// 只含 Arc，可以交给调度线程；设备流本身留在创建它的线程上。
#[derive(Clone)]
pub struct AudioQueue {
    buffer: Arc<SegQueue<f32>>,
    volume: Arc<Mutex<f32>>,
}

impl AudioQueue {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(SegQueue::new()),
            volume: Arc::new(Mutex::new(1.0)),
        }
    }

    /// 排队中还没播放的样本数
    pub fn queued(&self) -> usize {
        self.buffer.len()
    }

    pub fn gain(&self) -> f32 {
        *self.volume.lock()
    }

    /// 填满设备缓冲：有样本就乘增益输出，没有就补静音
    fn fill(&self, data: &mut [f32]) {
        let vol = *self.volume.lock();
        for sample in data.iter_mut() {
            *sample = self.buffer.pop().map_or(0.0, |value| value * vol);
        }
    }
}

impl Default for AudioQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for AudioQueue {
    fn push_samples(&mut self, samples: &[f32]) {
        for sample in samples {
            self.buffer.push(*sample);
        }
    }

    fn clear(&mut self) {
        while self.buffer.pop().is_some() {}
    }

    fn set_gain(&mut self, gain: f32) {
        *self.volume.lock() = gain.clamp(0.0, 1.0);
    }
}

/// 音频输出 - 使用 cpal 播放音频
///
/// `cpal::Stream` 不是 Send，所以 AudioOutput 留在播放器所在的线程；
/// 调度线程只拿到 `queue()` 返回的 AudioQueue。
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    queue: AudioQueue,
}

impl AudioOutput {
    /// 创建音频输出（支持非标准配置自动回退）
    pub fn new(sample_rate: u32, requested_channels: u16) -> Result<Self> {
        info!("初始化音频输出: {} Hz, {} 声道", sample_rate, requested_channels);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::AudioError("无法找到音频输出设备".to_string()))?;

        debug!("使用音频设备: {}", device.name().unwrap_or_default());

        let requested = std::iter::once((sample_rate, requested_channels));
        let (rate, channels) = requested
            .chain(FALLBACK_CONFIGS)
            .find(|&(rate, ch)| Self::device_supports(&device, rate, ch))
            .ok_or_else(|| {
                PlayerError::AudioError(format!(
                    "音频设备不支持任何标准配置 (原请求: {} Hz, {} 声道)",
                    sample_rate, requested_channels
                ))
            })?;

        if (rate, channels) != (sample_rate, requested_channels) {
            warn!("⚠️  音频设备不支持请求的配置，使用回退配置: {} Hz, {} 声道", rate, channels);
        }

        Ok(Self {
            device,
            config: StreamConfig {
                channels,
                sample_rate: cpal::SampleRate(rate),
                buffer_size: cpal::BufferSize::Default,
            },
            stream: None,
            queue: AudioQueue::new(),
        })
    }

    fn device_supports(device: &Device, rate: u32, channels: u16) -> bool {
        match device.supported_output_configs() {
            Ok(mut configs) => configs.any(|range| Self::is_config_compatible(rate, channels, &range)),
            Err(e) => {
                warn!("无法获取支持的音频配置: {}", e);
                false
            }
        }
    }

    /// 检查配置是否兼容
    fn is_config_compatible(rate: u32, channels: u16, supported: &SupportedStreamConfigRange) -> bool {
        rate >= supported.min_sample_rate().0
            && rate <= supported.max_sample_rate().0
            && channels == supported.channels()
    }

    /// 开始播放
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let queue = self.queue.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| queue.fill(data),
                move |err| {
                    error!("音频流错误: {}", err);
                },
                None,
            )
            .map_err(|e| PlayerError::AudioError(format!("创建音频流失败: {}", e)))?;

        stream
            .play()
            .map_err(|e| PlayerError::AudioError(format!("启动音频流失败: {}", e)))?;

        self.stream = Some(stream);
        info!("音频输出已启动");

        Ok(())
    }

    /// 停止播放
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("音频输出已停止");
        }
    }

    /// 获取实际使用的音频配置
    pub fn get_config(&self) -> (u32, u16) {
        (self.config.sample_rate.0, self.config.channels)
    }

    /// 交给调度线程的样本队列
    pub fn queue(&self) -> AudioQueue {
        self.queue.clone()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
