use crate::core::{PixelFormat, PlaybackState, PlayerConfig, PlayerError, Result, VideoFrame};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// 帧延迟缺失或为 0 时按 100ms 计
const DEFAULT_FRAME_DELAY_MS: u64 = 100;

/// 动画中的一帧
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub frame: VideoFrame,
    pub delay_ms: u64,
}

impl ImageFrame {
    pub fn new(image: RgbaImage, delay_ms: u64) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame: VideoFrame {
                pts: 0.0,
                width,
                height,
                format: PixelFormat::RGBA,
                data: image.into_raw(),
            },
            delay_ms: if delay_ms == 0 { DEFAULT_FRAME_DELAY_MS } else { delay_ms },
        }
    }
}

/// 图片播放器：静态图片或 GIF 动画，显示固定时长后结束
///
/// 暂停只冻结动画，显示计时不停。
pub struct ImagePlayer {
    frames: Vec<ImageFrame>,
    index: usize,
    display_secs: f64,
    start: Option<Instant>,
    last_frame_time: Instant,
    paused: bool,
    ended: bool,
    path: PathBuf,
}

impl ImagePlayer {
    pub fn open(path: &Path, config: &PlayerConfig) -> Result<Self> {
        let is_gif = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));

        let frames = if is_gif {
            Self::decode_gif(path)?
        } else {
            vec![ImageFrame::new(image::open(path)?.to_rgba8(), 0)]
        };

        let player = Self::from_frames(frames, f64::from(config.image_display_secs), path)?;
        info!(
            "🖼 打开图片: {} ({} 帧, 显示 {:.1}s)",
            path.display(),
            player.frame_count(),
            player.display_secs
        );
        Ok(player)
    }

    fn decode_gif(path: &Path) -> Result<Vec<ImageFrame>> {
        let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;
        let frames = decoder
            .into_frames()
            .collect_frames()?
            .into_iter()
            .map(|frame| {
                let (numer, denom) = frame.delay().numer_denom_ms();
                let delay_ms = if denom == 0 { 0 } else { u64::from(numer / denom) };
                ImageFrame::new(frame.into_buffer(), delay_ms)
            })
            .collect();
        Ok(frames)
    }

    pub fn from_frames(frames: Vec<ImageFrame>, display_secs: f64, path: &Path) -> Result<Self> {
        if frames.is_empty() {
            return Err(PlayerError::OpenError(format!("图片没有任何帧: {}", path.display())));
        }
        Ok(Self {
            frames,
            index: 0,
            display_secs: display_secs.max(0.0),
            start: None,
            last_frame_time: Instant::now(),
            paused: false,
            ended: false,
            path: path.to_path_buf(),
        })
    }

    pub fn play(&mut self) -> Result<()> {
        let now = Instant::now();
        self.ended = false;
        self.paused = false;
        self.index = 0;
        self.start = Some(now);
        self.last_frame_time = now;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.ended = true;
    }

    pub fn update(&mut self) -> bool {
        self.advance(Instant::now())
    }

    /// 按给定时刻推进：到时结束，否则按当前帧延迟切到下一帧
    fn advance(&mut self, now: Instant) -> bool {
        if self.ended {
            return false;
        }
        let Some(start) = self.start else {
            return true;
        };

        if now.saturating_duration_since(start).as_secs_f64() >= self.display_secs {
            debug!("图片显示结束: {}", self.path.display());
            self.ended = true;
            return false;
        }
        if self.paused || !self.is_animated() {
            return true;
        }

        let delay = Duration::from_millis(self.frames[self.index].delay_ms);
        if now.saturating_duration_since(self.last_frame_time) >= delay {
            self.index = (self.index + 1) % self.frames.len();
            self.last_frame_time = now;
        }
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// 动画内定位：secs 对动画总时长取模后落到对应帧；静态图片忽略
    pub fn seek(&mut self, secs: f64) {
        let total = self.total_delay_ms();
        if !self.is_animated() || total == 0 {
            return;
        }
        let target = if secs > 0.0 { (secs * 1000.0) as u64 % total } else { 0 };

        let mut acc = 0;
        let last = self.frames.len() - 1;
        for (i, frame) in self.frames.iter().enumerate() {
            if acc + frame.delay_ms > target || i == last {
                self.index = i;
                break;
            }
            acc += frame.delay_ms;
        }
        self.last_frame_time = Instant::now();
    }

    /// 按帧相对移动，首尾循环
    pub fn seek_frames(&mut self, delta: i64) {
        if !self.is_animated() {
            return;
        }
        let count = self.frames.len() as i64;
        self.index = (self.index as i64 + delta).rem_euclid(count) as usize;
        self.last_frame_time = Instant::now();
    }

    /// 从开始显示起经过的时间（秒）
    pub fn position(&self) -> f64 {
        self.start.map_or(0.0, |start| start.elapsed().as_secs_f64())
    }

    pub fn length(&self) -> f64 {
        self.display_secs
    }

    pub fn is_playing(&self) -> bool {
        self.start.is_some() && !self.paused && !self.ended
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn state(&self) -> PlaybackState {
        if self.ended {
            PlaybackState::Ended
        } else if self.start.is_none() {
            PlaybackState::Idle
        } else if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    pub fn texture(&self) -> Option<&VideoFrame> {
        self.frames.get(self.index).map(|f| &f.frame)
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_index(&self) -> usize {
        self.index
    }

    pub fn total_delay_ms(&self) -> u64 {
        self.frames.iter().map(|f| f.delay_ms).sum()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba};
    use tempfile::TempDir;

    fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    fn animation(delays: &[u64]) -> ImagePlayer {
        let frames = delays
            .iter()
            .enumerate()
            .map(|(i, &d)| ImageFrame::new(solid(2, 2, i as u8), d))
            .collect();
        ImagePlayer::from_frames(frames, 5.0, Path::new("anim.gif")).unwrap()
    }

    #[test]
    fn test_zero_delay_defaults_to_100ms() {
        let player = animation(&[50, 0, 30]);
        assert_eq!(player.total_delay_ms(), 180);
    }

    #[test]
    fn test_frames_advance_by_delay() {
        let mut player = animation(&[50, 100, 30]);
        player.play().unwrap();
        let t0 = player.start.unwrap();

        assert!(player.advance(t0 + Duration::from_millis(10)));
        assert_eq!(player.frame_index(), 0);
        assert!(player.advance(t0 + Duration::from_millis(50)));
        assert_eq!(player.frame_index(), 1);
        assert!(player.advance(t0 + Duration::from_millis(120)));
        assert_eq!(player.frame_index(), 1);
        assert!(player.advance(t0 + Duration::from_millis(150)));
        assert_eq!(player.frame_index(), 2);
    }

    #[test]
    fn test_ends_after_display_time_even_when_paused() {
        let mut player = animation(&[50, 50]);
        player.play().unwrap();
        let t0 = player.start.unwrap();

        assert!(player.toggle_pause());
        assert!(player.advance(t0 + Duration::from_millis(200)));
        assert_eq!(player.frame_index(), 0);
        assert!(!player.advance(t0 + Duration::from_secs(5)));
        assert!(player.is_ended());
        assert!(!player.update());
        assert_eq!(player.state(), PlaybackState::Ended);
    }

    #[test]
    fn test_seek_maps_into_delay_timeline() {
        let mut player = animation(&[100, 200, 300]);
        player.seek(0.05);
        assert_eq!(player.frame_index(), 0);
        player.seek(0.1);
        assert_eq!(player.frame_index(), 1);
        player.seek(0.45);
        assert_eq!(player.frame_index(), 2);
        // 取模：0.65s → 50ms
        player.seek(0.65);
        assert_eq!(player.frame_index(), 0);
        player.seek(-1.0);
        assert_eq!(player.frame_index(), 0);
    }

    #[test]
    fn test_seek_frames_wraps() {
        let mut player = animation(&[10, 10, 10, 10]);
        player.seek_frames(5);
        assert_eq!(player.frame_index(), 1);
        player.seek_frames(-3);
        assert_eq!(player.frame_index(), 2);
    }

    #[test]
    fn test_static_image_ignores_seek() {
        let frames = vec![ImageFrame::new(solid(3, 1, 9), 0)];
        let mut player = ImagePlayer::from_frames(frames, 1.0, Path::new("a.png")).unwrap();
        player.seek(0.5);
        player.seek_frames(3);
        assert_eq!(player.frame_index(), 0);
        assert!(!player.is_animated());
        assert_eq!(player.texture().unwrap().data.len(), 3 * 4);
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_empty_frames_rejected() {
        assert!(ImagePlayer::from_frames(Vec::new(), 1.0, Path::new("x.gif")).is_err());
    }

    #[test]
    fn test_open_png_and_gif_files() {
        let dir = TempDir::new().unwrap();
        let config = PlayerConfig::default();

        let png = dir.path().join("still.png");
        solid(4, 3, 200).save(&png).unwrap();
        let player = ImagePlayer::open(&png, &config).unwrap();
        let texture = player.texture().unwrap();
        assert_eq!((texture.width, texture.height), (4, 3));
        assert_eq!(player.length(), 5.0);

        let gif = dir.path().join("anim.gif");
        {
            let file = File::create(&gif).unwrap();
            let mut encoder = GifEncoder::new(file);
            let frames = [50u32, 0, 30].iter().enumerate().map(|(i, &ms)| {
                Frame::from_parts(solid(2, 2, i as u8 * 80), 0, 0, Delay::from_numer_denom_ms(ms, 1))
            });
            encoder.encode_frames(frames).unwrap();
        }
        let player = ImagePlayer::open(&gif, &config).unwrap();
        assert_eq!(player.frame_count(), 3);
        assert_eq!(player.total_delay_ms(), 180);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = ImagePlayer::open(&dir.path().join("missing.png"), &PlayerConfig::default());
        assert!(result.is_err());
    }
}
