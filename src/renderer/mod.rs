// 渲染侧辅助：与具体 GUI 无关的纯计算

pub mod subtitle_cache;

pub use subtitle_cache::SubtitleTextureCache;

use crate::player::MediaPlayer;

/// 窗口坐标系中的矩形（左上角 + 尺寸）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// 保持宽高比缩放并居中（留黑边）
///
/// 任一尺寸为 0 时返回空矩形。
pub fn fit_centered(tex_w: u32, tex_h: u32, win_w: u32, win_h: u32) -> Rect {
    if tex_w == 0 || tex_h == 0 || win_w == 0 || win_h == 0 {
        return Rect { x: 0.0, y: 0.0, w: 0.0, h: 0.0 };
    }

    let (tex_w, tex_h) = (tex_w as f32, tex_h as f32);
    let (win_w, win_h) = (win_w as f32, win_h as f32);

    let video_aspect = tex_w / tex_h;
    let window_aspect = win_w / win_h;

    let (w, h) = if video_aspect > window_aspect {
        // 画面更宽，以宽度为准
        (win_w, win_w / video_aspect)
    } else {
        // 画面更高，以高度为准
        (win_h * video_aspect, win_h)
    };

    Rect {
        x: (win_w - w) / 2.0,
        y: (win_h - h) / 2.0,
        w,
        h,
    }
}

/// 进度条点击 → 定位；时长未知时忽略
pub fn seek_to_progress<P: MediaPlayer + ?Sized>(player: &mut P, progress: f64) {
    let length = player.length();
    if length > 0.0 {
        player.seek(length * progress.clamp(0.0, 1.0));
    }
}
