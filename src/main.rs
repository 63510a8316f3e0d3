use anyhow::Result;
use log::{info, warn};
use mp_player::{create_player, MediaPlayer, PlayerConfig};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// 消费端刷新间隔（约 60Hz）
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    // 初始化日志
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // 初始化 FFmpeg，只保留错误日志
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("FFmpeg 初始化失败: {}", e))?;
    ffmpeg_next::util::log::set_level(ffmpeg_next::util::log::Level::Error);
    info!("✅ FFmpeg 初始化成功");

    let items: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if items.is_empty() {
        warn!("用法: mp_player <媒体文件>...");
        return Ok(());
    }

    let config = PlayerConfig::default();
    for (i, path) in items.iter().enumerate() {
        info!("🎬 [{}/{}] {}", i + 1, items.len(), path.display());

        let mut player = match create_player(path, &config) {
            Ok(player) => player,
            Err(e) if e.is_open_failure() => {
                warn!("⚠️ 无效媒体项，跳过 {}: {}", path.display(), e);
                continue;
            }
            Err(e) => {
                warn!("⚠️ 打开失败，跳过 {}: {}", path.display(), e);
                continue;
            }
        };
        if let Err(e) = player.play() {
            warn!("⚠️ 播放失败，跳过 {}: {}", path.display(), e);
            continue;
        }

        let mut last_subtitle = String::new();
        while player.update() {
            let text = player.subtitle_text();
            if text != last_subtitle {
                if !text.is_empty() {
                    info!("💬 [{:.2}s] {}", player.position(), text.replace('\n', " / "));
                }
                last_subtitle = text;
            }
            thread::sleep(FRAME_INTERVAL);
        }

        player.stop();
        info!("⏹ 播放结束: {}", path.display());
    }

    Ok(())
}
