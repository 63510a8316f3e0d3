use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("FFmpeg 错误: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("无法打开文件: {0}")]
    OpenError(String),

    #[error("无法找到视频流")]
    NoVideoStream,

    #[error("无法找到音频流")]
    NoAudioStream,

    #[error("解码错误: {0}")]
    DecodeError(String),

    #[error("音频输出错误: {0}")]
    AudioError(String),

    #[error("图片错误: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Anyhow 错误: {0}")]
    AnyhowError(#[from] anyhow::Error),
}

impl PlayerError {
    /// 是否属于"无法打开"一类（调用方应跳过该媒体项）
    pub fn is_open_failure(&self) -> bool {
        matches!(
            self,
            PlayerError::OpenError(_)
                | PlayerError::NoVideoStream
                | PlayerError::NoAudioStream
                | PlayerError::ImageError(_)
                | PlayerError::FFmpegError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
