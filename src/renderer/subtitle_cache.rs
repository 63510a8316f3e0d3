/// 字幕纹理缓存
///
/// 只缓存一份：文本或窗口宽度变化时才重建（字幕排版依赖宽度）。
/// `T` 由具体渲染后端决定，例如 GPU 纹理句柄。
pub struct SubtitleTextureCache<T> {
    text: String,
    width: u32,
    value: Option<T>,
    rebuilds: u64,
}

impl<T> Default for SubtitleTextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubtitleTextureCache<T> {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            width: 0,
            value: None,
            rebuilds: 0,
        }
    }

    /// 键匹配时直接返回缓存，否则调用 `build` 重建
    pub fn get_or_build<F>(&mut self, text: &str, width: u32, build: F) -> &T
    where
        F: FnOnce(&str, u32) -> T,
    {
        let stale = self.value.is_none() || self.text != text || self.width != width;
        if stale {
            self.value = None;
            self.text.clear();
            self.text.push_str(text);
            self.width = width;
            self.rebuilds += 1;
        }
        self.value.get_or_insert_with(|| build(text, width))
    }

    pub fn invalidate(&mut self) {
        self.value = None;
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// 累计重建次数
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}
