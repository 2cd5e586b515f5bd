//! 帧输入源
//! Frame sources: finite image batches and (externally implemented) video
//!
//! 有限图片序列与无限视频流统一走 FrameSource, 取完即止。
//! 相机/视频解码属于外部协作方, 通过实现该 trait 接入。

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::PathBuf;

/// 帧序列的统一接口
///
/// 返回 Ok(None) 表示源耗尽; 单帧读取失败返回 Err,
/// 是否跳帧或中止由调用方决定。
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// 图片文件序列读取器
pub struct ImageReader {
    paths: Vec<PathBuf>,
    index: usize,
}

impl ImageReader {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageReader {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let Some(path) = self.paths.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;
        let frame = image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reader_is_exhausted() {
        let mut reader = ImageReader::new(Vec::<PathBuf>::new());
        assert!(reader.is_empty());
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_error_not_panic() {
        let mut reader = ImageReader::new(vec!["/nonexistent/frame.png"]);
        assert_eq!(reader.len(), 1);
        assert!(reader.next_frame().is_err());
    }
}
