//! 预处理与坐标重映射
//! Frame -> normalized, stride-aligned NCHW tensor; and the exact inverse
//! mapping from decoded map coordinates back to original-frame pixels.

use anyhow::{bail, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma};
use ndarray::{Array3, Array4};

use super::Candidate;

/// 像素归一化均值
const IMG_MEAN: f32 = 128.0;

/// 像素归一化系数
const IMG_SCALE: f32 = 1.0 / 256.0;

/// 补边数量 (行/列)
///
/// 只在下/右侧补边, 上/左恒为0, 但四个偏移都保留,
/// 逆变换只依赖 top/left。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pad {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

/// 预处理结果
pub struct Preprocessed {
    /// NCHW 张量, batch = 1
    pub tensor: Array4<f32>,
    /// 缩放系数 (网络输入高度 / 原图高度)
    pub scale: f32,
    /// 补边偏移
    pub pad: Pad,
}

/// 帧预处理
///
/// 等比缩放到网络输入高度, 逐像素归一化 ((v - mean) * scale),
/// 再把宽高补到 stride 的整数倍 (归一化后的0填充)。
/// 补边只增不裁, scale 恒大于0。空帧报错。
pub fn preprocess(frame: &DynamicImage, input_height: u32, stride: u32) -> Result<Preprocessed> {
    let (w0, h0) = frame.dimensions();
    if w0 == 0 || h0 == 0 {
        bail!("Empty frame: {}x{}", w0, h0);
    }

    let scale = input_height as f32 / h0 as f32;
    let w_new = ((w0 as f32 * scale).round() as u32).max(1);
    let resized = frame.resize_exact(w_new, input_height, FilterType::CatmullRom);

    let pad = Pad {
        top: 0,
        left: 0,
        bottom: align_up(input_height, stride) - input_height,
        right: align_up(w_new, stride) - w_new,
    };
    let padded_h = (input_height + pad.bottom) as usize;
    let padded_w = (w_new + pad.right) as usize;

    // 补边区域保持归一化后的0
    let mut tensor = Array4::<f32>::zeros((1, 3, padded_h, padded_w));
    for (x, y, rgb) in resized.pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b, _] = rgb.0;
        tensor[[0, 0, y, x]] = (r as f32 - IMG_MEAN) * IMG_SCALE;
        tensor[[0, 1, y, x]] = (g as f32 - IMG_MEAN) * IMG_SCALE;
        tensor[[0, 2, y, x]] = (b as f32 - IMG_MEAN) * IMG_SCALE;
    }

    Ok(Preprocessed { tensor, scale, pad })
}

fn align_up(v: u32, stride: u32) -> u32 {
    v.div_ceil(stride) * stride
}

/// 逐通道上采样网络输出面 (热图或PAF)
pub fn upsample_maps(maps: &Array3<f32>, ratio: u32) -> Array3<f32> {
    let (c, h, w) = maps.dim();
    if ratio <= 1 {
        return maps.clone();
    }
    let (nh, nw) = (h * ratio as usize, w * ratio as usize);
    let mut out = Array3::<f32>::zeros((c, nh, nw));
    for ch in 0..c {
        let raw: Vec<f32> = maps
            .index_axis(ndarray::Axis(0), ch)
            .iter()
            .copied()
            .collect();
        let buf: ImageBuffer<Luma<f32>, Vec<f32>> =
            match ImageBuffer::from_raw(w as u32, h as u32, raw) {
                Some(buf) => buf,
                None => continue,
            };
        let resized = image::imageops::resize(&buf, nw as u32, nh as u32, FilterType::CatmullRom);
        for y in 0..nh {
            for x in 0..nw {
                out[[ch, y, x]] = resized.get_pixel(x as u32, y as u32).0[0];
            }
        }
    }
    out
}

/// 坐标重映射: 解码分辨率 -> 原图像素
///
/// 预处理 + 上采样链的精确代数逆:
/// 乘 stride/upsample_ratio 回到网络输入分辨率, 减补边, 除缩放。
/// 分组在热图分辨率下完成后对共享候选数组就地执行一次,
/// 避免每条肢体重复变换。
pub fn remap_candidates(
    candidates: &mut [Candidate],
    stride: u32,
    upsample_ratio: u32,
    pad: Pad,
    scale: f32,
) {
    let factor = stride as f32 / upsample_ratio as f32;
    for cand in candidates.iter_mut() {
        cand.x = (cand.x * factor - pad.left as f32) / scale;
        cand.y = (cand.y * factor - pad.top as f32) / scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(w, h, image::Rgb([128, 128, 128])))
    }

    #[test]
    fn test_preprocess_shapes_and_scale() {
        let frame = gray_frame(640, 480);
        let pre = preprocess(&frame, 256, 8).unwrap();
        let (_, c, h, w) = pre.tensor.dim();
        assert_eq!(c, 3);
        assert_eq!(h % 8, 0);
        assert_eq!(w % 8, 0);
        assert!((pre.scale - 256.0 / 480.0).abs() < 1e-6);
        assert_eq!(pre.pad.top, 0);
        assert_eq!(pre.pad.left, 0);
        // 缩放后宽 341 -> 补到 344
        assert_eq!(pre.pad.right, 3);
        assert_eq!(pre.pad.bottom, 0);
    }

    #[test]
    fn test_preprocess_normalization() {
        // 128灰度归一化后应为0
        let frame = gray_frame(256, 256);
        let pre = preprocess(&frame, 256, 8).unwrap();
        assert!(pre.tensor[[0, 0, 100, 100]].abs() < 1e-2);
    }

    #[test]
    fn test_preprocess_rejects_empty_frame() {
        let frame = DynamicImage::new_rgb8(0, 0);
        assert!(preprocess(&frame, 256, 8).is_err());
    }

    #[test]
    fn test_remap_is_inverse_of_preprocess() {
        // 原图 (200, 100), 输入高 256 -> scale = 2.56, 无需补边时
        // 解码坐标 x_map = x_orig * scale * U / S
        let frame = gray_frame(400, 200);
        let pre = preprocess(&frame, 256, 8).unwrap();
        let (stride, up) = (8u32, 4u32);

        let x_orig = 123.0f32;
        let y_orig = 77.0f32;
        let x_map = x_orig * pre.scale * up as f32 / stride as f32;
        let y_map = y_orig * pre.scale * up as f32 / stride as f32;

        let mut cands = vec![Candidate {
            x: x_map,
            y: y_map,
            confidence: 1.0,
            id: 0,
        }];
        remap_candidates(&mut cands, stride, up, pre.pad, pre.scale);
        assert!((cands[0].x - x_orig).abs() < 0.5);
        assert!((cands[0].y - y_orig).abs() < 0.5);
    }

    #[test]
    fn test_upsample_preserves_constant_map() {
        let maps = Array3::<f32>::from_elem((2, 8, 8), 0.7);
        let up = upsample_maps(&maps, 4);
        assert_eq!(up.dim(), (2, 32, 32));
        assert!((up[[1, 16, 16]] - 0.7).abs() < 1e-3);
    }
}
