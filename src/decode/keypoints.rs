//! 关键点提取
//! Per-type local-maximum extraction over a confidence map

use ndarray::{Array2, ArrayView2};

use super::Candidate;
use crate::config::DecoderConfig;

/// 3x3 高斯近似平滑, 边界复制
fn smooth(map: &ArrayView2<f32>) -> Array2<f32> {
    const KERNEL: [[f32; 3]; 3] = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0], [1.0, 2.0, 1.0]];
    let (h, w) = map.dim();
    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, k) in row.iter().enumerate() {
                    let sy = (y + ky).saturating_sub(1).min(h - 1);
                    let sx = (x + kx).saturating_sub(1).min(w - 1);
                    acc += k * map[[sy, sx]];
                }
            }
            out[[y, x]] = acc / 16.0;
        }
    }
    out
}

/// 从单类型热图提取候选关键点
///
/// 轻度平滑后找严格大于全部8邻域且高于阈值的局部极大值,
/// 越界邻域按0处理, 紧贴边界的峰同样可检出;
/// 去重半径内只保留置信度最高者, 同分按行优先扫描序;
/// 亚像素修正后按全局递增 id 追加进共享候选池, 返回新增数量。
/// 无候选是合法结果, 不报错。
pub fn extract_keypoints(
    heatmap: ArrayView2<f32>,
    pool: &mut Vec<Candidate>,
    next_id: &mut u32,
    config: &DecoderConfig,
) -> usize {
    const NEIGHBORS: [(isize, isize); 8] = [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];
    let (h, w) = heatmap.dim();
    if h == 0 || w == 0 {
        return 0;
    }
    let map = smooth(&heatmap);
    let at = |y: isize, x: isize| -> f32 {
        if y < 0 || x < 0 || y >= h as isize || x >= w as isize {
            0.0
        } else {
            map[[y as usize, x as usize]]
        }
    };

    // 行优先扫描收集峰值, 保证后续稳定排序的确定性
    let mut peaks: Vec<(usize, usize, f32)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let v = map[[y, x]];
            if v <= config.peak_threshold {
                continue;
            }
            let is_peak = NEIGHBORS
                .iter()
                .all(|&(dy, dx)| v > at(y as isize + dy, x as isize + dx));
            if is_peak {
                peaks.push((x, y, heatmap[[y, x]]));
            }
        }
    }

    // 置信度降序 (稳定排序, 同分保持扫描序), 半径内只留最高者
    peaks.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap());
    let radius_sq = config.suppression_radius * config.suppression_radius;
    let mut kept: Vec<(usize, usize, f32)> = Vec::new();
    for &(x, y, conf) in peaks.iter() {
        let duplicate = kept.iter().any(|&(kx, ky, _)| {
            let dx = kx as f32 - x as f32;
            let dy = ky as f32 - y as f32;
            dx * dx + dy * dy < radius_sq
        });
        if !duplicate {
            kept.push((x, y, conf));
        }
    }

    // id 按行优先序分配
    kept.sort_by_key(|&(x, y, _)| (y, x));

    let added = kept.len();
    for (x, y, conf) in kept {
        let (dx, dy) = subpixel_offset(&map, x, y);
        pool.push(Candidate {
            x: x as f32 + dx,
            y: y as f32 + dy,
            confidence: conf,
            id: *next_id,
        });
        *next_id += 1;
    }
    added
}

/// 亚像素修正: 向较强邻居偏移1/4像素
fn subpixel_offset(map: &Array2<f32>, x: usize, y: usize) -> (f32, f32) {
    let (h, w) = map.dim();
    let mut dx = 0.0;
    let mut dy = 0.0;
    if x >= 1 && x + 1 < w {
        let diff = map[[y, x + 1]] - map[[y, x - 1]];
        if diff > 0.0 {
            dx = 0.25;
        } else if diff < 0.0 {
            dx = -0.25;
        }
    }
    if y >= 1 && y + 1 < h {
        let diff = map[[y + 1, x]] - map[[y - 1, x]];
        if diff > 0.0 {
            dy = 0.25;
        } else if diff < 0.0 {
            dy = -0.25;
        }
    }
    (dx, dy)
}
