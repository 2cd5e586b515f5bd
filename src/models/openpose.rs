//! 轻量级 OpenPose (MobileNet backbone) 模型
//!
//! 多阶段网络每个阶段输出一组 (heatmaps, pafs),
//! 取最后两个输出即精化阶段的结果, 与原始模型导出顺序一致。

use anyhow::{bail, Context, Result};
use ndarray::{Array3, Array4};
use std::path::Path;

use crate::ort_backend::OrtBackend;
use crate::{NUM_KEYPOINTS, NUM_LIMBS};

/// 热图通道数: 18 个关键点 + 1 个背景
const HEATMAP_CHANNELS: usize = NUM_KEYPOINTS + 1;

/// PAF 通道数: 每条肢体一对 (x, y) 分量
const PAF_CHANNELS: usize = 2 * NUM_LIMBS;

pub struct OpenPose {
    engine: OrtBackend,
    model_path: String,
}

impl OpenPose {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let engine = OrtBackend::build(model_path.as_ref())?;
        if engine.output_names().len() < 2 {
            bail!(
                "Pose model must expose at least (heatmaps, pafs) outputs, got {}",
                engine.output_names().len()
            );
        }
        Ok(Self {
            engine,
            model_path: model_path.as_ref().display().to_string(),
        })
    }

    pub fn engine(&self) -> &OrtBackend {
        &self.engine
    }

    /// 校验网络输出形状: 通道数固定, 空间尺寸非零
    fn validate(heatmaps: &Array3<f32>, pafs: &Array3<f32>) -> Result<()> {
        let (hc, hh, hw) = heatmaps.dim();
        let (pc, ph, pw) = pafs.dim();
        if hc != HEATMAP_CHANNELS {
            bail!("Unexpected heatmap channel count: {} (want {})", hc, HEATMAP_CHANNELS);
        }
        if pc != PAF_CHANNELS {
            bail!("Unexpected PAF channel count: {} (want {})", pc, PAF_CHANNELS);
        }
        if hh == 0 || hw == 0 {
            bail!("Heatmap has zero spatial size: {}x{}", hw, hh);
        }
        if (ph, pw) != (hh, hw) {
            bail!(
                "Heatmap/PAF resolution mismatch: {}x{} vs {}x{}",
                hw,
                hh,
                pw,
                ph
            );
        }
        Ok(())
    }
}

impl super::PoseModel for OpenPose {
    fn infer(&mut self, xs: Array4<f32>) -> Result<(Array3<f32>, Array3<f32>)> {
        let mut ys = self.engine.run(xs)?;
        // 倒数第二个输出是热图, 最后一个是PAF
        let pafs4 = ys.pop().context("Missing PAF output")?;
        let heatmaps4 = ys.pop().context("Missing heatmap output")?;
        let heatmaps = heatmaps4
            .into_dimensionality::<ndarray::Ix4>()?
            .index_axis_move(ndarray::Axis(0), 0);
        let pafs = pafs4
            .into_dimensionality::<ndarray::Ix4>()?
            .index_axis_move(ndarray::Axis(0), 0);
        Self::validate(&heatmaps, &pafs)?;
        Ok((heatmaps, pafs))
    }

    fn summary(&self) {
        println!(
            "\nSummary:\n\
            > Model: {}\n\
            > Input: {}\n\
            > Outputs: {:?}\n\
            > Heatmap channels: {}, PAF channels: {}\n\
            ",
            self.model_path,
            self.engine.input_name(),
            self.engine.output_names(),
            HEATMAP_CHANNELS,
            PAF_CHANNELS,
        );
    }
}
