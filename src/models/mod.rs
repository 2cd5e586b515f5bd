//! 模型接口与具体实现
//! Inference provider boundary: preprocessed tensor in, heatmaps + PAFs out

pub mod openpose;

pub use openpose::OpenPose;

use anyhow::Result;
use ndarray::{Array3, Array4};

/// 姿态估计网络的统一接口
///
/// 输入: NCHW 预处理张量 (batch = 1)
/// 输出: (热图 [K+1, h, w], PAF [2L, h, w]), 空间分辨率为输入的 1/stride。
/// 推理失败按原样向上传播: 当前帧失败, 不重试, 是否中止流由调用方决定。
pub trait PoseModel {
    fn infer(&mut self, xs: Array4<f32>) -> Result<(Array3<f32>, Array3<f32>)>;

    /// 模型摘要信息
    fn summary(&self) {}
}
