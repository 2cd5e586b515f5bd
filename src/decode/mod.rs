//! 热图/PAF 解码流水线
//! Heatmap + part-affinity-field decoding: raw network surfaces in, pose entries out
//!
//! 各阶段按序执行, 全部无跨帧状态:
//! - preprocess: 缩放/归一化/补边 (并记录逆变换所需参数)
//! - keypoints:  热图局部极大值提取
//! - grouping:   沿PAF积分的逐肢体二分图贪心匹配
//! - preprocess::remap_candidates: 坐标映射回原图
//! - assemble:   组装 Pose 对象

pub mod assemble;
pub mod grouping;
pub mod keypoints;
pub mod preprocess;

/// 候选关键点 (热图分辨率坐标, 重映射后为原图坐标)
///
/// id 在单帧内全局唯一且单调递增: 分组结果按该扁平索引
/// 引用候选点, 而不是 (类型, 类型内序号) 二元组。
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
    pub id: u32,
}
