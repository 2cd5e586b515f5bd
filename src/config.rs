//! 运行参数与阈值配置
//! CLI arguments and decode/track threshold configuration

use clap::Parser;

/// 命令行参数
#[derive(Parser, Clone, Debug)]
#[command(name = "lightpose", about = "Multi-person 2D pose estimation with identity tracking")]
pub struct Args {
    /// ONNX 模型路径
    #[arg(long, default_value = "./lightweight_pose.onnx")]
    pub model: String,

    /// 输入图片路径 (可多个, 按顺序作为帧序列处理)
    #[arg(long, num_args = 1..)]
    pub images: Vec<String>,

    /// 网络输入高度
    #[arg(long, default_value_t = 256)]
    pub height_size: u32,

    /// 跨帧跟踪姿态ID
    #[arg(long)]
    pub track: bool,

    /// 平滑关键点 (仅在跟踪开启时生效)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub smooth: bool,

    /// 输出各阶段耗时
    #[arg(long)]
    pub profile: bool,

    /// 以JSON输出每帧姿态到stdout
    #[arg(long)]
    pub json: bool,

    /// 把所有帧的结果保存为带时间戳的JSON文件
    #[arg(long)]
    pub save_results: bool,
}

/// 解码器配置
///
/// 丢弃姿态条目的最小关键点数/最小平均得分是调参常量,
/// 按配置暴露而不是写死在解码逻辑里。
#[derive(Clone, Debug)]
pub struct DecoderConfig {
    /// 网络输入高度
    pub input_height: u32,

    /// 网络下采样步长
    pub stride: u32,

    /// 热图/PAF 解码前的上采样倍率
    pub upsample_ratio: u32,

    /// 热图峰值置信度阈值
    pub peak_threshold: f32,

    /// 同类型峰值去重半径 (像素, 热图分辨率)
    pub suppression_radius: f32,

    /// 每条候选肢体沿线采样点数
    pub paf_sample_count: usize,

    /// 单个采样点的最小对齐得分
    pub min_paf_score: f32,

    /// 通过采样点的最小占比
    pub min_sample_ratio: f32,

    /// 姿态条目保留的最小关键点数
    pub min_pose_keypoints: usize,

    /// 姿态条目保留的最小平均得分
    pub min_pose_score: f32,

    /// 包围盒外扩边距 (像素, 原图分辨率)
    pub bbox_margin: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input_height: 256,
            stride: 8,
            upsample_ratio: 4,
            peak_threshold: 0.1,
            suppression_radius: 6.0,
            paf_sample_count: 10,
            min_paf_score: 0.05,
            min_sample_ratio: 0.8,
            min_pose_keypoints: 3,
            min_pose_score: 0.2,
            bbox_margin: 4.0,
        }
    }
}

/// 跟踪器配置
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// 单个关键点判定"相似"的阈值 (归一化距离的 exp 得分)
    pub keypoint_similarity_threshold: f32,

    /// 继承身份所需的最少相似关键点数
    pub min_similar_keypoints: usize,

    /// 平滑系数 (0..=1, 越大越跟随当前观测)
    pub smooth_alpha: f32,

    /// 抖动阈值 (像素): 位移超过该值视为真实运动, 不平滑
    pub jitter_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            keypoint_similarity_threshold: 0.5,
            min_similar_keypoints: 3,
            smooth_alpha: 0.5,
            jitter_threshold: 20.0,
        }
    }
}
