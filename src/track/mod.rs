//! 跨帧身份跟踪
//! Frame-to-frame identity assignment with optional keypoint smoothing
//!
//! 唯一的跨帧状态是身份计数器, 每个视频流独享一个 PoseTracker;
//! 上一帧姿态列表由调用方持有并整体替换, 多流并用必须各建各的。

pub mod smooth;

use crate::config::TrackerConfig;
use crate::{Pose, NUM_KEYPOINTS};

/// 每类关键点的定位方差 (OKS风格, 脸部严格, 髋膝宽松)
const KPT_SIGMAS: [f32; NUM_KEYPOINTS] = [
    0.026, 0.079, 0.079, 0.072, 0.062, 0.079, 0.072, 0.062, 0.107, 0.087, 0.089, 0.107, 0.087,
    0.089, 0.025, 0.025, 0.035, 0.035,
];

/// 姿态身份跟踪器
pub struct PoseTracker {
    config: TrackerConfig,
    /// 下一个分配的身份 (单调递增, 流级生命周期)
    next_id: u32,
}

impl PoseTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config, next_id: 0 }
    }

    /// 当前活跃的下一个身份号 (测试/监控用)
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// 身份分配与可选平滑
    ///
    /// 相似度 = 共同有效关键点里"足够近"(按姿态面积和逐类方差归一化)
    /// 的数量, 加包围盒IoU做同分细分。全部候选对按相似度降序贪心认领,
    /// 每个上一帧姿态最多被认领一次; 相似关键点数不足阈值的不配对,
    /// 落选的当前姿态分配新身份。只改当前姿态, 不动上一帧。
    pub fn track(&mut self, previous: &[Pose], current: &mut [Pose], smooth_kpts: bool) {
        // (相似度, 当前下标, 上一帧下标)
        let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
        for (ci, cur) in current.iter().enumerate() {
            for (pi, prev) in previous.iter().enumerate() {
                let similar = self.count_similar_keypoints(cur, prev);
                if similar < self.config.min_similar_keypoints {
                    continue;
                }
                let score = similar as f32 + cur.bbox.iou(&prev.bbox);
                candidates.push((score, ci, pi));
            }
        }
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

        let mut cur_taken = vec![false; current.len()];
        let mut prev_taken = vec![false; previous.len()];
        for (_, ci, pi) in candidates {
            if cur_taken[ci] || prev_taken[pi] {
                continue;
            }
            cur_taken[ci] = true;
            prev_taken[pi] = true;
            current[ci].id = previous[pi].id;
            if smooth_kpts {
                smooth::smooth_keypoints(&mut current[ci], &previous[pi], &self.config);
            }
        }

        for (ci, taken) in cur_taken.iter().enumerate() {
            if !taken {
                current[ci].id = Some(self.next_id);
                self.next_id += 1;
            }
        }
    }

    /// 共同有效且归一化距离足够近的关键点数量
    fn count_similar_keypoints(&self, a: &Pose, b: &Pose) -> usize {
        let area = a.bbox.area().max(b.bbox.area()).max(1.0);
        let mut count = 0;
        for kpt_id in 0..NUM_KEYPOINTS {
            if let (Some(ka), Some(kb)) = (&a.keypoints[kpt_id], &b.keypoints[kpt_id]) {
                let d = ka.distance(kb);
                let var = (2.0 * KPT_SIGMAS[kpt_id]).powi(2);
                let similarity = (-(d * d) / (2.0 * area * var)).exp();
                if similarity > self.config.keypoint_similarity_threshold {
                    count += 1;
                }
            }
        }
        count
    }
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
