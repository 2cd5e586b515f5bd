//! 姿态组装
//! Pose entries + remapped candidates -> per-person Pose objects

use super::grouping::PoseEntry;
use super::Candidate;
use crate::config::DecoderConfig;
use crate::{Point2, Pose, NUM_KEYPOINTS};

/// 由过滤后的条目和已重映射的候选数组组装姿态
///
/// 坐标取整, 缺失槽位保持 None, 条目顺序原样保留 (不重排)。
/// 无任何有效槽位的条目跳过。candidates 按全局 id 扁平索引。
pub fn assemble_poses(
    entries: &[PoseEntry],
    candidates: &[Candidate],
    config: &DecoderConfig,
) -> Vec<Pose> {
    let mut poses = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.valid_count() == 0 {
            continue;
        }
        let mut keypoints: Vec<Option<Point2>> = vec![None; NUM_KEYPOINTS];
        for (slot, kpt) in entry.keypoint_ids.iter().zip(keypoints.iter_mut()) {
            if let Some(id) = slot {
                let cand = &candidates[*id as usize];
                *kpt = Some(Point2::new_with_conf(
                    cand.x.round(),
                    cand.y.round(),
                    cand.confidence,
                ));
            }
        }
        poses.push(Pose::new(keypoints, entry.score, config.bbox_margin));
    }
    poses
}
