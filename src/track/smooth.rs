//! 关键点平滑
//! EWMA blend of matched keypoints to suppress frame-to-frame jitter

use crate::config::TrackerConfig;
use crate::{Point2, Pose};

/// 对已配对姿态做指数加权平滑
///
/// 仅当位移低于抖动阈值时向当前观测插值:
/// new = prev + alpha * (cur - prev), 位移为0时不变,
/// alpha <= 1 保证不会越过当前观测 (无过冲)。
/// 大位移视为真实运动, 直接采用当前观测以免拖影。
/// 仅共同有效的关键点参与, 其余保持原样。
pub fn smooth_keypoints(current: &mut Pose, previous: &Pose, config: &TrackerConfig) {
    let alpha = config.smooth_alpha.clamp(0.0, 1.0);
    let mut changed = false;
    for (cur_slot, prev_slot) in current.keypoints.iter_mut().zip(previous.keypoints.iter()) {
        if let (Some(cur), Some(prev)) = (cur_slot.as_ref(), prev_slot.as_ref()) {
            let displacement = cur.distance(prev);
            if displacement > 0.0 && displacement < config.jitter_threshold {
                let x = prev.x() + alpha * (cur.x() - prev.x());
                let y = prev.y() + alpha * (cur.y() - prev.y());
                *cur_slot = Some(Point2::new_with_conf(x, y, cur.confidence()));
                changed = true;
            }
        }
    }
    if changed {
        current.update_bbox();
    }
}
