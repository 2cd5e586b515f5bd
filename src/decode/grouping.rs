//! 姿态分组
//! Limb-by-limb bipartite association of candidate keypoints using the
//! part affinity fields as edge-weight evidence.

use ndarray::Array3;

use super::Candidate;
use crate::config::DecoderConfig;
use crate::{BODY_PARTS_KPT_IDS, BODY_PARTS_PAF_IDS, NUM_KEYPOINTS, NUM_LIMBS};

/// 姿态条目: 每个关键点类型一个槽位 + 累计得分
///
/// 槽位保存候选点的全局 id, 缺失为 None。
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEntry {
    pub keypoint_ids: [Option<u32>; NUM_KEYPOINTS],
    pub score: f32,
}

impl PoseEntry {
    fn new() -> Self {
        Self {
            keypoint_ids: [None; NUM_KEYPOINTS],
            score: 0.0,
        }
    }

    /// 已填充槽位数
    pub fn valid_count(&self) -> usize {
        self.keypoint_ids.iter().filter(|s| s.is_some()).count()
    }
}

/// 一条肢体的候选连接
struct Connection {
    a_idx: usize,
    b_idx: usize,
    score: f32,
}

/// 沿候选点对连线积分PAF, 计算对齐得分
///
/// 固定采样点数, 统计与连线方向对齐 (点积超过阈值) 的采样点;
/// 通过率不足即否决。得分为通过点的平均对齐度加长度惩罚
/// (过长的连接按 min(0.5 * 图高 / 长度 - 1, 0) 扣分)。
fn connection_score(
    a: &Candidate,
    b: &Candidate,
    pafs: &Array3<f32>,
    paf_channels: (usize, usize),
    config: &DecoderConfig,
) -> Option<f32> {
    let (_, map_h, map_w) = pafs.dim();
    let vx = b.x - a.x;
    let vy = b.y - a.y;
    let norm = (vx * vx + vy * vy).sqrt();
    if norm < 1e-4 {
        return None;
    }
    let (ux, uy) = (vx / norm, vy / norm);

    let samples = config.paf_sample_count.max(2);
    let mut passed = 0usize;
    let mut acc = 0.0f32;
    for s in 0..samples {
        let t = s as f32 / (samples - 1) as f32;
        let px = (a.x + t * vx).round() as isize;
        let py = (a.y + t * vy).round() as isize;
        let px = px.clamp(0, map_w as isize - 1) as usize;
        let py = py.clamp(0, map_h as isize - 1) as usize;
        let dot = pafs[[paf_channels.0, py, px]] * ux + pafs[[paf_channels.1, py, px]] * uy;
        if dot > config.min_paf_score {
            passed += 1;
            acc += dot;
        }
    }

    if (passed as f32) < config.min_sample_ratio * samples as f32 {
        return None;
    }
    let mut score = acc / passed as f32;
    score += (0.5 * map_h as f32 / norm - 1.0).min(0.0);
    if score <= 0.0 {
        return None;
    }
    Some(score)
}

/// 单条肢体的贪心最大权匹配
///
/// 得分降序逐对认领, 每个候选点一条肢体内最多用一次。
/// 非全局最优, 换取确定性和速度。
fn greedy_match(mut connections: Vec<Connection>, n_a: usize, n_b: usize) -> Vec<Connection> {
    connections.sort_by(|c1, c2| c2.score.partial_cmp(&c1.score).unwrap());
    let mut used_a = vec![false; n_a];
    let mut used_b = vec![false; n_b];
    let mut matched = Vec::new();
    for conn in connections {
        if !used_a[conn.a_idx] && !used_b[conn.b_idx] {
            used_a[conn.a_idx] = true;
            used_b[conn.b_idx] = true;
            matched.push(conn);
        }
    }
    matched
}

/// 把候选关键点按肢体证据分组为姿态条目
///
/// 输入为按类型划分的候选池 (坐标为解码分辨率) 与PAF。
/// 某类型无候选时相关肢体自然无匹配, 不是错误。
/// 输出条目已按最小槽位数/最小平均得分过滤, 累计得分必为正。
pub fn group_keypoints(
    by_type: &[Vec<Candidate>],
    pafs: &Array3<f32>,
    config: &DecoderConfig,
) -> Vec<PoseEntry> {
    debug_assert_eq!(by_type.len(), NUM_KEYPOINTS);
    let mut entries: Vec<PoseEntry> = Vec::new();

    for limb in 0..NUM_LIMBS {
        let (type_a, type_b) = BODY_PARTS_KPT_IDS[limb];
        let cands_a = &by_type[type_a];
        let cands_b = &by_type[type_b];
        if cands_a.is_empty() || cands_b.is_empty() {
            continue;
        }

        let mut connections = Vec::new();
        for (i, a) in cands_a.iter().enumerate() {
            for (j, b) in cands_b.iter().enumerate() {
                if let Some(score) =
                    connection_score(a, b, pafs, BODY_PARTS_PAF_IDS[limb], config)
                {
                    connections.push(Connection {
                        a_idx: i,
                        b_idx: j,
                        score,
                    });
                }
            }
        }

        let matched = greedy_match(connections, cands_a.len(), cands_b.len());

        for conn in matched {
            let a = &cands_a[conn.a_idx];
            let b = &cands_b[conn.b_idx];
            merge_connection(&mut entries, type_a, type_b, a, b, conn.score);
        }
    }

    entries.retain(|e| {
        let valid = e.valid_count();
        valid >= config.min_pose_keypoints
            && e.score > 0.0
            && e.score / valid as f32 >= config.min_pose_score
    });
    entries
}

/// 把一条匹配肢体并入姿态条目
///
/// - 两端都未归属: 开新条目
/// - 一端已归属: 扩展该条目
/// - 两端归属不同条目: 槽位无冲突则合并, 否则放弃该连接
/// - 两端已在同一条目 (肢体闭环): 只累计得分
fn merge_connection(
    entries: &mut Vec<PoseEntry>,
    type_a: usize,
    type_b: usize,
    a: &Candidate,
    b: &Candidate,
    score: f32,
) {
    let found_a = entries
        .iter()
        .position(|e| e.keypoint_ids[type_a] == Some(a.id));
    let found_b = entries
        .iter()
        .position(|e| e.keypoint_ids[type_b] == Some(b.id));

    match (found_a, found_b) {
        (None, None) => {
            let mut entry = PoseEntry::new();
            entry.keypoint_ids[type_a] = Some(a.id);
            entry.keypoint_ids[type_b] = Some(b.id);
            entry.score = a.confidence + b.confidence + score;
            entries.push(entry);
        }
        (Some(ia), None) => {
            if entries[ia].keypoint_ids[type_b].is_none() {
                entries[ia].keypoint_ids[type_b] = Some(b.id);
                entries[ia].score += b.confidence + score;
            }
        }
        (None, Some(ib)) => {
            if entries[ib].keypoint_ids[type_a].is_none() {
                entries[ib].keypoint_ids[type_a] = Some(a.id);
                entries[ib].score += a.confidence + score;
            }
        }
        (Some(ia), Some(ib)) if ia == ib => {
            entries[ia].score += score;
        }
        (Some(ia), Some(ib)) => {
            // 槽位有重叠时合并会覆盖已有关键点, 放弃
            let conflict = entries[ia]
                .keypoint_ids
                .iter()
                .zip(entries[ib].keypoint_ids.iter())
                .any(|(sa, sb)| sa.is_some() && sb.is_some());
            if conflict {
                return;
            }
            let other = entries.swap_remove(ib.max(ia));
            let keep = ib.min(ia);
            // swap_remove 后较小下标仍然有效
            for (slot, val) in entries[keep].keypoint_ids.iter_mut().zip(other.keypoint_ids) {
                if slot.is_none() {
                    *slot = val;
                }
            }
            entries[keep].score += other.score + score;
        }
    }
}
