//! 姿态结果与序列化
//! Assembled per-person pose in original-frame pixel coordinates

use serde::{Deserialize, Serialize};

use crate::{BBox, Point2, NUM_KEYPOINTS};

/// 单人姿态
///
/// keypoints 长度恒为 NUM_KEYPOINTS, 缺失关节为 None。
/// 坐标经过重映射后为原图像素坐标。id 仅由跟踪器赋值,
/// 每帧重新组装, 对象身份不跨帧保留。
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub keypoints: Vec<Option<Point2>>,
    pub bbox: BBox,
    pub confidence: f32,
    pub id: Option<u32>,
    /// 构建时的包围盒外扩边距, 重算包围盒时沿用
    bbox_margin: f32,
}

impl Pose {
    /// 由关键点序列构建, 包围盒取有效关键点的外扩范围
    pub fn new(keypoints: Vec<Option<Point2>>, confidence: f32, bbox_margin: f32) -> Self {
        debug_assert_eq!(keypoints.len(), NUM_KEYPOINTS);
        let bbox = Self::bbox_from_keypoints(&keypoints, bbox_margin);
        Self {
            keypoints,
            bbox,
            confidence,
            id: None,
            bbox_margin,
        }
    }

    /// 有效关键点数
    pub fn valid_keypoints(&self) -> usize {
        self.keypoints.iter().filter(|k| k.is_some()).count()
    }

    /// 平滑后重算包围盒, 外扩边距与构建时一致
    pub fn update_bbox(&mut self) {
        self.bbox = Self::bbox_from_keypoints(&self.keypoints, self.bbox_margin);
    }

    fn bbox_from_keypoints(keypoints: &[Option<Point2>], margin: f32) -> BBox {
        let mut xmin = f32::MAX;
        let mut ymin = f32::MAX;
        let mut xmax = f32::MIN;
        let mut ymax = f32::MIN;
        let mut any = false;
        for kpt in keypoints.iter().flatten() {
            any = true;
            xmin = xmin.min(kpt.x());
            ymin = ymin.min(kpt.y());
            xmax = xmax.max(kpt.x());
            ymax = ymax.max(kpt.y());
        }
        if !any {
            return BBox::default();
        }
        BBox::new(
            xmin - margin,
            ymin - margin,
            xmax - xmin + 2.0 * margin,
            ymax - ymin + 2.0 * margin,
        )
    }
}

/// 姿态的网络传输格式
///
/// keypoints 为 K 个 [x, y] 整数对, 缺失关节用 [-1, -1] 哨兵
/// (与原有API保持兼容)。id/confidence 为可选的向后兼容扩展字段。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRecord {
    pub keypoints: Vec<[i32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<&Pose> for PoseRecord {
    fn from(pose: &Pose) -> Self {
        let keypoints = pose
            .keypoints
            .iter()
            .map(|kpt| match kpt {
                Some(p) => [p.x().round() as i32, p.y().round() as i32],
                None => [-1, -1],
            })
            .collect();
        Self {
            keypoints,
            id: pose.id,
            confidence: Some(pose.confidence),
        }
    }
}
