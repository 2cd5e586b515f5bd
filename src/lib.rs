#![allow(clippy::type_complexity)]
pub mod config; // 运行参数与解码/跟踪阈值配置
pub mod decode; // 热图/PAF 解码流水线
pub mod input; // 帧输入源
pub mod models; // 模型接口与具体实现
pub mod pipeline; // 单帧推理与视频跟踪编排
pub mod pose; // 姿态结果与序列化
pub mod track; // 跨帧身份跟踪

pub mod ort_backend;

pub use crate::config::{Args, DecoderConfig, TrackerConfig};
pub use crate::models::{OpenPose, PoseModel};
pub use crate::ort_backend::OrtBackend;
pub use crate::pose::{Pose, PoseRecord};

/// COCO-18 关键点数量 (热图另含 1 个背景通道,解码时忽略)
pub const NUM_KEYPOINTS: usize = 18;

/// 肢体数量 (PAF 通道数 = 2 * NUM_LIMBS)
pub const NUM_LIMBS: usize = 19;

/// 关键点名称 (索引与热图通道一致)
pub const KEYPOINT_NAMES: [&str; NUM_KEYPOINTS] = [
    "nose", "neck", "r_sho", "r_elb", "r_wri", "l_sho", "l_elb", "l_wri", "r_hip", "r_knee",
    "r_ank", "l_hip", "l_knee", "l_ank", "r_eye", "l_eye", "r_ear", "l_ear",
];

/// 每条肢体连接的关键点类型对 (有向: 起点类型, 终点类型)
pub const BODY_PARTS_KPT_IDS: [(usize, usize); NUM_LIMBS] = [
    (1, 2),
    (1, 5),
    (2, 3),
    (3, 4),
    (5, 6),
    (6, 7),
    (1, 8),
    (8, 9),
    (9, 10),
    (1, 11),
    (11, 12),
    (12, 13),
    (1, 0),
    (0, 14),
    (14, 16),
    (0, 15),
    (15, 17),
    (2, 16),
    (5, 17),
];

/// 每条肢体对应的 PAF 通道对 (x分量通道, y分量通道)
pub const BODY_PARTS_PAF_IDS: [(usize, usize); NUM_LIMBS] = [
    (12, 13),
    (20, 21),
    (14, 15),
    (16, 17),
    (22, 23),
    (24, 25),
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    (8, 9),
    (10, 11),
    (28, 29),
    (30, 31),
    (34, 35),
    (32, 33),
    (36, 37),
    (18, 19),
    (26, 27),
];

/// 绘制用骨架 (最后两条肩-耳辅助肢体不用于显示)
pub const SKELETON: [(usize, usize); 17] = [
    (1, 2),
    (1, 5),
    (2, 3),
    (3, 4),
    (5, 6),
    (6, 7),
    (1, 8),
    (8, 9),
    (9, 10),
    (1, 11),
    (11, 12),
    (12, 13),
    (1, 0),
    (0, 14),
    (14, 16),
    (0, 15),
    (15, 17),
];

pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!("%Y{}%m{}%d{}%H{}%M{}%S", delimiter, delimiter, delimiter, delimiter, delimiter);
    t_now.format(&fmt).to_string()
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Point2 {
    // A point2d with x, y, conf
    x: f32,
    y: f32,
    confidence: f32,
}

impl Point2 {
    pub fn new_with_conf(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// 到另一点的欧氏距离
    pub fn distance(&self, another: &Point2) -> f32 {
        let dx = self.x - another.x;
        let dy = self.y - another.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BBox {
    // a bounding box around a detected person
    xmin: f32,
    ymin: f32,
    width: f32,
    height: f32,
}

impl BBox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32) -> Self {
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn intersection_area(&self, another: &BBox) -> f32 {
        let l = self.xmin.max(another.xmin);
        let r = self.xmax().min(another.xmax());
        let t = self.ymin.max(another.ymin);
        let b = self.ymax().min(another.ymax());
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn union(&self, another: &BBox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    pub fn iou(&self, another: &BBox) -> f32 {
        let union = self.union(another);
        if union <= 0. {
            return 0.;
        }
        self.intersection_area(another) / union
    }
}
