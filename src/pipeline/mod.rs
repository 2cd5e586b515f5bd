//! 推理与跟踪编排
//! Per-frame decode orchestration and the cross-frame video loop
//!
//! 单帧内各阶段严格串行: 预处理 -> 推理 -> 上采样 -> 提取 ->
//! 分组 -> 重映射 -> 组装; 帧间严格按到达顺序处理。
//! 除 VideoPipeline 持有的跟踪状态外全部无状态。

use anyhow::Result;
use image::DynamicImage;
use ndarray::Axis;
use std::time::Instant;

use crate::config::{DecoderConfig, TrackerConfig};
use crate::decode::keypoints::extract_keypoints;
use crate::decode::grouping::group_keypoints;
use crate::decode::preprocess::{preprocess, remap_candidates, upsample_maps};
use crate::decode::{assemble::assemble_poses, Candidate};
use crate::input::FrameSource;
use crate::models::PoseModel;
use crate::track::PoseTracker;
use crate::{Pose, NUM_KEYPOINTS};

/// 单帧姿态估计器 (无跨帧状态)
pub struct PoseEstimator {
    model: Box<dyn PoseModel>,
    config: DecoderConfig,
    profile: bool,
}

impl PoseEstimator {
    pub fn new(model: Box<dyn PoseModel>, config: DecoderConfig) -> Self {
        Self {
            model,
            config,
            profile: false,
        }
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 对单帧解码出全部姿态 (原图坐标, id 未赋值)
    pub fn infer_frame(&mut self, frame: &DynamicImage) -> Result<Vec<Pose>> {
        let t_pre = Instant::now();
        let pre = preprocess(frame, self.config.input_height, self.config.stride)?;
        if self.profile {
            println!("[Preprocess]: {:?}", t_pre.elapsed());
        }

        let t_run = Instant::now();
        let (heatmaps, pafs) = self.model.infer(pre.tensor)?;
        if self.profile {
            println!("[Inference]: {:?}", t_run.elapsed());
        }

        let t_post = Instant::now();
        let heatmaps = upsample_maps(&heatmaps, self.config.upsample_ratio);
        let pafs = upsample_maps(&pafs, self.config.upsample_ratio);

        // 每类关键点提取候选, 全局 id 贯穿整个池
        let mut by_type: Vec<Vec<Candidate>> = vec![Vec::new(); NUM_KEYPOINTS];
        let mut next_id = 0u32;
        for (kpt_idx, pool) in by_type.iter_mut().enumerate() {
            let map = heatmaps.index_axis(Axis(0), kpt_idx);
            extract_keypoints(map, pool, &mut next_id, &self.config);
        }

        let entries = group_keypoints(&by_type, &pafs, &self.config);

        // 分组在热图分辨率完成, 之后一次性重映射回原图
        let mut candidates: Vec<Candidate> = by_type.into_iter().flatten().collect();
        remap_candidates(
            &mut candidates,
            self.config.stride,
            self.config.upsample_ratio,
            pre.pad,
            pre.scale,
        );

        let poses = assemble_poses(&entries, &candidates, &self.config);
        if self.profile {
            println!("[Decode]: {:?}", t_post.elapsed());
        }
        Ok(poses)
    }
}

/// 视频流水线: 唯一的跨帧状态持有者
///
/// 上一帧姿态列表每帧整体替换, 不做部分更新;
/// 一个流水线只服务一个流 (身份计数器不可多流共享)。
pub struct VideoPipeline {
    estimator: PoseEstimator,
    tracker: PoseTracker,
    previous: Vec<Pose>,
    track: bool,
    smooth: bool,
}

impl VideoPipeline {
    pub fn new(estimator: PoseEstimator, tracker_config: TrackerConfig, track: bool, smooth: bool) -> Self {
        Self {
            estimator,
            tracker: PoseTracker::new(tracker_config),
            previous: Vec::new(),
            track,
            smooth,
        }
    }

    /// 处理一帧: 解码 + (可选) 身份跟踪与平滑
    pub fn process_frame(&mut self, frame: &DynamicImage) -> Result<Vec<Pose>> {
        let mut poses = self.estimator.infer_frame(frame)?;
        if self.track {
            self.tracker.track(&self.previous, &mut poses, self.smooth);
            self.previous = poses.clone();
        }
        Ok(poses)
    }

    /// 顺序消费帧源直至耗尽, 每帧结果交给 sink
    ///
    /// 单帧失败原样上抛, 不重试; 跳帧还是中止由调用方决定。
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        mut sink: impl FnMut(usize, &[Pose]),
    ) -> Result<usize> {
        let mut frame_idx = 0usize;
        while let Some(frame) = source.next_frame()? {
            let poses = self.process_frame(&frame)?;
            sink(frame_idx, &poses);
            frame_idx += 1;
        }
        Ok(frame_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BODY_PARTS_PAF_IDS, NUM_LIMBS};
    use ndarray::{Array3, Array4};
    use std::collections::VecDeque;

    /// 回放预置输出的假模型
    struct MockModel {
        responses: VecDeque<(Array3<f32>, Array3<f32>)>,
    }

    impl PoseModel for MockModel {
        fn infer(&mut self, _xs: Array4<f32>) -> Result<(Array3<f32>, Array3<f32>)> {
            self.responses
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("No more mock responses"))
        }
    }

    const MAP: usize = 32;

    /// 测试用解码配置: 不上采样, 热图即解码分辨率
    fn test_config() -> DecoderConfig {
        DecoderConfig {
            upsample_ratio: 1,
            ..DecoderConfig::default()
        }
    }

    fn put_peak(maps: &mut Array3<f32>, ch: usize, cx: usize, cy: usize) {
        for y in 0..MAP {
            for x in 0..MAP {
                let d = ((x as f32 - cx as f32).powi(2) + (y as f32 - cy as f32).powi(2)).sqrt();
                let v = (0.9 - 0.15 * d).max(0.0);
                if v > maps[[ch, y, x]] {
                    maps[[ch, y, x]] = v;
                }
            }
        }
    }

    fn put_band(pafs: &mut Array3<f32>, limb: usize, from: (f32, f32), to: (f32, f32)) {
        let (cx, cy) = BODY_PARTS_PAF_IDS[limb];
        let vx = to.0 - from.0;
        let vy = to.1 - from.1;
        let norm = (vx * vx + vy * vy).sqrt();
        let (ux, uy) = (vx / norm, vy / norm);
        for y in 0..MAP {
            for x in 0..MAP {
                let px = x as f32 - from.0;
                let py = y as f32 - from.1;
                let along = px * ux + py * uy;
                let across = (px * uy - py * ux).abs();
                if along >= -2.0 && along <= norm + 2.0 && across <= 2.0 {
                    pafs[[cx, y, x]] = ux;
                    pafs[[cy, y, x]] = uy;
                }
            }
        }
    }

    /// 5个可见关节 (neck/r_sho/r_elb/r_hip/r_knee) 的单人帧, 整体偏移 shift (热图像素)
    fn person_maps(shift: usize) -> (Array3<f32>, Array3<f32>) {
        let mut heatmaps = Array3::<f32>::zeros((NUM_KEYPOINTS + 1, MAP, MAP));
        let mut pafs = Array3::<f32>::zeros((2 * NUM_LIMBS, MAP, MAP));
        let joints: [(usize, usize, usize); 5] = [
            (1, 8 + shift, 6),  // neck
            (2, 12 + shift, 6), // r_sho
            (3, 16 + shift, 6), // r_elb
            (8, 8 + shift, 14), // r_hip
            (9, 8 + shift, 20), // r_knee
        ];
        for &(ch, x, y) in joints.iter() {
            put_peak(&mut heatmaps, ch, x, y);
        }
        let at = |i: usize| (joints[i].1 as f32, joints[i].2 as f32);
        put_band(&mut pafs, 0, at(0), at(1)); // (1,2)
        put_band(&mut pafs, 2, at(1), at(2)); // (2,3)
        put_band(&mut pafs, 6, at(0), at(3)); // (1,8)
        put_band(&mut pafs, 7, at(3), at(4)); // (8,9)
        (heatmaps, pafs)
    }

    fn gray_frame() -> DynamicImage {
        DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(
            256,
            256,
            image::Rgb([128, 128, 128]),
        ))
    }

    fn pipeline_with(
        responses: Vec<(Array3<f32>, Array3<f32>)>,
        track: bool,
        smooth: bool,
    ) -> VideoPipeline {
        let model = MockModel {
            responses: responses.into(),
        };
        let estimator = PoseEstimator::new(Box::new(model), test_config());
        VideoPipeline::new(estimator, TrackerConfig::default(), track, smooth)
    }

    #[test]
    fn test_single_frame_detects_one_person() {
        let mut pipeline = pipeline_with(vec![person_maps(0)], false, false);
        let poses = pipeline.process_frame(&gray_frame()).unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].valid_keypoints(), 5);
        // 未开启跟踪: 无身份
        assert!(poses[0].id.is_none());
        // 热图(8,6) -> 原图(64,48): scale=1, stride=8, 无补边
        let neck = poses[0].keypoints[1].as_ref().unwrap();
        assert!((neck.x() - 64.0).abs() <= 4.0);
        assert!((neck.y() - 48.0).abs() <= 4.0);
    }

    #[test]
    fn test_blank_maps_yield_empty_pose_list() {
        let blank = (
            Array3::<f32>::zeros((NUM_KEYPOINTS + 1, MAP, MAP)),
            Array3::<f32>::zeros((2 * NUM_LIMBS, MAP, MAP)),
        );
        let mut pipeline = pipeline_with(vec![blank], true, true);
        let poses = pipeline.process_frame(&gray_frame()).unwrap();
        assert!(poses.is_empty());
    }

    #[test]
    fn test_two_frames_keep_identity() {
        let mut pipeline = pipeline_with(vec![person_maps(0), person_maps(1)], true, false);
        let first = pipeline.process_frame(&gray_frame()).unwrap();
        let second = pipeline.process_frame(&gray_frame()).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, Some(0));
        assert_eq!(second[0].id, Some(0));
    }

    #[test]
    fn test_smoothing_reduces_jitter() {
        // 同样的两帧 (偏移1热图像素 = 8原图像素), 分别关/开平滑
        let mut raw = pipeline_with(vec![person_maps(0), person_maps(1)], true, false);
        let r1 = raw.process_frame(&gray_frame()).unwrap();
        let r2 = raw.process_frame(&gray_frame()).unwrap();
        let raw_delta = r2[0].keypoints[1]
            .as_ref()
            .unwrap()
            .distance(r1[0].keypoints[1].as_ref().unwrap());

        let mut smoothed = pipeline_with(vec![person_maps(0), person_maps(1)], true, true);
        let s1 = smoothed.process_frame(&gray_frame()).unwrap();
        let s2 = smoothed.process_frame(&gray_frame()).unwrap();
        let smooth_delta = s2[0].keypoints[1]
            .as_ref()
            .unwrap()
            .distance(s1[0].keypoints[1].as_ref().unwrap());

        assert!(raw_delta > 0.0);
        assert!(smooth_delta < raw_delta);
    }

    #[test]
    fn test_model_error_fails_frame() {
        let mut pipeline = pipeline_with(vec![], false, false);
        assert!(pipeline.process_frame(&gray_frame()).is_err());
    }
}
