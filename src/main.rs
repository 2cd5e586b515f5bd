use anyhow::Result;
use clap::Parser;

use lightpose_rs::config::{Args, DecoderConfig, TrackerConfig};
use lightpose_rs::input::ImageReader;
use lightpose_rs::pipeline::{PoseEstimator, VideoPipeline};
use lightpose_rs::{gen_time_string, OpenPose, PoseModel, PoseRecord};

fn main() -> Result<()> {
    let args = Args::parse();

    if args.images.is_empty() {
        anyhow::bail!("--images has to be provided");
    }

    let model = OpenPose::new(&args.model)?;
    model.summary();
    println!("✅ 姿态模型加载成功");

    let decoder_config = DecoderConfig {
        input_height: args.height_size,
        ..DecoderConfig::default()
    };
    let estimator =
        PoseEstimator::new(Box::new(model), decoder_config).with_profile(args.profile);
    let mut pipeline = VideoPipeline::new(
        estimator,
        TrackerConfig::default(),
        args.track,
        args.smooth,
    );

    let mut source = ImageReader::new(args.images.iter().cloned());
    println!("🎞  输入帧数: {}", source.len());

    let mut all_frames: Vec<Vec<PoseRecord>> = Vec::new();
    let json = args.json;
    let frames = pipeline.run(&mut source, |frame_idx, poses| {
        let records: Vec<PoseRecord> = poses.iter().map(PoseRecord::from).collect();
        if json {
            match serde_json::to_string(&records) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("❌ 序列化失败: {}", e),
            }
        } else {
            println!("帧 {}: 检测到 {} 人", frame_idx, poses.len());
            for pose in poses {
                match pose.id {
                    Some(id) => println!(
                        "  id {} | 关键点 {} | 置信度 {:.2}",
                        id,
                        pose.valid_keypoints(),
                        pose.confidence
                    ),
                    None => println!(
                        "  关键点 {} | 置信度 {:.2}",
                        pose.valid_keypoints(),
                        pose.confidence
                    ),
                }
            }
        }
        all_frames.push(records);
    })?;

    if args.save_results {
        let path = format!("poses_{}.json", gen_time_string("_"));
        std::fs::write(&path, serde_json::to_string_pretty(&all_frames)?)?;
        println!("💾 结果已保存: {}", path);
    }

    println!("✅ 处理完成, 共 {} 帧", frames);
    Ok(())
}
