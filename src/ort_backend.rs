//! ONNX Runtime 推理后端
//! Thin wrapper around an ort session: tensor in, named output arrays out

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// ort 会话封装
///
/// 输入/输出名在加载时从模型元数据取得,
/// 调用方按输出顺序取用 (多阶段网络取最后的精化阶段)。
pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
}

impl OrtBackend {
    /// 加载 ONNX 模型并构建会话
    pub fn build<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::<()>::from)?
            .commit_from_file(model_path.as_ref())
            .with_context(|| {
                format!("Failed to load ONNX model: {}", model_path.as_ref().display())
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .context("Model has no inputs")?;
        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        if output_names.is_empty() {
            anyhow::bail!("Model has no outputs");
        }

        Ok(Self {
            session,
            input_name,
            output_names,
        })
    }

    /// 运行推理, 按模型声明顺序返回全部输出
    pub fn run(&mut self, xs: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        let input_tensor = Tensor::from_array(xs)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        let mut ys = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let array: ndarray::ArrayViewD<f32> = outputs[name.as_str()]
                .try_extract_array()
                .with_context(|| format!("Failed to extract output tensor: {}", name))?;
            ys.push(array.to_owned());
        }
        Ok(ys)
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
