// 该文件是 Xunmen （寻门） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理后端
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Xunmen Contributors

use std::{path::Path, sync::Mutex};

use ort::{
  inputs,
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor as OrtTensor,
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, config::MODEL_INPUT_NAME, decoded_path, detection::RawDetection, model::Model,
  preprocess::Tensor,
};

const ONNX_INTRA_THREADS: usize = 4;

#[derive(Error, Debug)]
pub enum OnnxModelError {
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出形状不符合预期: {0:?}")]
  UnexpectedShape(Vec<i64>),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径解码失败: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
}

/// ONNX 门检测模型
///
/// 输入名为 `images` 的 [1, 3, H, W] 张量，输出形状为 [1, N, C] 或 [N, C]，
/// 每行前 6 列为 [cx, cy, w, h, conf, class_id]。
pub struct OnnxModel {
  session: Mutex<Session>,
}

impl FromUrlWithScheme for OnnxModel {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxModel {
  type Error = OnnxModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxModelError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::load(decoded_path(url)?)
  }
}

impl OnnxModel {
  pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, OnnxModelError> {
    info!("加载模型文件: {}", model_path.as_ref().display());
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(ONNX_INTRA_THREADS)?
      .commit_from_file(model_path)?;
    info!("模型加载完成");

    Ok(Self {
      session: Mutex::new(session),
    })
  }
}

impl Model for OnnxModel {
  type Input = Tensor;
  type Output = Vec<RawDetection>;
  type Error = OnnxModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let (shape, data) = input.clone().into_raw();
    let input_tensor = OrtTensor::from_array((shape.to_vec(), data))?;

    let mut session = self
      .session
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    debug!("执行模型推理");
    let outputs = session.run(inputs![MODEL_INPUT_NAME => input_tensor])?;

    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    let dims: Vec<i64> = shape.iter().copied().collect();
    let row_len = match dims.as_slice() {
      [1, _, c] | [_, c] if *c > 0 => *c as usize,
      _ => return Err(OnnxModelError::UnexpectedShape(dims)),
    };

    let rows: Vec<RawDetection> = data.chunks(row_len).map(|row| row.to_vec()).collect();
    debug!("模型输出 {} 行", rows.len());
    Ok(rows)
  }
}
