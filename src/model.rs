// 该文件是 Xunmen （寻门） 项目的一部分。
// src/model.rs - 推理模型
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, detection::RawDetection, preprocess::Tensor};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 门检测模型：输入 NCHW 张量，输出原始检测行
pub trait DoorModel: Model<Input = Tensor, Output = Vec<RawDetection>> {}

impl<M: Model<Input = Tensor, Output = Vec<RawDetection>>> DoorModel for M {}

/// 将闭包包装为模型
pub struct InferFn<F>(pub F);

impl<F, E> Model for InferFn<F>
where
  F: Fn(&Tensor) -> Result<Vec<RawDetection>, E>,
{
  type Input = Tensor;
  type Output = Vec<RawDetection>;
  type Error = E;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (self.0)(input)
  }
}

mod replay;
pub use self::replay::{ReplayModel, ReplayModelError};

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxModel, OnnxModelError};

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("回放模型错误: {0}")]
  ReplayModelError(#[from] ReplayModelError),
  #[cfg(feature = "onnx")]
  #[error("ONNX 模型错误: {0}")]
  OnnxModelError(#[from] OnnxModelError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按 URL 方案选择的模型
pub enum ModelWrapper {
  Replay(ReplayModel),
  #[cfg(feature = "onnx")]
  Onnx(OnnxModel),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      ReplayModel::SCHEME => Ok(ModelWrapper::Replay(ReplayModel::from_url(url)?)),
      #[cfg(feature = "onnx")]
      OnnxModel::SCHEME => Ok(ModelWrapper::Onnx(OnnxModel::from_url(url)?)),
      scheme => Err(ModelError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl Model for ModelWrapper {
  type Input = Tensor;
  type Output = Vec<RawDetection>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      ModelWrapper::Replay(model) => model.infer(input).map_err(ModelError::from),
      #[cfg(feature = "onnx")]
      ModelWrapper::Onnx(model) => model.infer(input).map_err(ModelError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn closures_act_as_models() {
    let model = InferFn(|tensor: &Tensor| -> Result<Vec<RawDetection>, String> {
      Ok(vec![vec![tensor.width() as f32; 6]])
    });
    let tensor = crate::preprocess::preprocess(&image::DynamicImage::new_rgb8(2, 2), (8, 4)).unwrap();
    assert_eq!(model.infer(&tensor).unwrap(), vec![vec![8.0; 6]]);
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("tflite:///tmp/model.tflite").unwrap();
    assert!(matches!(
      ModelWrapper::from_url(&url),
      Err(ModelError::SchemeMismatch(s)) if s == "tflite"
    ));
  }
}
