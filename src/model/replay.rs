// 该文件是 Xunmen （寻门） 项目的一部分。
// src/model/replay.rs - 回放预先录制的模型输出
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

use std::{fs::File, io::BufReader, path::Path, sync::Mutex};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path, detection::RawDetection, model::Model, preprocess::Tensor,
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("回放数据已用尽，共 {0} 帧")]
  Exhausted(usize),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径解码失败: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
}

/// 逐帧回放 JSON 文件中记录的检测输出
///
/// 文件内容为三层数组：帧 → 行 → [cx, cy, w, h, conf, class_id]。
/// URL 查询参数 `loop=true` 时循环回放。
pub struct ReplayModel {
  frames: Vec<Vec<RawDetection>>,
  cursor: Mutex<usize>,
  looping: bool,
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch(url.scheme().to_string()));
    }

    let looping = url
      .query_pairs()
      .any(|(key, value)| key == "loop" && value == "true");
    let model = Self::from_path(decoded_path(url)?)?.with_looping(looping);
    Ok(model)
  }
}

impl ReplayModel {
  pub fn new(frames: Vec<Vec<RawDetection>>) -> Self {
    Self {
      frames,
      cursor: Mutex::new(0),
      looping: false,
    }
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ReplayModelError> {
    info!("加载回放数据: {}", path.as_ref().display());
    let reader = BufReader::new(File::open(path)?);
    let frames: Vec<Vec<RawDetection>> = serde_json::from_reader(reader)?;
    debug!("回放数据共 {} 帧", frames.len());
    Ok(Self::new(frames))
  }

  pub fn with_looping(mut self, looping: bool) -> Self {
    self.looping = looping;
    self
  }

  pub fn len(&self) -> usize {
    self.frames.len()
  }

  pub fn is_empty(&self) -> bool {
    self.frames.is_empty()
  }
}

impl Model for ReplayModel {
  type Input = Tensor;
  type Output = Vec<RawDetection>;
  type Error = ReplayModelError;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let mut cursor = self
      .cursor
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());

    if *cursor >= self.frames.len() {
      if !self.looping || self.frames.is_empty() {
        return Err(ReplayModelError::Exhausted(self.frames.len()));
      }
      *cursor = 0;
    }

    let rows = self.frames[*cursor].clone();
    *cursor += 1;
    Ok(rows)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn tensor() -> Tensor {
    crate::preprocess::preprocess(&image::DynamicImage::new_rgb8(1, 1), (1, 1)).unwrap()
  }

  #[test]
  fn replays_frames_in_order_then_exhausts() {
    let model = ReplayModel::new(vec![vec![vec![1.0; 6]], vec![]]);
    assert_eq!(model.infer(&tensor()).unwrap(), vec![vec![1.0; 6]]);
    assert!(model.infer(&tensor()).unwrap().is_empty());
    assert!(matches!(
      model.infer(&tensor()),
      Err(ReplayModelError::Exhausted(2))
    ));
  }

  #[test]
  fn looping_restarts_from_first_frame() {
    let model = ReplayModel::new(vec![vec![vec![2.0; 6]]]).with_looping(true);
    for _ in 0..3 {
      assert_eq!(model.infer(&tensor()).unwrap(), vec![vec![2.0; 6]]);
    }
  }

  #[test]
  fn loads_from_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[[[320, 320, 100, 100, 0.9, 0]], [[1, 2, 3]]]").unwrap();

    let url = Url::parse(&format!("replay://{}?loop=true", file.path().display())).unwrap();
    let model = ReplayModel::from_url(&url).unwrap();
    assert_eq!(model.len(), 2);
    assert_eq!(model.infer(&tensor()).unwrap()[0][4], 0.9);
    assert_eq!(model.infer(&tensor()).unwrap()[0].len(), 3);
    assert_eq!(model.infer(&tensor()).unwrap()[0][0], 320.0);
  }

  #[test]
  fn loads_from_url_with_encoded_path() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("门 数据");
    std::fs::create_dir(&dir).unwrap();
    let path = dir.join("rows.json");
    std::fs::write(&path, "[[], [[320, 320, 100, 100, 0.9, 0]]]").unwrap();

    let url = Url::parse(&format!("replay://{}", path.display())).unwrap();
    let model = ReplayModel::from_url(&url).unwrap();
    assert_eq!(model.len(), 2);
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("onnx:///tmp/model.onnx").unwrap();
    assert!(matches!(
      ReplayModel::from_url(&url),
      Err(ReplayModelError::SchemeMismatch(_))
    ));
  }
}
