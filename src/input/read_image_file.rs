// 该文件是 Xunmen （寻门） 项目的一部分。
// src/input/read_image_file.rs - 图像文件与图像目录输入
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

use std::{
  path::{Path, PathBuf},
  time::Instant,
};

use image::ImageReader;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoded_path, frame::OwnedFrame, input::InputError};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 单张图像输入，只产生一帧
pub struct ImageFileInput {
  frame: Option<OwnedFrame>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemaMismatch(url.scheme().to_string()));
    }

    let image = ImageReader::open(decoded_path(url)?)?.decode()?;
    Ok(ImageFileInput {
      frame: Some(OwnedFrame::new(image, 0, 0)),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = OwnedFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}

/// 目录输入，按文件名顺序逐帧读取
///
/// 无法解码的文件会被跳过。
pub struct DirectoryInput {
  paths: std::vec::IntoIter<PathBuf>,
  index: u64,
  started: Instant,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "dir";
}

impl FromUrl for DirectoryInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemaMismatch(url.scheme().to_string()));
    }

    Self::open(decoded_path(url)?)
  }
}

fn is_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

impl DirectoryInput {
  pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, InputError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
      let path = entry?.path();
      if path.is_file() && is_image(&path) {
        paths.push(path);
      }
    }
    paths.sort();
    info!("目录 {} 中共 {} 张图像", dir.as_ref().display(), paths.len());

    Ok(Self {
      paths: paths.into_iter(),
      index: 0,
      started: Instant::now(),
    })
  }
}

impl Iterator for DirectoryInput {
  type Item = OwnedFrame;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.paths.by_ref() {
      let image = match ImageReader::open(&path).map(|reader| reader.decode()) {
        Ok(Ok(image)) => image,
        Ok(Err(e)) => {
          error!("无法解码图像 {}: {}", path.display(), e);
          continue;
        }
        Err(e) => {
          error!("无法打开图像 {}: {}", path.display(), e);
          continue;
        }
      };

      let index = self.index;
      self.index += 1;
      debug!("读取第 {} 帧: {}", index, path.display());
      let timestamp_ms = self.started.elapsed().as_millis() as u64;
      return Some(OwnedFrame::new(image, index, timestamp_ms));
    }
    None
  }
}
