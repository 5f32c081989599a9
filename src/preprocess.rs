// 该文件是 Xunmen （寻门） 项目的一部分。
// src/preprocess.rs - 图像预处理，生成 NCHW 输入张量
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

use image::{DynamicImage, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("帧无效: {width}x{height}")]
  InvalidFrame { width: u32, height: u32 },
  #[error("目标尺寸无效: {width}x{height}")]
  InvalidTargetSize { width: u32, height: u32 },
}

/// 模型输入张量，形状为 [1, 3, H, W]，R/G/B 三个平面依次排列
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
  shape: [usize; 4],
  data: Vec<f32>,
}

impl Tensor {
  pub fn shape(&self) -> [usize; 4] {
    self.shape
  }

  pub fn width(&self) -> usize {
    self.shape[3]
  }

  pub fn height(&self) -> usize {
    self.shape[2]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 取出第 c 个通道平面，通道越界时返回 `None`
  pub fn plane(&self, channel: usize) -> Option<&[f32]> {
    if channel >= self.shape[1] {
      return None;
    }
    let size = self.width() * self.height();
    self.data.get(channel * size..(channel + 1) * size)
  }

  pub fn into_raw(self) -> ([usize; 4], Vec<f32>) {
    (self.shape, self.data)
  }
}

/// 图像预处理器
#[derive(Debug, Clone, Copy)]
pub struct TensorPreprocessor {
  width: u32,
  height: u32,
}

impl TensorPreprocessor {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  pub fn target_size(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  pub fn preprocess(&self, image: &DynamicImage) -> Result<Tensor, PreprocessError> {
    preprocess(image, (self.width, self.height))
  }
}

/// 将图像拉伸到目标尺寸并转换为归一化的平面张量
///
/// 不保持宽高比；双线性插值；像素值除以 255 落在 [0, 1]。
pub fn preprocess(image: &DynamicImage, target: (u32, u32)) -> Result<Tensor, PreprocessError> {
  let (width, height) = (image.width(), image.height());
  if width == 0 || height == 0 {
    return Err(PreprocessError::InvalidFrame { width, height });
  }
  let (target_w, target_h) = target;
  if target_w == 0 || target_h == 0 {
    return Err(PreprocessError::InvalidTargetSize {
      width: target_w,
      height: target_h,
    });
  }

  let rgb = image.to_rgb8();
  let resized = if (width, height) == target {
    rgb
  } else {
    debug!("缩放帧 {}x{} -> {}x{}", width, height, target_w, target_h);
    image::imageops::resize(&rgb, target_w, target_h, FilterType::Triangle)
  };

  Ok(to_planar(&resized))
}

fn to_planar(image: &RgbImage) -> Tensor {
  let (width, height) = (image.width() as usize, image.height() as usize);
  let plane = width * height;
  let mut data = vec![0.0f32; RGB_CHANNELS * plane];

  for (index, pixel) in image.pixels().enumerate() {
    for c in 0..RGB_CHANNELS {
      data[c * plane + index] = pixel[c] as f32 / 255.0;
    }
  }

  Tensor {
    shape: [1, RGB_CHANNELS, height, width],
    data,
  }
}

#[cfg(test)]
mod tests {
  use image::{Rgb, Rgba, RgbaImage};

  use super::*;

  #[test]
  fn uniform_gray_normalizes_every_plane() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 80, Rgb([128, 128, 128])));
    let tensor = preprocess(&image, (640, 640)).unwrap();

    assert_eq!(tensor.shape(), [1, 3, 640, 640]);
    assert_eq!(tensor.as_slice().len(), 3 * 640 * 640);
    let expected = 128.0f32 / 255.0;
    for &value in tensor.as_slice() {
      assert!((value - expected).abs() <= 1.0 / 255.0, "value {value}");
    }
  }

  #[test]
  fn layout_is_planar_not_interleaved() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 51]));
    image.put_pixel(1, 0, Rgb([0, 102, 255]));
    let tensor = preprocess(&DynamicImage::ImageRgb8(image), (2, 1)).unwrap();

    assert_eq!(tensor.plane(0), Some(&[1.0, 0.0][..]));
    assert_eq!(tensor.plane(1), Some(&[0.0, 0.4][..]));
    assert_eq!(tensor.plane(2), Some(&[0.2, 1.0][..]));
    assert_eq!(tensor.plane(3), None);
  }

  #[test]
  fn rows_are_scanned_in_row_major_order() {
    let mut image = RgbImage::new(2, 2);
    image.put_pixel(1, 0, Rgb([255, 0, 0]));
    image.put_pixel(0, 1, Rgb([0, 0, 255]));
    let tensor = preprocess(&DynamicImage::ImageRgb8(image), (2, 2)).unwrap();

    assert_eq!(tensor.plane(0), Some(&[0.0, 1.0, 0.0, 0.0][..]));
    assert_eq!(tensor.plane(2), Some(&[0.0, 0.0, 1.0, 0.0][..]));
  }

  #[test]
  fn alpha_channel_is_ignored() {
    let image = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 0]));
    let tensor = preprocess(&DynamicImage::ImageRgba8(image), (3, 3)).unwrap();
    assert!(tensor.as_slice().iter().all(|&v| v == 1.0));
  }

  #[test]
  fn stretches_without_keeping_aspect_ratio() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1280, 10, Rgb([10, 20, 30])));
    let tensor = TensorPreprocessor::new(64, 48).preprocess(&image).unwrap();
    assert_eq!(tensor.shape(), [1, 3, 48, 64]);
  }

  #[test]
  fn zero_area_frame_is_rejected() {
    let image = DynamicImage::new_rgb8(0, 480);
    assert_eq!(
      preprocess(&image, (640, 640)),
      Err(PreprocessError::InvalidFrame {
        width: 0,
        height: 480
      })
    );
  }

  #[test]
  fn zero_target_is_rejected() {
    let image = DynamicImage::new_rgb8(4, 4);
    assert!(matches!(
      preprocess(&image, (0, 640)),
      Err(PreprocessError::InvalidTargetSize { .. })
    ));
  }
}
