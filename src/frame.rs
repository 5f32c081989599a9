// 该文件是 Xunmen （寻门） 项目的一部分。
// src/frame.rs - 相机帧与帧生命周期
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

use std::ops::Deref;

use image::DynamicImage;
use tracing::trace;

/// 相机子系统交付的一帧图像
///
/// 帧在一次流水线调用期间只读借用，处理结束后必须恰好关闭一次。
pub trait CameraFrame {
  fn image(&self) -> &DynamicImage;

  /// 释放帧占用的资源
  fn close(&mut self);

  fn width(&self) -> u32 {
    self.image().width()
  }

  fn height(&self) -> u32 {
    self.image().height()
  }
}

/// 持有图像数据的帧
#[derive(Debug, Clone)]
pub struct OwnedFrame {
  image: DynamicImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

impl OwnedFrame {
  pub fn new(image: DynamicImage, index: u64, timestamp_ms: u64) -> Self {
    Self {
      image,
      index,
      timestamp_ms,
    }
  }
}

impl From<DynamicImage> for OwnedFrame {
  fn from(image: DynamicImage) -> Self {
    Self::new(image, 0, 0)
  }
}

impl CameraFrame for OwnedFrame {
  fn image(&self) -> &DynamicImage {
    &self.image
  }

  fn close(&mut self) {
    trace!("释放第 {} 帧", self.index);
  }
}

/// 帧的作用域守卫，离开作用域时关闭帧
///
/// 无论流水线从哪条路径返回，帧都只会被关闭一次。
pub struct FrameGuard<F: CameraFrame> {
  frame: F,
  closed: bool,
}

impl<F: CameraFrame> FrameGuard<F> {
  pub fn new(frame: F) -> Self {
    Self {
      frame,
      closed: false,
    }
  }

  /// 提前关闭帧，之后的 drop 不再重复关闭
  pub fn close(&mut self) {
    if !self.closed {
      self.closed = true;
      self.frame.close();
    }
  }
}

impl<F: CameraFrame> Deref for FrameGuard<F> {
  type Target = F;

  fn deref(&self) -> &Self::Target {
    &self.frame
  }
}

impl<F: CameraFrame> Drop for FrameGuard<F> {
  fn drop(&mut self) {
    self.close();
  }
}
