// 该文件是 Xunmen （寻门） 项目的一部分。
// src/detection.rs - 模型输出解析
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

use tracing::{debug, trace};

use crate::config::{ParserConfig, RAW_DETECTION_FIELDS};

/// 模型输出的一行: [cx, cy, w, h, confidence, class_id]，坐标位于模型输入空间
pub type RawDetection = Vec<f32>;

/// 边界框，左上角为原点
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
  /// 左上角 x 坐标
  pub x: f32,
  /// 左上角 y 坐标
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  /// 由中心点形式构造
  pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
    Self {
      x: cx - width / 2.0,
      y: cy - height / 2.0,
      width,
      height,
    }
  }

  pub fn area(&self) -> f32 {
    self.width * self.height
  }

  pub fn center_x(&self) -> f32 {
    self.x + self.width / 2.0
  }
}

/// 检测结果解析器
///
/// 按给定顺序扫描，返回第一个置信度高于阈值且类别匹配的行。
/// 不做排序，也不做非极大值抑制。
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionParser {
  config: ParserConfig,
}

impl DetectionParser {
  pub fn new(config: ParserConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  pub fn parse<R: AsRef<[f32]>>(&self, rows: &[R]) -> Option<BoundingBox> {
    for (index, row) in rows.iter().enumerate() {
      let row = row.as_ref();
      if row.len() < RAW_DETECTION_FIELDS {
        debug!("第 {} 行字段不足: {} < {}", index, row.len(), RAW_DETECTION_FIELDS);
        continue;
      }

      let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
      let confidence = row[4];
      let class_id = row[5] as i32;

      if !(confidence > self.config.confidence_threshold
        && class_id == self.config.target_class_id)
      {
        continue;
      }

      if !([cx, cy, w, h].iter().all(|v| v.is_finite()) && w >= 0.0 && h >= 0.0) {
        debug!("第 {} 行坐标无效: ({}, {}, {}x{})", index, cx, cy, w, h);
        continue;
      }

      trace!(
        "选中第 {} 行: ({:.1}, {:.1}, {:.1}x{:.1}) 置信度 {:.2}",
        index, cx, cy, w, h, confidence
      );
      return Some(BoundingBox::from_center(cx, cy, w, h));
    }

    None
  }
}

/// 使用默认阈值和类别解析
pub fn parse<R: AsRef<[f32]>>(rows: &[R]) -> Option<BoundingBox> {
  DetectionParser::default().parse(rows)
}
