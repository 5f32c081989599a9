// 该文件是 Xunmen （寻门） 项目的一部分。
// src/config.rs - 流水线参数配置
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

/// 模型输入宽度
pub const DEFAULT_INPUT_WIDTH: u32 = 640;
/// 模型输入高度
pub const DEFAULT_INPUT_HEIGHT: u32 = 640;
/// 置信度阈值（严格大于）
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
/// 门的类别 ID
pub const DEFAULT_DOOR_CLASS_ID: i32 = 0;
/// 判定“已到门前”的边界框面积阈值（像素²）
pub const DEFAULT_PROXIMITY_AREA: f32 = 150_000.0;
/// 画面中心左右的死区宽度（像素）
pub const DEFAULT_LATERAL_DEADBAND: f32 = 50.0;
/// 模型唯一输入张量的名称
pub const MODEL_INPUT_NAME: &str = "images";
/// 一行原始检测结果的最少字段数: [cx, cy, w, h, conf, class_id]
pub const RAW_DETECTION_FIELDS: usize = 6;

/// 检测结果解析参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserConfig {
  pub confidence_threshold: f32,
  pub target_class_id: i32,
}

impl Default for ParserConfig {
  fn default() -> Self {
    Self {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      target_class_id: DEFAULT_DOOR_CLASS_ID,
    }
  }
}

/// 导航指令决策参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfig {
  /// 画面宽度，画面中心取其一半
  pub frame_width: f32,
  pub proximity_area: f32,
  pub lateral_deadband: f32,
}

impl Default for PolicyConfig {
  fn default() -> Self {
    Self {
      frame_width: DEFAULT_INPUT_WIDTH as f32,
      proximity_area: DEFAULT_PROXIMITY_AREA,
      lateral_deadband: DEFAULT_LATERAL_DEADBAND,
    }
  }
}

/// 整条流水线的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  /// 模型输入尺寸 (W, H)
  pub input_size: (u32, u32),
  pub parser: ParserConfig,
  pub policy: PolicyConfig,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      input_size: (DEFAULT_INPUT_WIDTH, DEFAULT_INPUT_HEIGHT),
      parser: ParserConfig::default(),
      policy: PolicyConfig::default(),
    }
  }
}

impl PipelineConfig {
  /// 设置模型输入尺寸，决策用的画面宽度随之更新
  pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
    self.input_size = (width, height);
    self.policy.frame_width = width as f32;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.parser.confidence_threshold = threshold;
    self
  }

  pub fn with_target_class_id(mut self, class_id: i32) -> Self {
    self.parser.target_class_id = class_id;
    self
  }

  pub fn with_proximity_area(mut self, area: f32) -> Self {
    self.policy.proximity_area = area;
    self
  }

  pub fn with_lateral_deadband(mut self, deadband: f32) -> Self {
    self.policy.lateral_deadband = deadband;
    self
  }
}
