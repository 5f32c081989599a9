// 该文件是 Xunmen （寻门） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use xunmen::config::{
  DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DOOR_CLASS_ID, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH,
  DEFAULT_LATERAL_DEADBAND, DEFAULT_PROXIMITY_AREA, PipelineConfig,
};

/// Xunmen 寻门辅助参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源
  /// - 回放: replay:///path/to/rows.json[?loop=true]
  /// - ONNX: onnx:///path/to/model.onnx （需启用 onnx 特性）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// - 图片: image:///path/to/frame.jpg
  /// - 目录: dir:///path/to/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 语音输出
  /// - 日志: log://
  /// - 外部播放器: command:///usr/bin/aplay?clips=/path/to/clips&ext=wav
  #[arg(long, value_name = "AUDIO", default_value = "log://")]
  pub audio: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 门的类别编号
  #[arg(long, default_value_t = DEFAULT_DOOR_CLASS_ID, value_name = "CLASS_ID")]
  pub class_id: i32,

  /// 模型输入宽度
  #[arg(long, default_value_t = DEFAULT_INPUT_WIDTH, value_name = "WIDTH")]
  pub width: u32,

  /// 模型输入高度
  #[arg(long, default_value_t = DEFAULT_INPUT_HEIGHT, value_name = "HEIGHT")]
  pub height: u32,

  /// 判定“已到门前”的面积阈值
  #[arg(long, default_value_t = DEFAULT_PROXIMITY_AREA, value_name = "AREA")]
  pub proximity_area: f32,

  /// 水平居中的容差
  #[arg(long, default_value_t = DEFAULT_LATERAL_DEADBAND, value_name = "PIXELS")]
  pub deadband: f32,

  /// 最大处理帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,

  /// 帧间隔（毫秒）
  #[arg(long, value_name = "MILLIS")]
  pub frame_interval: Option<u64>,

  /// 启动时不开启辅助，等待标准输入的 start/toggle
  #[arg(long)]
  pub start_inactive: bool,
}

impl Args {
  pub fn pipeline_config(&self) -> PipelineConfig {
    PipelineConfig::default()
      .with_input_size(self.width, self.height)
      .with_confidence_threshold(self.confidence)
      .with_target_class_id(self.class_id)
      .with_proximity_area(self.proximity_area)
      .with_lateral_deadband(self.deadband)
  }
}
