// 该文件是 Xunmen （寻门） 项目的一部分。
// src/pipeline.rs - 帧到指令的处理流水线
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

use std::{fmt::Display, sync::Arc};

use tracing::{debug, error, trace, warn};

use crate::{
  config::PipelineConfig,
  detection::DetectionParser,
  frame::{CameraFrame, FrameGuard},
  model::DoorModel,
  playback::{AudioSink, Emission, PlaybackGate},
  policy::{Instruction, InstructionPolicy},
  preprocess::TensorPreprocessor,
};

/// 单帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
  /// 会话未激活，未做任何处理
  Inactive,
  /// 帧无效，已跳过
  InvalidFrame,
  Instructed {
    instruction: Instruction,
    emission: Emission,
  },
}

impl FrameOutcome {
  pub fn instruction(&self) -> Option<Instruction> {
    match self {
      FrameOutcome::Instructed { instruction, .. } => Some(*instruction),
      _ => None,
    }
  }
}

/// 帧处理流水线
///
/// 预处理 → 推理 → 解析 → 决策 → 播放。帧之间不保留任何状态。
pub struct FramePipeline<S: AudioSink> {
  preprocessor: TensorPreprocessor,
  parser: DetectionParser,
  policy: InstructionPolicy,
  gate: Arc<PlaybackGate<S>>,
}

impl<S: AudioSink> FramePipeline<S> {
  pub fn new(config: PipelineConfig, gate: Arc<PlaybackGate<S>>) -> Self {
    let (width, height) = config.input_size;
    Self {
      preprocessor: TensorPreprocessor::new(width, height),
      parser: DetectionParser::new(config.parser),
      policy: InstructionPolicy::new(config.policy),
      gate,
    }
  }

  pub fn gate(&self) -> &Arc<PlaybackGate<S>> {
    &self.gate
  }

  pub fn on_frame<F, M>(&self, frame: F, model: &M) -> FrameOutcome
  where
    F: CameraFrame,
    M: DoorModel,
    M::Error: Display,
  {
    let frame = FrameGuard::new(frame);

    if !self.gate.is_active() {
      trace!("会话未激活，跳过该帧");
      return FrameOutcome::Inactive;
    }

    let tensor = match self.preprocessor.preprocess(frame.image()) {
      Ok(tensor) => tensor,
      Err(e) => {
        warn!("跳过无效帧: {}", e);
        return FrameOutcome::InvalidFrame;
      }
    };

    let bbox = match model.infer(&tensor) {
      Ok(rows) => {
        debug!("模型输出 {} 行", rows.len());
        self.parser.parse(&rows)
      }
      Err(e) => {
        error!("推理失败，按未检测到处理: {}", e);
        None
      }
    };

    let instruction = self.policy.decide(bbox.as_ref());
    debug!("边界框 {:?} -> 指令 {}", bbox, instruction);
    let emission = self.gate.emit(instruction);

    FrameOutcome::Instructed {
      instruction,
      emission,
    }
  }
}
