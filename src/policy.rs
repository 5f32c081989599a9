// 该文件是 Xunmen （寻门） 项目的一部分。
// src/policy.rs - 导航指令决策
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

use std::fmt;

use crate::{config::PolicyConfig, detection::BoundingBox};

/// 导航指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
  GoLeft,
  GoRight,
  GoAhead,
  Stop,
  Searching,
}

impl Instruction {
  pub const ALL: [Instruction; 5] = [
    Instruction::GoLeft,
    Instruction::GoRight,
    Instruction::GoAhead,
    Instruction::Stop,
    Instruction::Searching,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Instruction::GoLeft => "Go Left",
      Instruction::GoRight => "Go Right",
      Instruction::GoAhead => "Go Ahead",
      Instruction::Stop => "Stop",
      Instruction::Searching => "Searching",
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 根据边界框的面积和水平位置给出指令
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionPolicy {
  config: PolicyConfig,
}

impl InstructionPolicy {
  pub fn new(config: PolicyConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PolicyConfig {
    &self.config
  }

  /// 按优先级判定：靠近 > 偏左 > 偏右 > 直行
  pub fn decide(&self, bbox: Option<&BoundingBox>) -> Instruction {
    let Some(bbox) = bbox else {
      return Instruction::Searching;
    };

    let frame_center_x = self.config.frame_width / 2.0;
    let box_center_x = bbox.center_x();

    if bbox.area() > self.config.proximity_area {
      Instruction::Stop
    } else if box_center_x < frame_center_x - self.config.lateral_deadband {
      Instruction::GoLeft
    } else if box_center_x > frame_center_x + self.config.lateral_deadband {
      Instruction::GoRight
    } else {
      Instruction::GoAhead
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn square(center_x: f32, size: f32) -> BoundingBox {
    BoundingBox::from_center(center_x, 320.0, size, size)
  }

  #[test]
  fn no_box_means_searching() {
    assert_eq!(InstructionPolicy::default().decide(None), Instruction::Searching);
  }

  #[test]
  fn centered_box_goes_ahead() {
    let bbox = BoundingBox {
      x: 270.0,
      y: 0.0,
      width: 100.0,
      height: 100.0,
    };
    assert_eq!(
      InstructionPolicy::default().decide(Some(&bbox)),
      Instruction::GoAhead
    );
  }

  #[test]
  fn lateral_offsets_turn() {
    let policy = InstructionPolicy::default();
    assert_eq!(policy.decide(Some(&square(200.0, 100.0))), Instruction::GoLeft);
    assert_eq!(policy.decide(Some(&square(450.0, 100.0))), Instruction::GoRight);
  }

  #[test]
  fn deadband_edges_go_ahead() {
    let policy = InstructionPolicy::default();
    assert_eq!(policy.decide(Some(&square(270.0, 10.0))), Instruction::GoAhead);
    assert_eq!(policy.decide(Some(&square(370.0, 10.0))), Instruction::GoAhead);
  }

  #[test]
  fn proximity_overrides_lateral_position() {
    let policy = InstructionPolicy::default();
    for center in [0.0, 100.0, 320.0, 600.0] {
      let bbox = square(center, 400.0);
      assert!(bbox.area() > 150_000.0);
      assert_eq!(policy.decide(Some(&bbox)), Instruction::Stop);
    }
  }

  #[test]
  fn area_threshold_is_exclusive() {
    let bbox = BoundingBox {
      x: 0.0,
      y: 0.0,
      width: 500.0,
      height: 300.0,
    };
    assert_ne!(
      InstructionPolicy::default().decide(Some(&bbox)),
      Instruction::Stop
    );
  }

  #[test]
  fn overridden_thresholds_apply() {
    let policy = InstructionPolicy::new(PolicyConfig {
      frame_width: 200.0,
      proximity_area: 1_000.0,
      lateral_deadband: 10.0,
    });
    assert_eq!(policy.decide(Some(&square(85.0, 10.0))), Instruction::GoLeft);
    assert_eq!(policy.decide(Some(&square(100.0, 10.0))), Instruction::GoAhead);
    assert_eq!(policy.decide(Some(&square(100.0, 40.0))), Instruction::Stop);
  }
}
