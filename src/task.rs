// 该文件是 Xunmen （寻门） 项目的一部分。
// src/task.rs - 帧循环任务
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
  collections::HashMap,
  fmt::Display,
  sync::{
    Arc,
    mpsc::{Receiver, Sender},
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
  frame::CameraFrame,
  model::DoorModel,
  pipeline::{FrameOutcome, FramePipeline},
  playback::{AudioSink, Emission, PlaybackGate},
  policy::Instruction,
};

const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

pub trait Task<I, M, P>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, pipeline: &P) -> Result<TaskReport, Self::Error>;
}

/// 任务统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskReport {
  pub frames: usize,
  pub skipped: usize,
  pub invalid: usize,
  pub played: usize,
  pub instructions: HashMap<Instruction, usize>,
}

impl TaskReport {
  fn record(&mut self, outcome: FrameOutcome) {
    self.frames += 1;
    match outcome {
      FrameOutcome::Inactive => self.skipped += 1,
      FrameOutcome::InvalidFrame => self.invalid += 1,
      FrameOutcome::Instructed {
        instruction,
        emission,
      } => {
        *self.instructions.entry(instruction).or_default() += 1;
        if matches!(emission, Emission::Played(_)) {
          self.played += 1;
        }
      }
    }
  }
}

pub struct OneShotTask;

impl<F, M, S, I> Task<I, M, FramePipeline<S>> for OneShotTask
where
  F: CameraFrame,
  I: Iterator<Item = F>,
  M: DoorModel,
  M::Error: Display,
  S: AudioSink,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    mut input: I,
    model: M,
    pipeline: &FramePipeline<S>,
  ) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    let now = Instant::now();
    let outcome = pipeline.on_frame(frame, &model);
    info!("处理完成，耗时: {:.2?}, 结果: {:?}", now.elapsed(), outcome);

    let mut report = TaskReport::default();
    report.record(outcome);
    Ok(report)
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  frame_interval: Option<Duration>,
  stop_signal: Option<Receiver<()>>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_stop_signal(mut self, stop_signal: Receiver<()>) -> Self {
    self.stop_signal = Some(stop_signal);
    self
  }

  /// 相邻两帧之间的最小间隔，模拟摄像头帧率
  pub fn with_frame_interval(mut self, frame_interval: Option<Duration>) -> Self {
    self.frame_interval = frame_interval;
    self
  }

  fn should_stop(&self) -> bool {
    // 发送端全部断开不视为停止
    self
      .stop_signal
      .as_ref()
      .map(|rx| rx.try_recv().is_ok())
      .unwrap_or(false)
  }
}

/// 安装 Ctrl-C 处理：关闭会话并通知任务循环退出，超时未退出则强制退出
pub fn install_ctrlc_handler<S>(gate: Arc<PlaybackGate<S>>, stop: Sender<()>) -> anyhow::Result<()>
where
  S: AudioSink + Send + Sync + 'static,
{
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    gate.set_active(false);
    let _ = stop.send(());
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_AFTER);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;
  Ok(())
}

impl<F, M, S, I> Task<I, M, FramePipeline<S>> for ContinuousTask
where
  F: CameraFrame,
  I: Iterator<Item = F>,
  M: DoorModel,
  M::Error: Display,
  S: AudioSink,
{
  type Error = anyhow::Error;

  fn run_task(
    self,
    input: I,
    model: M,
    pipeline: &FramePipeline<S>,
  ) -> Result<TaskReport, Self::Error> {
    info!("开始任务...");
    let mut report = TaskReport::default();

    for frame in input {
      let now = Instant::now();
      let outcome = pipeline.on_frame(frame, &model);
      report.record(outcome);
      info!(
        "第 {} 帧处理完成，耗时: {:.2?}, 结果: {:?}",
        report.frames,
        now.elapsed(),
        outcome
      );

      if self.frame_number.map(|n| report.frames >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", report.frames);
        break;
      }
      if self.should_stop() {
        warn!("收到停止信号，退出任务循环");
        break;
      }
      if let Some(interval) = self.frame_interval {
        thread::sleep(interval.saturating_sub(now.elapsed()));
      }
    }

    info!(
      "任务完成: 共 {} 帧, 跳过 {} 帧, 无效 {} 帧, 播放 {} 次",
      report.frames, report.skipped, report.invalid, report.played
    );
    Ok(report)
  }
}
