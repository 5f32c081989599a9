// 该文件是 Xunmen （寻门） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::{
  io::BufRead,
  sync::{Arc, mpsc},
  thread,
  time::Duration,
};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use xunmen::{
  FromUrl,
  audio::AudioWrapper,
  input::InputWrapper,
  model::ModelWrapper,
  pipeline::FramePipeline,
  playback::{AudioSink, PlaybackGate},
  task::{ContinuousTask, Task, install_ctrlc_handler},
};

/// 切换按钮上显示的文字
fn toggle_label(active: bool) -> &'static str {
  if active {
    "Stop Assistance"
  } else {
    "Start Assistance"
  }
}

/// 从标准输入读取控制命令
fn spawn_control<S>(gate: Arc<PlaybackGate<S>>, stop: mpsc::Sender<()>)
where
  S: AudioSink + Send + Sync + 'static,
{
  thread::spawn(move || {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
      let line = match line {
        Ok(line) => line,
        Err(e) => {
          warn!("读取标准输入失败: {}", e);
          break;
        }
      };
      match line.trim() {
        "" => continue,
        "toggle" => {
          gate.toggle();
        }
        "start" => gate.set_active(true),
        "stop" => gate.set_active(false),
        "quit" | "exit" => {
          gate.set_active(false);
          let _ = stop.send(());
          break;
        }
        other => {
          warn!("未知命令: {}（可用: toggle, start, stop, quit）", other);
          continue;
        }
      }
      info!("辅助状态已切换，按钮: {}", toggle_label(gate.is_active()));
    }
  });
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("语音输出: {}", args.audio);

  let config = args.pipeline_config();
  info!("流水线配置: {:?}", config);

  let model = ModelWrapper::from_url(&args.model)?;
  let input = InputWrapper::from_url(&args.input)?;
  let audio = AudioWrapper::from_url(&args.audio)?;

  let gate = Arc::new(PlaybackGate::new(audio));
  gate.set_active(!args.start_inactive);
  info!("按钮: {}", toggle_label(gate.is_active()));

  let (stop_tx, stop_rx) = mpsc::channel();
  install_ctrlc_handler(gate.clone(), stop_tx.clone())?;
  spawn_control(gate.clone(), stop_tx);

  let pipeline = FramePipeline::new(config, gate.clone());
  let report = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_frame_interval(args.frame_interval.map(Duration::from_millis))
    .with_stop_signal(stop_rx)
    .run_task(input, model, &pipeline)?;

  gate.set_active(false);
  info!("指令统计: {:?}", report.instructions);

  Ok(())
}
