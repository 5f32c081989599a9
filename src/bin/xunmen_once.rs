// 该文件是 Xunmen （寻门） 项目的一部分。
// src/bin/xunmen_once.rs - 单张图像的指令推理
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

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use url::Url;

use tracing::info;
use xunmen::{
  FromUrl,
  audio::AudioWrapper,
  config::PipelineConfig,
  input::ImageFileInput,
  model::ModelWrapper,
  pipeline::FramePipeline,
  playback::PlaybackGate,
  task::{OneShotTask, Task},
};

/// 对单张图像给出导航指令
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 语音输出
  #[arg(long, value_name = "AUDIO", default_value = "log://")]
  pub audio: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入来源: {}", args.input);

  let input = ImageFileInput::from_url(&args.input)?;
  let model = ModelWrapper::from_url(&args.model)?;
  let gate = Arc::new(PlaybackGate::new(AudioWrapper::from_url(&args.audio)?));
  gate.set_active(true);

  let pipeline = FramePipeline::new(PipelineConfig::default(), gate);
  let report = OneShotTask.run_task(input, model, &pipeline)?;
  for (instruction, count) in &report.instructions {
    println!("{} x{}", instruction, count);
  }

  Ok(())
}
