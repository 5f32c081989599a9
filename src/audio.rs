// 该文件是 Xunmen （寻门） 项目的一部分。
// src/audio.rs - 语音输出
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
  path::PathBuf,
  process::{Child, Command, Stdio},
  sync::{Arc, Mutex},
  thread,
  time::Duration,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path,
  playback::{AudioSink, Cue, PlaybackCompletion},
};

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_CLIP_EXTENSION: &str = "wav";

#[derive(Error, Debug)]
pub enum AudioError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("缺少语音片段目录参数 clips")]
  MissingClipDirectory,
  #[error("语音片段不存在: {0}")]
  ClipNotFound(PathBuf),
  #[error("启动播放器失败: {0}")]
  SpawnError(#[from] std::io::Error),
  #[error("路径解码失败: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
}

/// 只写日志的输出，片段立即视为播放完毕
#[derive(Debug, Default)]
pub struct LogSink;

impl FromUrlWithScheme for LogSink {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogSink {
  type Error = AudioError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(AudioError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(LogSink)
  }
}

impl AudioSink for LogSink {
  type Error = AudioError;

  fn play(&self, cue: Cue, completion: PlaybackCompletion) -> Result<(), Self::Error> {
    info!("语音: {}", cue);
    completion.finish();
    Ok(())
  }

  fn stop(&self) {
    debug!("停止语音");
  }
}

struct Playing {
  id: u64,
  child: Child,
}

#[derive(Default)]
struct PlayerSlot {
  next_id: u64,
  current: Option<Playing>,
}

/// 调用外部播放器播放 `<clips>/<cue>.<ext>`
///
/// URL 形式: `command:///usr/bin/aplay?clips=/path/to/clips&ext=wav`
pub struct CommandSink {
  player: PathBuf,
  clips: PathBuf,
  extension: String,
  slot: Arc<Mutex<PlayerSlot>>,
}

impl FromUrlWithScheme for CommandSink {
  const SCHEME: &'static str = "command";
}

impl FromUrl for CommandSink {
  type Error = AudioError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(AudioError::SchemeMismatch(url.scheme().to_string()));
    }

    let mut clips = None;
    let mut extension = DEFAULT_CLIP_EXTENSION.to_string();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "clips" => clips = Some(PathBuf::from(value.as_ref())),
        "ext" => extension = value.into_owned(),
        other => warn!("忽略未知参数: {}", other),
      }
    }

    let clips = clips.ok_or(AudioError::MissingClipDirectory)?;
    Ok(Self::new(decoded_path(url)?, clips).with_extension(extension))
  }
}

fn lock_slot(slot: &Mutex<PlayerSlot>) -> std::sync::MutexGuard<'_, PlayerSlot> {
  slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CommandSink {
  pub fn new<P: Into<PathBuf>, C: Into<PathBuf>>(player: P, clips: C) -> Self {
    Self {
      player: player.into(),
      clips: clips.into(),
      extension: DEFAULT_CLIP_EXTENSION.to_string(),
      slot: Arc::new(Mutex::new(PlayerSlot::default())),
    }
  }

  pub fn with_extension(mut self, extension: String) -> Self {
    self.extension = extension;
    self
  }

  pub fn clip_path(&self, cue: Cue) -> PathBuf {
    self
      .clips
      .join(format!("{}.{}", cue.name(), self.extension))
  }

  fn watch(slot: Arc<Mutex<PlayerSlot>>, id: u64, completion: PlaybackCompletion) {
    loop {
      {
        let mut slot = lock_slot(&slot);
        let Some(playing) = slot.current.as_mut().filter(|p| p.id == id) else {
          // 已被 stop 终止
          return;
        };
        match playing.child.try_wait() {
          Ok(Some(status)) => {
            if !status.success() {
              warn!("播放器退出状态异常: {}", status);
            }
            slot.current = None;
            break;
          }
          Ok(None) => {}
          Err(e) => {
            error!("等待播放器失败: {}", e);
            slot.current = None;
            break;
          }
        }
      }
      thread::sleep(CHILD_POLL_INTERVAL);
    }
    completion.finish();
  }
}

impl AudioSink for CommandSink {
  type Error = AudioError;

  fn play(&self, cue: Cue, completion: PlaybackCompletion) -> Result<(), Self::Error> {
    let clip = self.clip_path(cue);
    if !clip.is_file() {
      return Err(AudioError::ClipNotFound(clip));
    }

    let child = Command::new(&self.player)
      .arg(&clip)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()?;
    debug!("播放 {}，进程 {}", clip.display(), child.id());

    let id = {
      let mut slot = lock_slot(&self.slot);
      let id = slot.next_id;
      slot.next_id += 1;
      if let Some(mut previous) = slot.current.replace(Playing { id, child }) {
        let _ = previous.child.kill();
        let _ = previous.child.wait();
      }
      id
    };

    let slot = self.slot.clone();
    thread::spawn(move || Self::watch(slot, id, completion));
    Ok(())
  }

  fn stop(&self) {
    let mut slot = lock_slot(&self.slot);
    if let Some(mut playing) = slot.current.take() {
      debug!("终止播放进程 {}", playing.child.id());
      if let Err(e) = playing.child.kill() {
        warn!("终止播放进程失败: {}", e);
      }
      let _ = playing.child.wait();
    }
  }
}

/// 按 URL 方案选择的语音输出
pub enum AudioWrapper {
  Log(LogSink),
  Command(CommandSink),
}

impl FromUrl for AudioWrapper {
  type Error = AudioError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogSink::SCHEME => Ok(AudioWrapper::Log(LogSink::from_url(url)?)),
      CommandSink::SCHEME => Ok(AudioWrapper::Command(CommandSink::from_url(url)?)),
      scheme => Err(AudioError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl AudioSink for AudioWrapper {
  type Error = AudioError;

  fn play(&self, cue: Cue, completion: PlaybackCompletion) -> Result<(), Self::Error> {
    match self {
      AudioWrapper::Log(sink) => sink.play(cue, completion),
      AudioWrapper::Command(sink) => sink.play(cue, completion),
    }
  }

  fn stop(&self) {
    match self {
      AudioWrapper::Log(sink) => sink.stop(),
      AudioWrapper::Command(sink) => sink.stop(),
    }
  }
}
