// 该文件是 Xunmen （寻门） 项目的一部分。
// src/playback.rs - 语音播放闸门与会话状态
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
  fmt,
  sync::{Arc, Mutex, MutexGuard},
};

use tracing::{debug, info, warn};

use crate::policy::Instruction;

/// 预录语音片段的名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cue(&'static str);

impl Cue {
  pub fn name(&self) -> &'static str {
    self.0
  }
}

impl fmt::Display for Cue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0)
  }
}

impl From<Instruction> for Cue {
  fn from(instruction: Instruction) -> Self {
    match instruction {
      Instruction::GoLeft => Cue("go_left"),
      Instruction::GoRight => Cue("go_right"),
      Instruction::GoAhead => Cue("go_ahead"),
      Instruction::Stop => Cue("stop"),
      Instruction::Searching => Cue("searching"),
    }
  }
}

/// 音频输出
///
/// `play` 应尽快返回，片段播放结束后调用 `completion.finish()`。
pub trait AudioSink {
  type Error: std::error::Error;

  fn play(&self, cue: Cue, completion: PlaybackCompletion) -> Result<(), Self::Error>;

  /// 立即停止正在播放的片段
  fn stop(&self);
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
  type Error = S::Error;

  fn play(&self, cue: Cue, completion: PlaybackCompletion) -> Result<(), Self::Error> {
    (**self).play(cue, completion)
  }

  fn stop(&self) {
    (**self).stop()
  }
}

/// 会话期间的播放状态
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
  pub active: bool,
  pub playing: bool,
  /// 每次开始播放或强制停止时递增
  generation: u64,
  /// 最近一次强制停止后的 generation
  stopped_at: u64,
}

/// 播放完成通知
///
/// 只对发出它的那一次播放有效；强制停止之后的迟到通知会被忽略。
#[derive(Debug)]
pub struct PlaybackCompletion {
  state: Arc<Mutex<PlaybackState>>,
  generation: u64,
}

impl PlaybackCompletion {
  pub fn finish(self) {
    let mut state = lock(&self.state);
    if state.generation == self.generation && state.playing {
      state.playing = false;
      debug!("播放完成");
    }
  }
}

/// `emit` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
  Played(Cue),
  /// 上一段语音仍在播放，本条指令被丢弃
  Dropped,
  /// 会话未激活
  Inactive,
  /// 音频输出启动失败
  Failed,
}

/// 播放闸门
///
/// 帧处理路径与开关控制共用同一个闸门，所有状态变更都在同一把锁内完成。
pub struct PlaybackGate<S: AudioSink> {
  state: Arc<Mutex<PlaybackState>>,
  sink: S,
}

fn lock(state: &Mutex<PlaybackState>) -> MutexGuard<'_, PlaybackState> {
  state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: AudioSink> PlaybackGate<S> {
  pub fn new(sink: S) -> Self {
    Self {
      state: Arc::new(Mutex::new(PlaybackState::default())),
      sink,
    }
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  pub fn state(&self) -> PlaybackState {
    *lock(&self.state)
  }

  pub fn is_active(&self) -> bool {
    lock(&self.state).active
  }

  pub fn is_playing(&self) -> bool {
    lock(&self.state).playing
  }

  /// 开启或关闭辅助会话；关闭时立即打断正在播放的语音
  pub fn set_active(&self, active: bool) {
    {
      let mut state = lock(&self.state);
      if state.active == active {
        return;
      }
      state.active = active;
      if !active {
        state.playing = false;
        state.generation += 1;
        state.stopped_at = state.generation;
      }
    }

    if active {
      info!("辅助已开启");
    } else {
      info!("辅助已关闭，停止播放");
      self.sink.stop();
    }
  }

  /// 切换会话状态，返回切换后的状态
  pub fn toggle(&self) -> bool {
    let active = !self.is_active();
    self.set_active(active);
    active
  }

  /// 请求播放一条指令
  pub fn emit(&self, instruction: Instruction) -> Emission {
    let generation = {
      let mut state = lock(&self.state);
      if !state.active {
        return Emission::Inactive;
      }
      if state.playing {
        debug!("正在播放，丢弃指令: {}", instruction);
        return Emission::Dropped;
      }
      state.playing = true;
      state.generation += 1;
      state.generation
    };

    let cue = Cue::from(instruction);
    let completion = PlaybackCompletion {
      state: self.state.clone(),
      generation,
    };

    if let Err(e) = self.sink.play(cue, completion) {
      warn!("播放语音 {} 失败: {}", cue, e);
      let mut state = lock(&self.state);
      if state.generation == generation {
        state.playing = false;
      }
      return Emission::Failed;
    }

    // 播放启动期间发生过强制停止（即使会话随后又被开启），补发一次停止
    let interrupted = lock(&self.state).stopped_at > generation;
    if interrupted {
      debug!("播放启动时会话已关闭，停止 {}", cue);
      self.sink.stop();
    }

    info!("播放指令: {}", instruction);
    Emission::Played(cue)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::{
    convert::Infallible,
    sync::{Mutex, OnceLock, Weak},
  };

  use super::*;

  /// 记录调用并保存完成通知的测试输出
  #[derive(Default)]
  pub(crate) struct RecordingSink {
    pub played: Mutex<Vec<Cue>>,
    pub stops: Mutex<usize>,
    pub pending: Mutex<Vec<PlaybackCompletion>>,
  }

  impl RecordingSink {
    pub fn played(&self) -> Vec<Cue> {
      self.played.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
      *self.stops.lock().unwrap()
    }

    pub fn finish_all(&self) {
      for completion in self.pending.lock().unwrap().drain(..) {
        completion.finish();
      }
    }
  }

  impl AudioSink for RecordingSink {
    type Error = Infallible;

    fn play(&self, cue: Cue, completion: PlaybackCompletion) -> Result<(), Self::Error> {
      self.played.lock().unwrap().push(cue);
      self.pending.lock().unwrap().push(completion);
      Ok(())
    }

    fn stop(&self) {
      *self.stops.lock().unwrap() += 1;
    }
  }

  fn active_gate() -> PlaybackGate<RecordingSink> {
    let gate = PlaybackGate::new(RecordingSink::default());
    gate.set_active(true);
    gate
  }

  #[test]
  fn every_instruction_has_a_distinct_cue() {
    let mut names: Vec<_> = Instruction::ALL
      .iter()
      .map(|&i| Cue::from(i).name())
      .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), Instruction::ALL.len());
  }

  #[test]
  fn second_emit_while_playing_is_dropped() {
    let gate = active_gate();
    assert_eq!(
      gate.emit(Instruction::GoLeft),
      Emission::Played(Cue::from(Instruction::GoLeft))
    );
    assert_eq!(gate.emit(Instruction::GoRight), Emission::Dropped);
    assert_eq!(gate.sink().played().len(), 1);
    assert!(gate.is_playing());
  }

  #[test]
  fn completion_reopens_the_gate() {
    let gate = active_gate();
    gate.emit(Instruction::Searching);
    gate.sink().finish_all();
    assert!(!gate.is_playing());
    assert!(matches!(gate.emit(Instruction::Stop), Emission::Played(_)));
    assert_eq!(gate.sink().played().len(), 2);
  }

  #[test]
  fn deactivate_interrupts_playback() {
    let gate = active_gate();
    gate.emit(Instruction::GoAhead);
    assert!(gate.is_playing());

    gate.set_active(false);
    assert!(!gate.is_playing());
    assert!(!gate.is_active());
    assert_eq!(gate.sink().stops(), 1);
  }

  #[test]
  fn stale_completion_does_not_clear_newer_playback() {
    let gate = active_gate();
    gate.emit(Instruction::GoAhead);
    let stale = gate.sink().pending.lock().unwrap().pop().unwrap();

    gate.set_active(false);
    gate.set_active(true);
    gate.emit(Instruction::GoLeft);
    stale.finish();

    assert!(gate.is_playing());
  }

  #[test]
  fn inactive_session_never_plays() {
    let gate = PlaybackGate::new(RecordingSink::default());
    assert_eq!(gate.emit(Instruction::Stop), Emission::Inactive);
    assert!(gate.sink().played().is_empty());
  }

  #[test]
  fn toggle_flips_session() {
    let gate = PlaybackGate::new(RecordingSink::default());
    assert!(gate.toggle());
    assert!(gate.is_active());
    assert!(!gate.toggle());
    assert!(!gate.is_active());
  }

  /// 在 play 内部关闭再开启会话，模拟与开关控制的竞争
  #[derive(Default)]
  struct TogglingSink {
    gate: OnceLock<Weak<PlaybackGate<TogglingSink>>>,
    running: Mutex<bool>,
  }

  impl AudioSink for TogglingSink {
    type Error = Infallible;

    fn play(&self, _cue: Cue, _completion: PlaybackCompletion) -> Result<(), Self::Error> {
      if let Some(gate) = self.gate.get().and_then(Weak::upgrade) {
        gate.set_active(false);
        gate.set_active(true);
      }
      *self.running.lock().unwrap() = true;
      Ok(())
    }

    fn stop(&self) {
      *self.running.lock().unwrap() = false;
    }
  }

  #[test]
  fn stop_during_play_start_is_reissued_after_reactivation() {
    let gate = Arc::new(PlaybackGate::new(TogglingSink::default()));
    gate.sink().gate.set(Arc::downgrade(&gate)).unwrap();
    gate.set_active(true);

    assert!(matches!(gate.emit(Instruction::GoLeft), Emission::Played(_)));
    assert!(gate.is_active());
    assert!(!gate.is_playing());
    assert!(!*gate.sink().running.lock().unwrap());
  }

  #[test]
  fn synchronous_completion_is_not_treated_as_stop() {
    let gate = PlaybackGate::new(crate::audio::LogSink);
    gate.set_active(true);
    assert!(matches!(gate.emit(Instruction::GoLeft), Emission::Played(_)));
    assert!(!gate.is_playing());
    assert_eq!(gate.state().stopped_at, 0);
  }

  struct FailingSink;

  #[derive(Debug, thiserror::Error)]
  #[error("设备不可用")]
  struct DeviceGone;

  impl AudioSink for FailingSink {
    type Error = DeviceGone;

    fn play(&self, _cue: Cue, _completion: PlaybackCompletion) -> Result<(), Self::Error> {
      Err(DeviceGone)
    }

    fn stop(&self) {}
  }

  #[test]
  fn failed_play_releases_the_gate() {
    let gate = PlaybackGate::new(FailingSink);
    gate.set_active(true);
    assert_eq!(gate.emit(Instruction::GoLeft), Emission::Failed);
    assert!(!gate.is_playing());
  }
}
