// 该文件是 Xunmen （寻门） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod audio;
pub mod config;
pub mod detection;
pub mod frame;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod playback;
pub mod policy;
pub mod preprocess;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 取出 URL 路径部分并做百分号解码，得到文件系统路径
///
/// 非 `file` 方案的 URL 不会自动解码路径，空格和中文都以 `%XX` 形式保留。
pub fn decoded_path(url: &url::Url) -> Result<std::path::PathBuf, std::string::FromUtf8Error> {
  let path = urlencoding::decode(url.path())?;
  Ok(std::path::PathBuf::from(path.into_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decoded_path_handles_spaces_and_cjk() {
    let url = url::Url::parse("replay:///tmp/门 数据/rows.json").unwrap();
    assert_ne!(url.path(), "/tmp/门 数据/rows.json");
    assert_eq!(
      decoded_path(&url).unwrap(),
      std::path::PathBuf::from("/tmp/门 数据/rows.json")
    );
  }
}
