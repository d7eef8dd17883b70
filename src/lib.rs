// 该文件是 Jianshen （鉴审） 项目的一部分。
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
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

pub mod content;
pub mod dispatch;
pub mod frame;
pub mod model;
pub mod output;
pub mod prompt;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 将 URL 路径解码为本地文件系统路径
///
/// `clip:///opt/models/clip` 得到 `/opt/models/clip`，
/// `clip:models/clip` 得到相对路径 `models/clip`。
pub fn url_to_path(url: &url::Url) -> std::path::PathBuf {
  let path = url.path();
  match urlencoding::decode(path) {
    Ok(decoded) => std::path::PathBuf::from(decoded.into_owned()),
    Err(_) => std::path::PathBuf::from(path),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absolute_url_path() {
    let url = url::Url::parse("clip:///opt/models/clip").unwrap();
    assert_eq!(url_to_path(&url), std::path::PathBuf::from("/opt/models/clip"));
  }

  #[test]
  fn relative_url_path() {
    let url = url::Url::parse("toxicity:models/toxicity").unwrap();
    assert_eq!(url_to_path(&url), std::path::PathBuf::from("models/toxicity"));
  }

  #[test]
  fn percent_encoded_path() {
    let url = url::Url::parse("clip:///opt/my%20models/clip").unwrap();
    assert_eq!(
      url_to_path(&url),
      std::path::PathBuf::from("/opt/my models/clip")
    );
  }
}
