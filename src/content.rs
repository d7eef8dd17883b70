// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/content.rs - 内容类型与负载解码
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

use std::{fmt, str::FromStr};

use base64::{DecodeError, Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use tracing::debug;

/// 内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
  Image,
  Text,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("不支持的内容类型: {0}")]
pub struct UnsupportedContentType(pub String);

impl FromStr for ContentType {
  type Err = UnsupportedContentType;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.eq_ignore_ascii_case("image") {
      Ok(ContentType::Image)
    } else if s.eq_ignore_ascii_case("text") {
      Ok(ContentType::Text)
    } else {
      Err(UnsupportedContentType(s.to_string()))
    }
  }
}

impl ContentType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ContentType::Image => "image",
      ContentType::Text => "text",
    }
  }
}

impl fmt::Display for ContentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 单次调用的待处理内容
#[derive(Debug, Clone)]
pub struct ContentRequest {
  content_type: ContentType,
  raw_bytes: Vec<u8>,
}

impl ContentRequest {
  pub fn new(content_type: ContentType, raw_bytes: Vec<u8>) -> Self {
    Self {
      content_type,
      raw_bytes,
    }
  }

  pub fn content_type(&self) -> ContentType {
    self.content_type
  }

  pub fn raw_bytes(&self) -> &[u8] {
    &self.raw_bytes
  }
}

/// base64 负载解码错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
  #[error("base64 格式错误: 偏移 {offset} 处的字节 {byte:#04x} 无效")]
  Malformed { offset: usize, byte: u8 },
  #[error("base64 填充错误")]
  BadPadding,
  #[error("base64 长度错误: {0}")]
  WrongLength(usize),
  #[error("base64 含有非 ASCII 字符: 偏移 {0}")]
  NonAscii(usize),
}

impl PayloadError {
  /// 错误种类的简短名称，用于日志
  pub fn kind(&self) -> &'static str {
    match self {
      PayloadError::Malformed { .. } | PayloadError::BadPadding => "malformed",
      PayloadError::WrongLength(_) => "wrong length",
      PayloadError::NonAscii(_) => "non-ASCII",
    }
  }
}

impl From<DecodeError> for PayloadError {
  #[allow(unreachable_patterns)]
  fn from(err: DecodeError) -> Self {
    match err {
      DecodeError::InvalidByte(offset, byte) => PayloadError::Malformed { offset, byte },
      DecodeError::InvalidLastSymbol(offset, byte) => PayloadError::Malformed { offset, byte },
      DecodeError::InvalidLength(len) => PayloadError::WrongLength(len),
      DecodeError::InvalidPadding => PayloadError::BadPadding,
      _ => PayloadError::BadPadding,
    }
  }
}

/// 解码标准字母表、带填充的 base64 负载
pub fn decode_payload(encoded: &str) -> Result<Vec<u8>, PayloadError> {
  let encoded = encoded.trim();
  if let Some(offset) = encoded.bytes().position(|b| !b.is_ascii()) {
    return Err(PayloadError::NonAscii(offset));
  }

  let bytes = STANDARD.decode(encoded)?;
  debug!("base64 解码完成: {} 字节", bytes.len());
  Ok(bytes)
}

pub fn encode_payload(bytes: &[u8]) -> String {
  STANDARD.encode(bytes)
}
