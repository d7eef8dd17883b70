// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/dispatch.rs - 内容分发
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

use thiserror::Error;
use tracing::{info, warn};

use crate::{
  content::{ContentRequest, ContentType},
  model::{ClipError, ScoreResult, ToxicityError},
  output::Render,
};

#[derive(Error, Debug)]
pub enum ScoreError {
  #[error("图像解码错误: {0}")]
  ImageDecode(#[from] image::ImageError),
  #[error("文本不是有效的 UTF-8: {0}")]
  Utf8(#[from] std::str::Utf8Error),
  #[error("图像模型错误: {0}")]
  Clip(#[from] ClipError),
  #[error("文本模型错误: {0}")]
  Toxicity(#[from] ToxicityError),
}

#[derive(Error, Debug)]
pub enum DispatchError {
  #[error("评分失败: {0}")]
  Score(#[from] ScoreError),
  #[error("未配置 {0} 评分器")]
  ScorerUnavailable(ContentType),
}

pub trait ImageScorer {
  fn score_image(&self, bytes: &[u8]) -> Result<ScoreResult, ScoreError>;
}

pub trait TextScorer {
  fn score_text(&self, bytes: &[u8]) -> Result<TextScore, ScoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextScore {
  pub text: String,
  pub scores: ScoreResult,
}

/// 评分报告
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreReport {
  Image(ScoreResult),
  Text(TextScore),
}

impl ScoreReport {
  pub fn content_type(&self) -> ContentType {
    match self {
      ScoreReport::Image(_) => ContentType::Image,
      ScoreReport::Text(_) => ContentType::Text,
    }
  }

  pub fn scores(&self) -> &ScoreResult {
    match self {
      ScoreReport::Image(scores) => scores,
      ScoreReport::Text(text) => &text.scores,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Scored(ScoreReport),
  /// 内容类型无法识别，未调用任何评分器
  Unsupported(String),
}

/// 根据内容类型把负载交给对应评分器
///
/// 评分器由调用方构建一次后交给分发器持有，重复调用不会重新加载模型。
pub struct Dispatcher<I, T> {
  image: Option<I>,
  text: Option<T>,
}

impl<I, T> Default for Dispatcher<I, T> {
  fn default() -> Self {
    Self {
      image: None,
      text: None,
    }
  }
}

impl<I: ImageScorer, T: TextScorer> Dispatcher<I, T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_image_scorer(mut self, scorer: I) -> Self {
    self.image = Some(scorer);
    self
  }

  pub fn with_text_scorer(mut self, scorer: T) -> Self {
    self.text = Some(scorer);
    self
  }

  pub fn score(&self, request: &ContentRequest) -> Result<ScoreReport, DispatchError> {
    let bytes = request.raw_bytes();
    match request.content_type() {
      ContentType::Image => {
        let scorer = self
          .image
          .as_ref()
          .ok_or(DispatchError::ScorerUnavailable(ContentType::Image))?;
        info!("图像评分: {} 字节", bytes.len());
        Ok(ScoreReport::Image(scorer.score_image(bytes)?))
      }
      ContentType::Text => {
        let scorer = self
          .text
          .as_ref()
          .ok_or(DispatchError::ScorerUnavailable(ContentType::Text))?;
        info!("文本评分: {} 字节", bytes.len());
        Ok(ScoreReport::Text(scorer.score_text(bytes)?))
      }
    }
  }

  /// 内容类型不区分大小写；无法识别时返回 [`Outcome::Unsupported`]
  pub fn process(&self, content_type: &str, content: &[u8]) -> Result<Outcome, DispatchError> {
    let content_type = match content_type.parse::<ContentType>() {
      Ok(content_type) => content_type,
      Err(e) => {
        warn!("{}", e);
        return Ok(Outcome::Unsupported(e.0));
      }
    };

    let request = ContentRequest::new(content_type, content.to_vec());
    self.score(&request).map(Outcome::Scored)
  }

  /// 处理并把结果交给输出
  pub fn process_into<R>(
    &self,
    content_type: &str,
    content: &[u8],
    output: &R,
  ) -> anyhow::Result<Outcome>
  where
    R: Render<Outcome>,
    R::Error: std::error::Error + Send + Sync + 'static,
  {
    let outcome = self.process(content_type, content)?;
    output.render_result(&outcome)?;
    Ok(outcome)
  }
}
