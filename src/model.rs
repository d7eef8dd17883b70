// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input: ?Sized;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn postprocess(&self, logits: &[f32]) -> Result<Self::Output, Self::Error>;
}

/// 标签到分数的有序映射
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreResult {
  items: Vec<(String, f32)>,
}

impl ScoreResult {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push<S: Into<String>>(&mut self, label: S, score: f32) {
    self.items.push((label.into(), score));
  }

  pub fn get(&self, label: &str) -> Option<f32> {
    self
      .items
      .iter()
      .find(|(l, _)| l == label)
      .map(|(_, score)| *score)
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
    self.items.iter().map(|(l, s)| (l.as_str(), *s))
  }

  pub fn labels(&self) -> Vec<&str> {
    self.items.iter().map(|(l, _)| l.as_str()).collect()
  }

  pub fn total(&self) -> f32 {
    self.items.iter().map(|(_, s)| s).sum()
  }
}

impl<S: Into<String>> FromIterator<(S, f32)> for ScoreResult {
  fn from_iter<T: IntoIterator<Item = (S, f32)>>(iter: T) -> Self {
    Self {
      items: iter.into_iter().map(|(l, s)| (l.into(), s)).collect(),
    }
  }
}

/// 数值稳定的 softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

pub fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

/// 打开 ONNX 推理会话
pub(crate) fn open_session(
  model_path: &std::path::Path,
  threads: Option<usize>,
) -> Result<ort::session::Session, ort::Error> {
  let mut builder = ort::session::Session::builder()?;
  if let Some(threads) = threads {
    builder = builder.with_intra_threads(threads)?;
  }
  #[cfg(feature = "cuda")]
  {
    builder = builder.with_execution_providers([
      ort::execution_providers::CUDAExecutionProvider::default().build(),
    ])?;
  }
  builder.commit_from_file(model_path)
}

/// 解析模型 URL 中的 `threads` 查询参数
pub(crate) fn threads_from_url(url: &url::Url) -> Result<Option<usize>, String> {
  match url.query_pairs().find(|(k, _)| k == "threads") {
    Some((_, v)) => v
      .parse::<usize>()
      .map(Some)
      .map_err(|_| format!("无效的线程数: {}", v)),
    None => Ok(None),
  }
}

mod clip;
pub use self::clip::{ClipBuilder, ClipError, ClipModel};

mod toxicity;
pub use self::toxicity::{DETOXIFY_ORIGINAL_LABELS, ToxicityBuilder, ToxicityError, ToxicityModel};
