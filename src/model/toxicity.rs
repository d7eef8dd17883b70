// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/model/toxicity.rs - 文本毒性多标签分类模型
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

use std::{path::PathBuf, sync::Mutex};

use ndarray::Array2;
use ort::{inputs, session::Session, value::Value};
use serde::Deserialize;
use thiserror::Error;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  dispatch::{ScoreError, TextScore, TextScorer},
  model::{Model, ScoreResult, open_session, sigmoid, threads_from_url},
  url_to_path,
};

const TOXICITY_MODEL_FILE: &str = "model.onnx";
const TOXICITY_TOKENIZER_FILE: &str = "tokenizer.json";
const TOXICITY_LABELS_FILE: &str = "labels.toml";
const TOXICITY_MAX_TOKENS: usize = 512;

/// Detoxify `original` 模型的输出类别
pub const DETOXIFY_ORIGINAL_LABELS: [&str; 6] = [
  "toxic",
  "severe_toxic",
  "obscene",
  "threat",
  "insult",
  "identity_hate",
];

#[derive(Error, Debug)]
pub enum ToxicityError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型文件不存在: {0}")]
  MissingFile(PathBuf),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("分词器错误: {0}")]
  TokenizerError(String),
  #[error("张量形状错误: {0}")]
  ShapeError(#[from] ndarray::ShapeError),
  #[error("标签文件错误: {0}")]
  LabelsError(String),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理会话锁已失效")]
  Poisoned,
}

impl ToxicityError {
  fn tokenizer(e: tokenizers::Error) -> Self {
    ToxicityError::TokenizerError(e.to_string())
  }
}

pub struct ToxicityModel {
  session: Mutex<Session>,
  tokenizer: Tokenizer,
  labels: Box<[String]>,
  with_token_type_ids: bool,
}

pub struct ToxicityBuilder {
  model_dir: PathBuf,
  threads: Option<usize>,
  max_length: usize,
}

impl FromUrlWithScheme for ToxicityBuilder {
  const SCHEME: &'static str = "toxicity";
}

impl FromUrl for ToxicityBuilder {
  type Error = ToxicityError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ToxicityError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let threads = threads_from_url(url).map_err(ToxicityError::ModelPathError)?;
    let max_length = match url.query_pairs().find(|(k, _)| k == "max_length") {
      Some((_, v)) => v
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ToxicityError::ModelPathError(format!("无效的最大长度: {}", v)))?,
      None => TOXICITY_MAX_TOKENS,
    };

    Ok(ToxicityBuilder {
      model_dir: url_to_path(url),
      threads,
      max_length,
    })
  }
}

#[derive(Deserialize)]
struct LabelsFile {
  labels: Vec<String>,
}

/// 读取 `labels.toml`，不存在时使用 Detoxify 默认类别
fn load_labels(path: &std::path::Path) -> Result<Box<[String]>, ToxicityError> {
  if !path.is_file() {
    debug!("未找到标签文件，使用默认类别");
    return Ok(
      DETOXIFY_ORIGINAL_LABELS
        .iter()
        .map(|l| l.to_string())
        .collect(),
    );
  }

  let content =
    std::fs::read_to_string(path).map_err(|e| ToxicityError::LabelsError(e.to_string()))?;
  let file: LabelsFile =
    toml::from_str(&content).map_err(|e| ToxicityError::LabelsError(e.to_string()))?;
  if file.labels.is_empty() {
    return Err(ToxicityError::LabelsError("类别列表为空".to_string()));
  }
  Ok(file.labels.into_boxed_slice())
}

impl ToxicityBuilder {
  pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
    Self {
      model_dir: model_dir.into(),
      threads: None,
      max_length: TOXICITY_MAX_TOKENS,
    }
  }

  fn file(&self, name: &str) -> Result<PathBuf, ToxicityError> {
    let path = self.model_dir.join(name);
    if !path.is_file() {
      error!("模型目录缺少文件: {}", path.display());
      return Err(ToxicityError::MissingFile(path));
    }
    Ok(path)
  }

  pub fn build(self) -> Result<ToxicityModel, ToxicityError> {
    let model_path = self.file(TOXICITY_MODEL_FILE)?;
    let tokenizer_path = self.file(TOXICITY_TOKENIZER_FILE)?;
    let labels = load_labels(&self.model_dir.join(TOXICITY_LABELS_FILE))?;
    debug!("毒性类别: {:?}", labels);

    info!("加载分词器: {}", tokenizer_path.display());
    let mut tokenizer =
      Tokenizer::from_file(&tokenizer_path).map_err(ToxicityError::tokenizer)?;
    configure_tokenizer(&mut tokenizer, self.max_length)?;

    info!("加载模型文件: {}", model_path.display());
    let session = open_session(&model_path, self.threads)?;
    let with_token_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");
    debug!("模型需要 token_type_ids: {}", with_token_type_ids);
    if session.outputs.is_empty() {
      return Err(ToxicityError::ModelInvalid("模型没有输出".to_string()));
    }
    info!("模型加载完成");

    Ok(ToxicityModel {
      session: Mutex::new(session),
      tokenizer,
      labels,
      with_token_type_ids,
    })
  }
}

/// 单条文本不填充，只截断到 `max_length`
fn configure_tokenizer(tokenizer: &mut Tokenizer, max_length: usize) -> Result<(), ToxicityError> {
  tokenizer
    .with_truncation(Some(TruncationParams {
      max_length,
      ..Default::default()
    }))
    .map_err(ToxicityError::tokenizer)?;
  tokenizer.with_padding(None);
  Ok(())
}

/// 编码为 `[1, seq_len]` 的 `input_ids` 与 `attention_mask`
fn encode_text(
  tokenizer: &Tokenizer,
  text: &str,
) -> Result<(Array2<i64>, Array2<i64>), ToxicityError> {
  let encoding = tokenizer
    .encode(text, true)
    .map_err(ToxicityError::tokenizer)?;
  let seq_len = encoding.len();
  debug!("文本分词数量: {}", seq_len);
  if seq_len == 0 {
    warn!("分词结果为空");
  }

  let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
  let attention_mask: Vec<i64> = encoding
    .get_attention_mask()
    .iter()
    .map(|&m| m as i64)
    .collect();

  Ok((
    Array2::from_shape_vec((1, seq_len), input_ids)?,
    Array2::from_shape_vec((1, seq_len), attention_mask)?,
  ))
}

/// 对每个类别独立做 sigmoid
fn scores_from_logits(labels: &[String], logits: &[f32]) -> Result<ScoreResult, ToxicityError> {
  if logits.len() != labels.len() {
    error!(
      "预期类别数量为 {}, 实际为 {}",
      labels.len(),
      logits.len()
    );
    return Err(ToxicityError::ModelInvalid(format!(
      "预期类别数量为 {}, 实际为 {}",
      labels.len(),
      logits.len()
    )));
  }

  Ok(
    labels
      .iter()
      .zip(logits)
      .map(|(label, &logit)| (label.clone(), sigmoid(logit)))
      .collect(),
  )
}

impl Model for ToxicityModel {
  type Input = str;
  type Output = ScoreResult;
  type Error = ToxicityError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let (input_ids, attention_mask) = encode_text(&self.tokenizer, input)?;
    let seq_len = input_ids.ncols();
    let input_ids = Value::from_array(input_ids)?;
    let attention_mask = Value::from_array(attention_mask)?;

    let mut session = self.session.lock().map_err(|_| ToxicityError::Poisoned)?;

    debug!("执行模型推理");
    let outputs = if self.with_token_type_ids {
      let token_type_ids = Value::from_array(Array2::<i64>::zeros((1, seq_len)))?;
      session.run(inputs![
        "input_ids" => input_ids,
        "attention_mask" => attention_mask,
        "token_type_ids" => token_type_ids
      ])?
    } else {
      session.run(inputs![
        "input_ids" => input_ids,
        "attention_mask" => attention_mask
      ])?
    };

    let logits_key = outputs
      .keys()
      .find(|k| k.contains("logits"))
      .or_else(|| outputs.keys().next())
      .ok_or_else(|| ToxicityError::ModelInvalid("模型没有输出".to_string()))?;
    let logits = outputs[logits_key].try_extract_array::<f32>()?;
    debug!("模型输出形状: {:?}", logits.shape());
    let logits: Vec<f32> = logits.iter().copied().collect();

    self.postprocess(&logits)
  }

  fn postprocess(&self, logits: &[f32]) -> Result<Self::Output, Self::Error> {
    debug!("后处理模型输出");
    let result = scores_from_logits(&self.labels, logits)?;
    debug!("文本评分结果: {:?}", result);
    Ok(result)
  }
}

impl TextScorer for ToxicityModel {
  fn score_text(&self, bytes: &[u8]) -> Result<TextScore, ScoreError> {
    let text = std::str::from_utf8(bytes)?;
    let scores = self.infer(text)?;
    Ok(TextScore {
      text: text.to_string(),
      scores,
    })
  }
}
