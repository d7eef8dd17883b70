// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/model/clip.rs - CLIP 图文相似度模型
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
use thiserror::Error;
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  dispatch::{ImageScorer, ScoreError},
  frame::ClipFrame,
  model::{Model, ScoreResult, open_session, softmax, threads_from_url},
  prompt::PromptSet,
  url_to_path,
};

const CLIP_MODEL_FILE: &str = "model.onnx";
const CLIP_TOKENIZER_FILE: &str = "tokenizer.json";
const CLIP_PAD_TOKEN: &str = "<|endoftext|>";
const CLIP_MAX_TOKENS: usize = 77;
const CLIP_LOGITS_OUTPUT: &str = "logits_per_image";
const CLIP_REQUIRED_INPUTS: [&str; 3] = ["input_ids", "attention_mask", "pixel_values"];

#[derive(Error, Debug)]
pub enum ClipError {
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
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理会话锁已失效")]
  Poisoned,
}

impl ClipError {
  fn tokenizer(e: tokenizers::Error) -> Self {
    ClipError::TokenizerError(e.to_string())
  }
}

/// 持有推理会话与预先分词的提示词，构建一次后重复使用
pub struct ClipModel {
  session: Mutex<Session>,
  prompts: PromptSet,
  input_ids: Array2<i64>,
  attention_mask: Array2<i64>,
}

pub struct ClipBuilder {
  model_dir: PathBuf,
  prompts: PromptSet,
  threads: Option<usize>,
}

impl FromUrlWithScheme for ClipBuilder {
  const SCHEME: &'static str = "clip";
}

impl FromUrl for ClipBuilder {
  type Error = ClipError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ClipError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let threads = threads_from_url(url).map_err(ClipError::ModelPathError)?;

    Ok(ClipBuilder {
      model_dir: url_to_path(url),
      prompts: PromptSet::default(),
      threads,
    })
  }
}

impl ClipBuilder {
  pub fn new<P: Into<PathBuf>>(model_dir: P) -> Self {
    Self {
      model_dir: model_dir.into(),
      prompts: PromptSet::default(),
      threads: None,
    }
  }

  pub fn prompts(mut self, prompts: PromptSet) -> Self {
    self.prompts = prompts;
    self
  }

  fn file(&self, name: &str) -> Result<PathBuf, ClipError> {
    let path = self.model_dir.join(name);
    if !path.is_file() {
      error!("模型目录缺少文件: {}", path.display());
      return Err(ClipError::MissingFile(path));
    }
    Ok(path)
  }

  pub fn build(self) -> Result<ClipModel, ClipError> {
    let model_path = self.file(CLIP_MODEL_FILE)?;
    let tokenizer_path = self.file(CLIP_TOKENIZER_FILE)?;

    info!("加载分词器: {}", tokenizer_path.display());
    let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(ClipError::tokenizer)?;
    configure_tokenizer(&mut tokenizer)?;

    let (input_ids, attention_mask) = tokenize_prompts(&tokenizer, &self.prompts)?;
    debug!("提示词张量形状: {:?}", input_ids.shape());

    info!("加载模型文件: {}", model_path.display());
    let session = open_session(&model_path, self.threads)?;

    for name in CLIP_REQUIRED_INPUTS {
      if !session.inputs.iter().any(|i| i.name == name) {
        error!("模型缺少输入: {}", name);
        return Err(ClipError::ModelInvalid(format!("缺少输入 {}", name)));
      }
    }
    if !session.outputs.iter().any(|o| o.name == CLIP_LOGITS_OUTPUT) {
      error!("模型缺少输出: {}", CLIP_LOGITS_OUTPUT);
      return Err(ClipError::ModelInvalid(format!(
        "缺少输出 {}",
        CLIP_LOGITS_OUTPUT
      )));
    }
    info!("模型加载完成，提示词数量: {}", self.prompts.len());

    Ok(ClipModel {
      session: Mutex::new(session),
      prompts: self.prompts,
      input_ids,
      attention_mask,
    })
  }
}

/// 分词器未自带填充配置时按 `<|endoftext|>` 补齐，截断到 77 个词元
fn configure_tokenizer(tokenizer: &mut Tokenizer) -> Result<(), ClipError> {
  if tokenizer.get_padding().is_none() {
    let pad_id = tokenizer.token_to_id(CLIP_PAD_TOKEN).unwrap_or(0);
    tokenizer.with_padding(Some(PaddingParams {
      pad_id,
      pad_token: CLIP_PAD_TOKEN.to_string(),
      ..Default::default()
    }));
  }
  tokenizer
    .with_truncation(Some(TruncationParams {
      max_length: CLIP_MAX_TOKENS,
      ..Default::default()
    }))
    .map_err(ClipError::tokenizer)?;
  Ok(())
}

/// 批量分词并填充到最长提示词长度
fn tokenize_prompts(
  tokenizer: &Tokenizer,
  prompts: &PromptSet,
) -> Result<(Array2<i64>, Array2<i64>), ClipError> {
  let encodings = tokenizer
    .encode_batch(prompts.texts(), true)
    .map_err(ClipError::tokenizer)?;

  let seq_len = encodings.iter().map(|e| e.len()).max().unwrap_or(0);
  let mut ids = Vec::with_capacity(encodings.len() * seq_len);
  let mut mask = Vec::with_capacity(encodings.len() * seq_len);
  for encoding in &encodings {
    if encoding.len() != seq_len {
      return Err(ClipError::TokenizerError(format!(
        "提示词长度不一致: {} != {}",
        encoding.len(),
        seq_len
      )));
    }
    ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
    mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
  }

  let shape = (encodings.len(), seq_len);
  Ok((
    Array2::from_shape_vec(shape, ids)?,
    Array2::from_shape_vec(shape, mask)?,
  ))
}

/// 将相似度 logits 按提示词维度做 softmax
fn scores_from_logits(prompts: &PromptSet, logits: &[f32]) -> Result<ScoreResult, ClipError> {
  if logits.len() != prompts.len() {
    error!(
      "预期 logits 数量为 {}, 实际为 {}",
      prompts.len(),
      logits.len()
    );
    return Err(ClipError::ModelInvalid(format!(
      "预期 logits 数量为 {}, 实际为 {}",
      prompts.len(),
      logits.len()
    )));
  }

  let probabilities = softmax(logits);
  Ok(
    prompts
      .iter()
      .zip(probabilities)
      .map(|(prompt, p)| (prompt.label.clone(), p))
      .collect(),
  )
}

impl Model for ClipModel {
  type Input = ClipFrame;
  type Output = ScoreResult;
  type Error = ClipError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let pixel_values = Value::from_array(input.to_array())?;
    let input_ids = Value::from_array(self.input_ids.clone())?;
    let attention_mask = Value::from_array(self.attention_mask.clone())?;

    let mut session = self.session.lock().map_err(|_| ClipError::Poisoned)?;

    debug!("执行模型推理");
    let outputs = session.run(inputs![
      "input_ids" => input_ids,
      "attention_mask" => attention_mask,
      "pixel_values" => pixel_values
    ])?;

    let logits_key = outputs
      .keys()
      .find(|k| k.contains(CLIP_LOGITS_OUTPUT))
      .ok_or_else(|| ClipError::ModelInvalid(format!("缺少输出 {}", CLIP_LOGITS_OUTPUT)))?;
    let logits = outputs[logits_key].try_extract_array::<f32>()?;
    debug!("模型输出形状: {:?}", logits.shape());
    let logits: Vec<f32> = logits.iter().copied().collect();

    self.postprocess(&logits)
  }

  fn postprocess(&self, logits: &[f32]) -> Result<Self::Output, Self::Error> {
    debug!("后处理模型输出");
    let result = scores_from_logits(&self.prompts, logits)?;
    debug!("图像评分结果: {:?}", result);
    Ok(result)
  }
}

impl ImageScorer for ClipModel {
  fn score_image(&self, bytes: &[u8]) -> Result<ScoreResult, ScoreError> {
    let image = image::load_from_memory(bytes).map_err(ScoreError::ImageDecode)?;
    debug!("图像解码完成: {}x{}", image.width(), image.height());
    let frame = ClipFrame::from(&image);
    Ok(self.infer(&frame)?)
  }
}
