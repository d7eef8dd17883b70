// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/prompt.rs - 图像评分提示词集合
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

use std::{collections::HashSet, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PromptError {
  #[error("提示词集合为空")]
  Empty,
  #[error("重复的提示词标签: {0}")]
  DuplicateLabel(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("提示词文件解析错误: {0}")]
  Parse(#[from] toml::de::Error),
}

/// 单条提示词
///
/// `text` 交给图文相似度模型，`label` 作为输出映射的键。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
  pub label: String,
  pub text: String,
}

impl Prompt {
  /// 标签与文本相同
  pub fn plain(text: &str) -> Self {
    Self {
      label: text.to_string(),
      text: text.to_string(),
    }
  }

  /// 标签由文本中的空格替换为下划线得到
  pub fn underscored(text: &str) -> Self {
    Self {
      label: text.replace(' ', "_"),
      text: text.to_string(),
    }
  }
}

/// 有序、非空、标签唯一的提示词集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
  prompts: Box<[Prompt]>,
}

const BASIC_PROMPTS: [&str; 4] = ["colorful", "bright", "yellow", "square"];

const PLACEHOLDER_PROMPT: &str = "a photo";

const MODERATION_PROMPTS: [&str; 64] = [
  "safe for work",
  "family friendly",
  "landscape",
  "food",
  "animal",
  "portrait",
  "group of people",
  "text document",
  "screenshot",
  "meme",
  "cartoon",
  "artwork",
  "sports",
  "vehicle",
  "building",
  "medical image",
  "nudity",
  "partial nudity",
  "sexual activity",
  "suggestive pose",
  "lingerie",
  "swimwear",
  "sex toy",
  "child in danger",
  "graphic violence",
  "blood",
  "gore",
  "dead body",
  "physical fight",
  "weapon",
  "gun",
  "knife",
  "explosion",
  "terrorism",
  "war",
  "self harm",
  "suicide",
  "eating disorder",
  "drugs",
  "drug paraphernalia",
  "alcohol",
  "smoking",
  "vaping",
  "gambling",
  "hate symbol",
  "extremist flag",
  "offensive gesture",
  "racist imagery",
  "harassment",
  "bullying",
  "animal cruelty",
  "dangerous stunt",
  "disturbing content",
  "horror",
  "vomit",
  "injury",
  "burn wound",
  "surgery",
  "scam advertisement",
  "personal information",
  "credit card",
  "identity document",
  "spam",
  "watermark",
];

impl PromptSet {
  pub fn new(prompts: Vec<Prompt>) -> Result<Self, PromptError> {
    if prompts.is_empty() {
      return Err(PromptError::Empty);
    }

    let mut seen = HashSet::with_capacity(prompts.len());
    for prompt in &prompts {
      if !seen.insert(prompt.label.as_str()) {
        return Err(PromptError::DuplicateLabel(prompt.label.clone()));
      }
    }

    Ok(Self {
      prompts: prompts.into_boxed_slice(),
    })
  }

  /// 四条基础描述词
  pub fn basic() -> Self {
    Self {
      prompts: BASIC_PROMPTS.iter().map(|text| Prompt::plain(text)).collect(),
    }
  }

  /// 内容审核分类体系，标签中的空格替换为下划线
  pub fn moderation() -> Self {
    Self {
      prompts: MODERATION_PROMPTS
        .iter()
        .map(|text| Prompt::underscored(text))
        .collect(),
    }
  }

  pub fn placeholder() -> Self {
    Self {
      prompts: Box::new([Prompt::plain(PLACEHOLDER_PROMPT)]),
    }
  }

  pub fn builtin(name: &str) -> Option<Self> {
    match name {
      "basic" => Some(Self::basic()),
      "moderation" => Some(Self::moderation()),
      "placeholder" => Some(Self::placeholder()),
      _ => None,
    }
  }

  /// 按名称查找内置集合，否则按 TOML 文件路径加载
  pub fn resolve(spec: &str) -> Result<Self, PromptError> {
    if let Some(set) = Self::builtin(spec) {
      debug!("使用内置提示词集合: {}", spec);
      return Ok(set);
    }
    Self::from_file(spec)
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PromptError> {
    let path = path.as_ref();
    info!("加载提示词文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }

  /// 解析形如下列内容的提示词文件:
  ///
  /// ```toml
  /// [[prompt]]
  /// text = "graphic violence"
  /// label = "violence"   # 可选
  /// ```
  pub fn from_toml_str(content: &str) -> Result<Self, PromptError> {
    let file: PromptFile = toml::from_str(content)?;
    let prompts = file
      .prompt
      .into_iter()
      .map(|entry| match entry.label {
        Some(label) => Prompt {
          label,
          text: entry.text,
        },
        None => Prompt::underscored(&entry.text),
      })
      .collect();
    Self::new(prompts)
  }

  pub fn len(&self) -> usize {
    self.prompts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.prompts.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Prompt> {
    self.prompts.iter()
  }

  pub fn texts(&self) -> Vec<&str> {
    self.prompts.iter().map(|p| p.text.as_str()).collect()
  }

  pub fn labels(&self) -> Vec<&str> {
    self.prompts.iter().map(|p| p.label.as_str()).collect()
  }
}

impl Default for PromptSet {
  fn default() -> Self {
    Self::basic()
  }
}

#[derive(Deserialize)]
struct PromptFile {
  #[serde(default)]
  prompt: Vec<PromptEntry>,
}

#[derive(Deserialize)]
struct PromptEntry {
  text: String,
  label: Option<String>,
}
