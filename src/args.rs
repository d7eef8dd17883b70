// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

use content_processor::output::{DEFAULT_PRECISION, MAX_PRECISION};

/// 对 base64 编码的图像或文本进行评分
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 内容类型: image 或 text（不区分大小写）
  #[arg(value_name = "CONTENT_TYPE")]
  pub content_type: String,

  /// base64 编码的内容
  #[arg(value_name = "BASE64_CONTENT")]
  pub base64_content: String,

  /// CLIP 模型目录（包含 model.onnx 与 tokenizer.json）
  /// 例如: clip:///opt/models/clip?threads=4
  #[arg(long, value_name = "MODEL", default_value = "clip:models/clip")]
  pub clip_model: Url,

  /// 毒性分类模型目录（包含 model.onnx、tokenizer.json，可选 labels.toml）
  /// 例如: toxicity:///opt/models/detoxify?max_length=512
  #[arg(long, value_name = "MODEL", default_value = "toxicity:models/toxicity")]
  pub toxicity_model: Url,

  /// 图像提示词集合: basic、moderation、placeholder 或 TOML 文件路径
  #[arg(long, value_name = "SET", default_value = "basic")]
  pub prompts: String,

  /// 输出分数保留的小数位数
  #[arg(
    long,
    value_name = "DIGITS",
    default_value_t = DEFAULT_PRECISION,
    value_parser = clap::value_parser!(u32).range(0..=MAX_PRECISION as i64)
  )]
  pub precision: u32,

  /// 日志级别（输出到 stderr）
  #[arg(long, value_name = "LEVEL", default_value = "warn")]
  pub log_level: tracing::Level,
}
