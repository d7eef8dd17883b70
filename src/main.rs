// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, error::ErrorKind};
use tracing::{error, info};

use content_processor::{
  FromUrl,
  content::{ContentType, decode_payload},
  dispatch::Dispatcher,
  model::{ClipBuilder, ClipModel, ToxicityBuilder, ToxicityModel},
  output::JsonOutput,
  prompt::PromptSet,
};

const USAGE: &str = "Usage: content_processor <content_type> <base64_content>. \
                     Content type is either image or text.";
const INVALID_BASE64: &str = "Error: Invalid base64 encoded content";

fn main() -> Result<ExitCode> {
  let args = match args::Args::try_parse() {
    Ok(args) => args,
    Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
    Err(e) => {
      eprintln!("{}", USAGE);
      // 参数个数之外的错误保留 clap 的具体说明
      if !matches!(
        e.kind(),
        ErrorKind::MissingRequiredArgument | ErrorKind::UnknownArgument | ErrorKind::TooManyValues
      ) {
        eprintln!("{}", e);
      }
      return Ok(ExitCode::FAILURE);
    }
  };

  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_max_level(args.log_level)
    .init();

  info!("内容类型: {}", args.content_type);
  info!("负载长度: {}", args.base64_content.len());

  let content = match decode_payload(&args.base64_content) {
    Ok(content) => content,
    Err(e) => {
      error!("base64 解码失败 ({}): {}", e.kind(), e);
      eprintln!("{}", INVALID_BASE64);
      return Ok(ExitCode::FAILURE);
    }
  };

  // 只加载本次请求需要的模型
  let mut dispatcher: Dispatcher<ClipModel, ToxicityModel> = Dispatcher::new();
  match args.content_type.parse::<ContentType>() {
    Ok(ContentType::Image) => {
      let prompts = PromptSet::resolve(&args.prompts)?;
      info!("正在加载图像模型: {}", args.clip_model);
      let model = ClipBuilder::from_url(&args.clip_model)?
        .prompts(prompts)
        .build()?;
      dispatcher = dispatcher.with_image_scorer(model);
    }
    Ok(ContentType::Text) => {
      info!("正在加载文本模型: {}", args.toxicity_model);
      let model = ToxicityBuilder::from_url(&args.toxicity_model)?.build()?;
      dispatcher = dispatcher.with_text_scorer(model);
    }
    Err(_) => {}
  }

  let output = JsonOutput::stdout(args.precision);
  dispatcher.process_into(&args.content_type, &content, &output)?;
  info!("处理完成");

  Ok(ExitCode::SUCCESS)
}
