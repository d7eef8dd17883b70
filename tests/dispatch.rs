// 该文件是 Jianshen （鉴审） 项目的一部分。
// tests/dispatch.rs - 分发流程测试
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

use std::io::Cursor;

use content_processor::{
  content::{decode_payload, encode_payload},
  dispatch::{
    DispatchError, Dispatcher, ImageScorer, Outcome, ScoreError, ScoreReport, TextScore,
    TextScorer,
  },
  frame::ClipFrame,
  model::{DETOXIFY_ORIGINAL_LABELS, ScoreResult, sigmoid, softmax},
  output::{JsonOutput, UNSUPPORTED_MESSAGE},
  prompt::PromptSet,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// 用像素均值代替模型 logits 的图像评分器
struct MeanColorScorer {
  prompts: PromptSet,
}

impl ImageScorer for MeanColorScorer {
  fn score_image(&self, bytes: &[u8]) -> Result<ScoreResult, ScoreError> {
    let image = image::load_from_memory(bytes)?;
    let frame = ClipFrame::from(&image);
    let mean = frame.as_nchw().iter().sum::<f32>() / frame.as_nchw().len() as f32;
    let logits: Vec<f32> = (0..self.prompts.len()).map(|i| mean * i as f32).collect();
    Ok(
      self
        .prompts
        .labels()
        .into_iter()
        .zip(softmax(&logits))
        .collect(),
    )
  }
}

/// 按文本长度给出固定类别分数的文本评分器
struct LengthScorer;

impl TextScorer for LengthScorer {
  fn score_text(&self, bytes: &[u8]) -> Result<TextScore, ScoreError> {
    let text = std::str::from_utf8(bytes)?;
    let scores = DETOXIFY_ORIGINAL_LABELS
      .iter()
      .enumerate()
      .map(|(i, label)| (*label, sigmoid(text.len() as f32 - i as f32)))
      .collect();
    Ok(TextScore {
      text: text.to_string(),
      scores,
    })
  }
}

fn png_fixture() -> Vec<u8> {
  let image = RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 200]));
  let mut buffer = Cursor::new(Vec::new());
  DynamicImage::ImageRgb8(image)
    .write_to(&mut buffer, ImageFormat::Png)
    .unwrap();
  buffer.into_inner()
}

fn dispatcher(prompts: PromptSet) -> Dispatcher<MeanColorScorer, LengthScorer> {
  Dispatcher::new()
    .with_image_scorer(MeanColorScorer { prompts })
    .with_text_scorer(LengthScorer)
}

#[test]
fn base64_round_trip_of_image_fixture() {
  let fixture = png_fixture();
  let encoded = encode_payload(&fixture);
  let decoded = decode_payload(&encoded).unwrap();
  assert_eq!(decoded, fixture);
  assert_eq!(encode_payload(&decoded), encoded);
}

#[test]
fn image_scores_form_a_distribution_over_prompts() {
  for prompts in [
    PromptSet::basic(),
    PromptSet::moderation(),
    PromptSet::placeholder(),
  ] {
    let d = dispatcher(prompts.clone());
    let outcome = d.process("image", &png_fixture()).unwrap();
    let Outcome::Scored(ScoreReport::Image(scores)) = outcome else {
      panic!("expected image scores");
    };
    assert_eq!(scores.labels(), prompts.labels());
    assert!((scores.total() - 1.0).abs() < 1e-4);
    for (_, p) in scores.iter() {
      assert!((0.0..=1.0).contains(&p));
    }
  }
}

#[test]
fn image_type_is_case_insensitive() {
  let d = dispatcher(PromptSet::basic());
  let content = png_fixture();
  let lower = d.process("image", &content).unwrap();
  let upper = d.process("IMAGE", &content).unwrap();
  assert_eq!(lower, upper);
}

#[test]
fn text_scores_use_fixed_categories() {
  let d = dispatcher(PromptSet::basic());
  let Outcome::Scored(ScoreReport::Text(score)) = d.process("text", b"hello there").unwrap()
  else {
    panic!("expected text scores");
  };
  assert_eq!(score.text, "hello there");
  assert_eq!(score.scores.labels(), DETOXIFY_ORIGINAL_LABELS.to_vec());
  for (_, p) in score.scores.iter() {
    assert!((0.0..=1.0).contains(&p));
  }
}

#[test]
fn non_image_bytes_fail_to_decode() {
  let d = dispatcher(PromptSet::basic());
  let err = d.process("image", b"definitely not an image").unwrap_err();
  assert!(matches!(err, DispatchError::Score(ScoreError::ImageDecode(_))));
}

#[test]
fn unsupported_type_renders_diagnostic() {
  let d = dispatcher(PromptSet::basic());
  let output = JsonOutput::new(Vec::new(), 6);
  let outcome = d.process_into("video", b"abc", &output).unwrap();
  assert_eq!(outcome, Outcome::Unsupported("video".to_string()));
  let written = String::from_utf8(output.into_inner().unwrap()).unwrap();
  assert_eq!(written.trim_end(), UNSUPPORTED_MESSAGE);
}

#[test]
fn rendered_image_line_is_json() {
  let d = dispatcher(PromptSet::basic());
  let output = JsonOutput::new(Vec::new(), 6);
  d.process_into("Image", &png_fixture(), &output).unwrap();
  let written = String::from_utf8(output.into_inner().unwrap()).unwrap();
  let value: serde_json::Value = serde_json::from_str(written.trim_end()).unwrap();
  assert_eq!(value["content_type"], "image");
  let scores = value["scores"].as_object().unwrap();
  assert_eq!(scores.len(), 4);
  let total: f64 = scores.values().map(|v| v.as_f64().unwrap()).sum();
  assert!((total - 1.0).abs() < 1e-4);
}
