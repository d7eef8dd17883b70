// 该文件是 Jianshen （鉴审） 项目的一部分。
// src/output.rs - 输出定义
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

use std::{io::Write, sync::Mutex};

use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;
use tracing::debug;

use crate::{
  dispatch::{Outcome, ScoreReport},
  model::ScoreResult,
};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

pub const UNSUPPORTED_MESSAGE: &str = "Invalid content type. Please specify 'image' or 'text'.";

pub const DEFAULT_PRECISION: u32 = 6;
pub const MAX_PRECISION: u32 = 10;

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出锁已失效")]
  Poisoned,
}

/// 每条结果输出一行 JSON，分数保留固定小数位
pub struct JsonOutput<W: Write> {
  writer: Mutex<W>,
  precision: u32,
}

impl JsonOutput<std::io::Stdout> {
  pub fn stdout(precision: u32) -> Self {
    Self::new(std::io::stdout(), precision)
  }
}

impl<W: Write> JsonOutput<W> {
  pub fn new(writer: W, precision: u32) -> Self {
    Self {
      writer: Mutex::new(writer),
      precision: precision.min(MAX_PRECISION),
    }
  }

  pub fn into_inner(self) -> Result<W, OutputError> {
    self.writer.into_inner().map_err(|_| OutputError::Poisoned)
  }

  pub fn format_outcome(&self, outcome: &Outcome) -> Result<String, OutputError> {
    match outcome {
      Outcome::Unsupported(_) => Ok(UNSUPPORTED_MESSAGE.to_string()),
      Outcome::Scored(report) => {
        let line = ReportLine::new(report, self.precision);
        Ok(serde_json::to_string(&line)?)
      }
    }
  }
}

impl<W: Write> Render<Outcome> for JsonOutput<W> {
  type Error = OutputError;

  fn render_result(&self, result: &Outcome) -> Result<(), Self::Error> {
    let line = self.format_outcome(result)?;
    debug!("输出结果: {} 字节", line.len());
    let mut writer = self.writer.lock().map_err(|_| OutputError::Poisoned)?;
    writeln!(writer, "{}", line)?;
    writer.flush()?;
    Ok(())
  }
}

pub fn round_score(score: f32, precision: u32) -> f64 {
  let factor = 10f64.powi(precision as i32);
  (score as f64 * factor).round() / factor
}

#[derive(Serialize)]
struct ReportLine<'a> {
  content_type: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  text: Option<&'a str>,
  scores: RoundedScores<'a>,
}

impl<'a> ReportLine<'a> {
  fn new(report: &'a ScoreReport, precision: u32) -> Self {
    let text = match report {
      ScoreReport::Image(_) => None,
      ScoreReport::Text(score) => Some(score.text.as_str()),
    };
    Self {
      content_type: report.content_type().as_str(),
      text,
      scores: RoundedScores {
        scores: report.scores(),
        precision,
      },
    }
  }
}

struct RoundedScores<'a> {
  scores: &'a ScoreResult,
  precision: u32,
}

impl Serialize for RoundedScores<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.scores.len()))?;
    for (label, score) in self.scores.iter() {
      map.serialize_entry(label, &round_score(score, self.precision))?;
    }
    map.end()
  }
}
