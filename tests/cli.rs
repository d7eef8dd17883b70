// 该文件是 Jianshen （鉴审） 项目的一部分。
// tests/cli.rs - 命令行退出码测试
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

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_content_processor"))
    .args(args)
    .output()
    .expect("failed to run content_processor")
}

fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn wrong_argument_count_prints_usage() {
  for args in [
    vec![],
    vec!["image"],
    vec!["image", "aGVsbG8=", "extra"],
  ] {
    let output = run(&args);
    assert_eq!(output.status.code(), Some(1), "args: {:?}", args);
    assert!(stderr(&output).contains("Usage:"), "args: {:?}", args);
    assert!(stdout(&output).is_empty());
  }
}

#[test]
fn invalid_option_keeps_clap_detail() {
  let output = run(&["--precision", "42", "text", "aGVsbG8="]);
  assert_eq!(output.status.code(), Some(1));
  let err = stderr(&output);
  assert!(err.contains("Usage:"));
  assert!(err.contains("--precision"));

  let output = run(&["--log-level", "bogus", "text", "aGVsbG8="]);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("bogus"));
  assert!(stdout(&output).is_empty());
}

#[test]
fn usage_is_checked_before_decoding() {
  let output = run(&["text", "not-base64-###", "extra"]);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Usage:"));
  assert!(!stderr(&output).contains("Invalid base64"));
}

#[test]
fn malformed_base64_is_rejected() {
  let output = run(&["text", "not-base64-###"]);
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Error: Invalid base64 encoded content"));
  assert!(stdout(&output).is_empty());
}

#[test]
fn unsupported_type_exits_cleanly() {
  for content_type in ["video", "VIDEO"] {
    let output = run(&[content_type, "aGVsbG8="]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
      stdout(&output).trim_end(),
      "Invalid content type. Please specify 'image' or 'text'."
    );
  }
}

#[test]
fn missing_model_is_fatal() {
  let dir = tempfile::tempdir().unwrap();
  let url = format!("toxicity://{}", dir.path().display());
  let output = run(&["--toxicity-model", &url, "text", "aGVsbG8="]);
  assert_eq!(output.status.code(), Some(1));
  assert!(stdout(&output).is_empty());
}

#[test]
fn help_exits_successfully() {
  let output = run(&["--help"]);
  assert_eq!(output.status.code(), Some(0));
  assert!(stdout(&output).contains("CONTENT_TYPE"));
}
