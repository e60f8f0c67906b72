// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/exec.rs - 外部检测程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectItem, DetectResult, Model},
};

#[derive(Error, Debug)]
pub enum ExecModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("检测程序路径为空")]
  EmptyProgram,
  #[error("检测程序路径不是有效的 UTF-8: {0}")]
  InvalidProgram(#[from] std::string::FromUtf8Error),
  #[error("写入临时图像失败: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("启动检测程序失败: {0}")]
  SpawnError(std::io::Error),
  #[error("检测程序退出异常 ({status}): {stderr}")]
  ExitError { status: ExitStatus, stderr: String },
  #[error("检测结果解析失败: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 通过外部程序完成检测。
///
/// 每次推理把图像写成临时 PNG，以 `program [args..] <png>` 的形式调用，
/// 并从标准输出读取 JSON 数组 `[{"class_id", "score", "bbox"}]`。
pub struct ExecModel {
  program: PathBuf,
  args: Vec<String>,
  scratch_dir: PathBuf,
  counter: AtomicU64,
}

impl FromUrlWithScheme for ExecModel {
  const SCHEME: &'static str = "exec";
}

impl FromUrl for ExecModel {
  type Error = ExecModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ExecModelError::SchemeMismatch(format!(
        "期望检测方式 '{}', 实际检测方式 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let program = urlencoding::decode(url.path())?;
    if program.is_empty() {
      return Err(ExecModelError::EmptyProgram);
    }

    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();

    Ok(ExecModel::new(program.into_owned()).with_args(args))
  }
}

impl ExecModel {
  pub fn new<P: Into<PathBuf>>(program: P) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      scratch_dir: std::env::temp_dir(),
      counter: AtomicU64::new(0),
    }
  }

  pub fn with_args(mut self, args: Vec<String>) -> Self {
    self.args = args;
    self
  }

  pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, scratch_dir: P) -> Self {
    self.scratch_dir = scratch_dir.into();
    self
  }

  pub fn program(&self) -> &std::path::Path {
    &self.program
  }

  pub fn args(&self) -> &[String] {
    &self.args
  }

  fn scratch_path(&self) -> PathBuf {
    let n = self.counter.fetch_add(1, Ordering::Relaxed);
    self
      .scratch_dir
      .join(format!("shanan-ppe-{}-{}.png", std::process::id(), n))
  }
}

impl Model for ExecModel {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = ExecModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let path = self.scratch_path();
    input.save_with_format(&path, ImageFormat::Png)?;

    let output = Command::new(&self.program)
      .args(&self.args)
      .arg(&path)
      .output();

    if let Err(e) = std::fs::remove_file(&path) {
      warn!("删除临时图像 {} 失败: {}", path.display(), e);
    }

    let output = output.map_err(ExecModelError::SpawnError)?;
    if !output.status.success() {
      return Err(ExecModelError::ExitError {
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    let items: Vec<DetectItem> = serde_json::from_slice(&output.stdout)?;
    debug!(
      "{} 在 {}x{} 图像上检测到 {} 个对象",
      self.program.display(),
      input.width(),
      input.height(),
      items.len()
    );

    Ok(DetectResult::from(items))
  }
}
