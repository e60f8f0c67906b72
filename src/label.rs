// 该文件是 Shanan （山南西风） 项目的一部分。
// src/label.rs - 归一化标注文件读写
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

//! 标注文件每行一个边框：`class_id center_x center_y width height`，
//! 四个几何量都按该文件对应图像自身的宽高归一化。

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::geometry::{Frame, FrameKind, FramedBox, Rect};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("第 {line} 行格式错误 ({reason}): {content:?}")]
  Malformed {
    line: usize,
    content: String,
    reason: &'static str,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 一条归一化标注记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelRecord {
  pub class_id: u32,
  pub center_x: f64,
  pub center_y: f64,
  pub width: f64,
  pub height: f64,
}

impl fmt::Display for LabelRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} {} {} {} {}",
      self.class_id, self.center_x, self.center_y, self.width, self.height
    )
  }
}

impl LabelRecord {
  /// 按边框所在帧的宽高归一化
  pub fn from_box<K: FrameKind>(framed: &FramedBox<K>) -> Self {
    let rect = framed.rect();
    let width = framed.frame().width() as f64;
    let height = framed.frame().height() as f64;

    Self {
      class_id: framed.class_id(),
      center_x: (rect.x_min as f64 + rect.x_max as f64) / (2.0 * width),
      center_y: (rect.y_min as f64 + rect.y_max as f64) / (2.0 * height),
      width: (rect.x_max as f64 - rect.x_min as f64) / width,
      height: (rect.y_max as f64 - rect.y_min as f64) / height,
    }
  }

  /// 还原为 `frame` 中的像素边框，四舍五入到整数像素后裁剪到帧内
  pub fn to_box<K: FrameKind>(&self, frame: Frame<K>) -> FramedBox<K> {
    let width = frame.width() as f64;
    let height = frame.height() as f64;
    let half_w = self.width / 2.0;
    let half_h = self.height / 2.0;

    let rect = Rect::new(
      ((self.center_x - half_w) * width).round() as i32,
      ((self.center_y - half_h) * height).round() as i32,
      ((self.center_x + half_w) * width).round() as i32,
      ((self.center_y + half_h) * height).round() as i32,
    );
    FramedBox::clamped(self.class_id, rect, frame)
  }

  fn parse_line(line: usize, content: &str) -> Result<Self, LabelError> {
    let malformed = |reason| LabelError::Malformed {
      line,
      content: content.to_string(),
      reason,
    };

    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() != 5 {
      return Err(malformed("字段数量不是 5"));
    }

    let class_id = parse_class_id(fields[0]).ok_or_else(|| malformed("类别编号无效"))?;
    let mut values = [0.0f64; 4];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
      *value = field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed("坐标无效"))?;
    }

    Ok(Self {
      class_id,
      center_x: values[0],
      center_y: values[1],
      width: values[2],
      height: values[3],
    })
  }
}

// 兼容 "1.0" 这类写法
fn parse_class_id(field: &str) -> Option<u32> {
  if let Ok(id) = field.parse::<u32>() {
    return Some(id);
  }
  let value = field.parse::<f64>().ok()?;
  (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64)
    .then_some(value as u32)
}

/// 解析标注文本，空行被忽略，任何一行格式错误都使整个文件失败
pub fn parse_labels(text: &str) -> Result<Vec<LabelRecord>, LabelError> {
  text
    .lines()
    .enumerate()
    .filter(|(_, content)| !content.trim().is_empty())
    .map(|(index, content)| LabelRecord::parse_line(index + 1, content))
    .collect()
}

pub fn format_labels(records: &[LabelRecord]) -> String {
  records
    .iter()
    .map(|record| format!("{}\n", record))
    .collect()
}

pub fn read_label_file<P: AsRef<Path>>(path: P) -> Result<Vec<LabelRecord>, LabelError> {
  let text = std::fs::read_to_string(path)?;
  parse_labels(&text)
}

pub fn write_label_file<P: AsRef<Path>>(path: P, records: &[LabelRecord]) -> Result<(), LabelError> {
  std::fs::write(path, format_labels(records))?;
  Ok(())
}
