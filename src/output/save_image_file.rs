// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  cascade::CascadeResult,
  input::LoadedImage,
  label::{LabelError, LabelRecord, write_label_file},
  output::{Render, draw::Draw},
  taxonomy::Taxonomy,
};

/// 把标注后的整图保存到输出目录，文件名与输入相同。
///
/// 开启 `record` 时，同时写出 `<stem>.txt`：整图坐标系下的物品边框，
/// 类别编号为物品类别表中的编号。
pub struct SaveImageFileOutput {
  directory: PathBuf,
  draw: Draw,
  taxonomy: Taxonomy,
  record: bool,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("标注记录错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("输出路径不是有效的 UTF-8: {0}")]
  InvalidPath(#[from] std::string::FromUtf8Error),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let directory = urlencoding::decode(uri.path())?;
    let record = uri.query_pairs().any(|(k, _)| k == "record");
    Ok(SaveImageFileOutput::new(directory.into_owned()).with_record(record))
  }
}

impl SaveImageFileOutput {
  pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
    Self {
      directory: directory.into(),
      draw: Draw::default(),
      taxonomy: Taxonomy::default(),
      record: false,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
    self.taxonomy = taxonomy;
    self
  }

  pub fn with_record(mut self, record: bool) -> Self {
    self.record = record;
    self
  }

  pub fn directory(&self) -> &std::path::Path {
    &self.directory
  }
}

impl Render<LoadedImage, CascadeResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &LoadedImage, result: &CascadeResult) -> Result<(), Self::Error> {
    std::fs::create_dir_all(&self.directory)?;

    let mut image = frame.image.clone();
    self.draw.draw_items(&mut image, result, &self.taxonomy);

    let path = self.directory.join(frame.name.file_name());
    image.save(&path)?;
    info!("保存图像到文件: {} ({} 个物品)", path.display(), result.item_count());

    if self.record {
      let records: Vec<LabelRecord> = result.items().map(LabelRecord::from_box).collect();
      write_label_file(self.directory.join(frame.name.label_file_name()), &records)?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_directory_and_record_flag() {
    let url = Url::parse("folder:///tmp/out?record").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.directory(), std::path::Path::new("/tmp/out"));
    assert!(output.record);

    let url = Url::parse("image:///tmp/out.png").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn decodes_escaped_directory() {
    let url = Url::parse("folder:///data/巡检 结果").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.directory(), std::path::Path::new("/data/巡检 结果"));
  }
}
