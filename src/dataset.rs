// 该文件是 Shanan （山南西风） 项目的一部分。
// src/dataset.rs - 数据集目录布局
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

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";
pub const LABEL_EXTENSION: &str = "txt";

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("无法读取目录 {}: {source}", .path.display())]
  ReadDir {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("无法创建目录 {}: {source}", .path.display())]
  CreateDir {
    path: PathBuf,
    source: std::io::Error,
  },
}

pub fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
    })
    .unwrap_or(false)
}

/// 列出目录中的图像文件，按文件名排序
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
  let read_dir_error = |source| DatasetError::ReadDir {
    path: dir.to_path_buf(),
    source,
  };

  let mut images = Vec::new();
  for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
    let path = entry.map_err(read_dir_error)?.path();
    if path.is_file() && is_image_file(&path) {
      images.push(path);
    }
  }
  images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
  Ok(images)
}

pub fn create_dir(path: &Path) -> Result<(), DatasetError> {
  std::fs::create_dir_all(path).map_err(|source| DatasetError::CreateDir {
    path: path.to_path_buf(),
    source,
  })
}

/// 样本名：文件名主干与扩展名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleName {
  stem: String,
  extension: Option<String>,
}

impl SampleName {
  pub fn from_path(path: &Path) -> Option<Self> {
    let stem = path.file_stem()?.to_str()?.to_string();
    let extension = path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(str::to_string);
    Some(Self { stem, extension })
  }

  pub fn stem(&self) -> &str {
    &self.stem
  }

  pub fn file_name(&self) -> String {
    match &self.extension {
      Some(ext) => format!("{}.{}", self.stem, ext),
      None => self.stem.clone(),
    }
  }

  pub fn label_file_name(&self) -> String {
    format!("{}.{}", self.stem, LABEL_EXTENSION)
  }

  /// 第 `index` 个主体裁剪出的样本名，形如 `{stem}_{index}.{ext}`
  pub fn crop(&self, index: usize) -> Self {
    Self {
      stem: format!("{}_{}", self.stem, index),
      extension: self.extension.clone(),
    }
  }
}

/// 含 `images/` 与 `labels/` 两个子目录的数据集
#[derive(Debug, Clone)]
pub struct DatasetDir {
  root: PathBuf,
}

impl DatasetDir {
  pub fn new<P: Into<PathBuf>>(root: P) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn images_dir(&self) -> PathBuf {
    self.root.join(IMAGES_DIR)
  }

  pub fn labels_dir(&self) -> PathBuf {
    self.root.join(LABELS_DIR)
  }

  pub fn create(&self) -> Result<(), DatasetError> {
    create_dir(&self.images_dir())?;
    create_dir(&self.labels_dir())
  }

  pub fn image_path(&self, name: &SampleName) -> PathBuf {
    self.images_dir().join(name.file_name())
  }

  pub fn label_path(&self, name: &SampleName) -> PathBuf {
    self.labels_dir().join(name.label_file_name())
  }

  pub fn list_images(&self) -> Result<Vec<PathBuf>, DatasetError> {
    list_images(&self.images_dir())
  }
}
