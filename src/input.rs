// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像目录输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

use crate::dataset::{DatasetError, SampleName, list_images};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误 {}: {source}", .path.display())]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("图像解码错误 {}: {source}", .path.display())]
  ImageLoadError {
    path: PathBuf,
    source: image::ImageError,
  },
  #[error("无效的图像文件名: {}", .0.display())]
  InvalidName(PathBuf),
  #[error("数据集错误: {0}")]
  DatasetError(#[from] DatasetError),
}

/// 解码后的图像以及它的来源
#[derive(Debug, Clone)]
pub struct LoadedImage {
  pub path: PathBuf,
  pub name: SampleName,
  pub image: RgbImage,
}

pub fn load_image(path: &Path) -> Result<LoadedImage, InputError> {
  let name = SampleName::from_path(path).ok_or_else(|| InputError::InvalidName(path.to_path_buf()))?;
  let io_error = |source| InputError::IoError {
    path: path.to_path_buf(),
    source,
  };
  let image = ImageReader::open(path)
    .map_err(io_error)?
    .with_guessed_format()
    .map_err(io_error)?
    .decode()
    .map_err(|source| InputError::ImageLoadError {
      path: path.to_path_buf(),
      source,
    })?;

  debug!("读取图像 {}: {}x{}", path.display(), image.width(), image.height());

  Ok(LoadedImage {
    path: path.to_path_buf(),
    name,
    image: image.into_rgb8(),
  })
}

/// 逐个解码目录中的图像，解码失败的文件以 `Err` 给出而不中断迭代
pub struct ImageDirectoryInput {
  paths: std::vec::IntoIter<PathBuf>,
}

impl ImageDirectoryInput {
  pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, InputError> {
    let paths = list_images(dir.as_ref())?;
    Ok(Self {
      paths: paths.into_iter(),
    })
  }

  pub fn remaining(&self) -> usize {
    self.paths.len()
  }
}

impl Iterator for ImageDirectoryInput {
  type Item = Result<LoadedImage, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.paths.next().map(|path| load_image(&path))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.paths.size_hint()
  }
}
