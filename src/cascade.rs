// 该文件是 Shanan （山南西风） 项目的一部分。
// src/cascade.rs - 主体/物品两级级联检测
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

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::{crop_image, global_frame},
  geometry::{Frame, FramedBox, GeometryError, Global, Rect},
  model::{DetectResult, Model},
};

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CascadeError {
  #[error("图像尺寸无效: {0}")]
  GeometryError(#[from] GeometryError),
  #[error("主体检测失败: {0}")]
  SubjectModelError(#[source] BoxedError),
  #[error("第 {index} 个主体的物品检测失败: {source}")]
  ItemModelError {
    index: usize,
    #[source]
    source: BoxedError,
  },
}

/// 一个主体及其物品，坐标均在整图坐标系下
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectDetection {
  pub index: usize,
  pub subject: FramedBox<Global>,
  pub items: Vec<FramedBox<Global>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeResult {
  frame: Frame<Global>,
  subjects: Vec<SubjectDetection>,
}

impl CascadeResult {
  pub fn frame(&self) -> Frame<Global> {
    self.frame
  }

  pub fn subjects(&self) -> &[SubjectDetection] {
    &self.subjects
  }

  /// 所有物品边框，类别编号为物品类别表中的编号
  pub fn items(&self) -> impl Iterator<Item = &FramedBox<Global>> {
    self.subjects.iter().flat_map(|s| s.items.iter())
  }

  pub fn item_count(&self) -> usize {
    self.subjects.iter().map(|s| s.items.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.item_count() == 0
  }
}

/// 级联检测：先在整图上检测主体，再在每个主体的裁剪图上检测物品
pub struct Cascade<S, I> {
  subject_model: S,
  item_model: I,
}

impl<S, I> Cascade<S, I> {
  pub fn new(subject_model: S, item_model: I) -> Self {
    Self {
      subject_model,
      item_model,
    }
  }
}

impl<S, I, SE, IE> Model for Cascade<S, I>
where
  S: Model<Input = RgbImage, Output = DetectResult, Error = SE>,
  I: Model<Input = RgbImage, Output = DetectResult, Error = IE>,
  SE: std::error::Error + Send + Sync + 'static,
  IE: std::error::Error + Send + Sync + 'static,
{
  type Input = RgbImage;
  type Output = CascadeResult;
  type Error = CascadeError;

  fn infer(&self, image: &Self::Input) -> Result<Self::Output, Self::Error> {
    let frame = global_frame(image)?;
    let found = self
      .subject_model
      .infer(image)
      .map_err(|e| CascadeError::SubjectModelError(Box::new(e)))?;

    let mut subjects = Vec::with_capacity(found.len());
    for (index, detection) in found.iter().enumerate() {
      let subject = FramedBox::clamped(detection.class_id, Rect::from_xyxy(detection.bbox), frame);
      let Some(crop) = subject.crop_frame() else {
        debug!("第 {} 个主体裁剪后面积为 0, 跳过物品检测: {:?}", index, subject.rect());
        continue;
      };

      let crop_view = crop_image(image, &crop);
      let result = self
        .item_model
        .infer(&crop_view)
        .map_err(|e| CascadeError::ItemModelError {
          index,
          source: Box::new(e),
        })?;

      // 先裁剪到主体区域内，再平移回整图
      let items = result
        .iter()
        .map(|item| FramedBox::clamped(item.class_id, Rect::from_xyxy(item.bbox), crop).to_global())
        .collect::<Vec<_>>();
      debug!("第 {} 个主体检测到 {} 个物品", index, items.len());

      subjects.push(SubjectDetection {
        index,
        subject,
        items,
      });
    }

    Ok(CascadeResult { frame, subjects })
  }
}
