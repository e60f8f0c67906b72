// 该文件是 Shanan （山南西风） 项目的一部分。
// src/partition.rs - 联合标注数据集拆分
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

//! 把同时标注了主体与物品的数据集拆成两个数据集：
//!
//! - 主体数据集：原图 + 仅含主体的标注（整图坐标系，只有一个类别）；
//! - 物品数据集：每个主体的裁剪图 + 与之重叠的物品标注（裁剪坐标系，
//!   类别编号减一）。
//!
//! 不与任何主体重叠的物品不会出现在任何输出中。

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  dataset::{DatasetDir, DatasetError, SampleName},
  frame::{crop_image, global_frame},
  geometry::{Crop, Frame, FramedBox, GeometryError, Global},
  input::{InputError, LoadedImage, load_image},
  label::{LabelError, LabelRecord, read_label_file, write_label_file},
  taxonomy::{SUBJECT_CLASS_ID, Taxonomy},
};

#[derive(Error, Debug)]
pub enum PartitionError {
  #[error("数据集错误: {0}")]
  DatasetError(#[from] DatasetError),
  #[error("输入错误: {0}")]
  InputError(#[from] InputError),
  #[error("标注文件 {} 错误: {source}", .path.display())]
  LabelError {
    path: PathBuf,
    #[source]
    source: LabelError,
  },
  #[error("标注文件 {} 中的类别编号 {class_id} 不在类别表中", .path.display())]
  UnknownClass { path: PathBuf, class_id: u32 },
  #[error("图像尺寸无效: {0}")]
  GeometryError(#[from] GeometryError),
  #[error("保存图像 {} 失败: {source}", .path.display())]
  SaveImageError {
    path: PathBuf,
    source: image::ImageError,
  },
}

/// 一个主体裁剪出的物品样本
#[derive(Debug, Clone, PartialEq)]
pub struct CropSample {
  /// 主体在该图所有主体中的序号
  pub index: usize,
  pub frame: Frame<Crop>,
  /// 裁剪坐标系下的物品，类别编号为物品类别表中的编号
  pub items: Vec<FramedBox<Crop>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartitionedSample {
  /// 主体边框，类别编号统一为 0
  pub subjects: Vec<FramedBox<Global>>,
  pub crops: Vec<CropSample>,
  /// 不与任何主体重叠而被丢弃的物品
  pub orphans: Vec<FramedBox<Global>>,
}

/// 按重叠关系把物品归入主体，并转换到各主体的裁剪坐标系
pub fn partition_boxes(boxes: &[FramedBox<Global>], taxonomy: &Taxonomy) -> PartitionedSample {
  let (subjects, others): (Vec<_>, Vec<_>) = boxes
    .iter()
    .copied()
    .partition(|framed| taxonomy.is_subject(framed.class_id()));

  let mut associated = vec![false; others.len()];
  let mut crops = Vec::new();

  for (index, subject) in subjects.iter().enumerate() {
    let Some(crop) = subject.crop_frame() else {
      debug!("第 {} 个主体面积为 0, 不生成物品样本", index);
      continue;
    };

    let mut items = Vec::new();
    for (other, flag) in others.iter().zip(associated.iter_mut()) {
      if subject.rect().overlaps(&other.rect()) {
        *flag = true;
        let item_class = Taxonomy::to_item_class(other.class_id());
        items.push(other.to_crop(&crop).with_class_id(item_class));
      }
    }

    if !items.is_empty() {
      crops.push(CropSample {
        index,
        frame: crop,
        items,
      });
    }
  }

  let orphans = others
    .iter()
    .zip(&associated)
    .filter(|(_, associated)| !**associated)
    .map(|(other, _)| *other)
    .collect();

  PartitionedSample {
    subjects: subjects
      .into_iter()
      .map(|subject| subject.with_class_id(SUBJECT_CLASS_ID))
      .collect(),
    crops,
    orphans,
  }
}

/// 单个样本的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleOutcome {
  pub subject_sample: bool,
  pub item_samples: usize,
  pub orphan_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartitionSummary {
  pub images: usize,
  pub missing_labels: usize,
  pub failed: usize,
  pub subject_samples: usize,
  pub item_samples: usize,
  pub orphan_items: usize,
}

impl PartitionSummary {
  fn record(&mut self, outcome: SampleOutcome) {
    if outcome.subject_sample {
      self.subject_samples += 1;
    }
    self.item_samples += outcome.item_samples;
    self.orphan_items += outcome.orphan_items;
  }
}

pub struct DatasetPartitioner {
  taxonomy: Taxonomy,
  input: DatasetDir,
  subject_output: DatasetDir,
  item_output: DatasetDir,
}

impl DatasetPartitioner {
  pub fn new<P, Q, R>(input: P, subject_output: Q, item_output: R) -> Self
  where
    P: Into<PathBuf>,
    Q: Into<PathBuf>,
    R: Into<PathBuf>,
  {
    Self {
      taxonomy: Taxonomy::default(),
      input: DatasetDir::new(input),
      subject_output: DatasetDir::new(subject_output),
      item_output: DatasetDir::new(item_output),
    }
  }

  pub fn with_taxonomy(mut self, taxonomy: Taxonomy) -> Self {
    self.taxonomy = taxonomy;
    self
  }

  pub fn taxonomy(&self) -> &Taxonomy {
    &self.taxonomy
  }

  /// 处理整个输入数据集；单个样本失败只记录日志，不中断处理
  pub fn run(&self) -> Result<PartitionSummary, PartitionError> {
    self.subject_output.create()?;
    self.item_output.create()?;

    let images = self.input.list_images()?;
    info!("开始拆分数据集 {}: 共 {} 张图像", self.input.root().display(), images.len());

    let mut summary = PartitionSummary::default();
    for path in images {
      summary.images += 1;

      let Some(name) = SampleName::from_path(&path) else {
        warn!("跳过无法识别的文件名: {}", path.display());
        summary.failed += 1;
        continue;
      };

      let label_path = self.input.label_path(&name);
      if !label_path.is_file() {
        debug!("{} 没有标注文件, 跳过", path.display());
        summary.missing_labels += 1;
        continue;
      }

      // 已写出的部分样本同样计入统计
      let mut outcome = SampleOutcome::default();
      let result = self.process_sample(&path, &label_path, &mut outcome);
      summary.record(outcome);
      if let Err(e) = result {
        error!("处理 {} 失败: {}", path.display(), e);
        summary.failed += 1;
      }
    }

    info!(
      "数据集拆分完成: 图像 {}, 主体样本 {}, 物品样本 {}, 丢弃物品 {}, 缺少标注 {}, 失败 {}",
      summary.images,
      summary.subject_samples,
      summary.item_samples,
      summary.orphan_items,
      summary.missing_labels,
      summary.failed
    );

    Ok(summary)
  }

  /// 处理单个样本，`outcome` 随写出进度更新，出错时保留已完成的部分
  pub fn process_sample(
    &self,
    image_path: &Path,
    label_path: &Path,
    outcome: &mut SampleOutcome,
  ) -> Result<(), PartitionError> {
    let loaded = load_image(image_path)?;
    let frame = global_frame(&loaded.image)?;
    let boxes = self.load_boxes(label_path, frame)?;
    let partitioned = partition_boxes(&boxes, &self.taxonomy);

    for orphan in &partitioned.orphans {
      debug!(
        "{} 中的物品 {:?} (类别 {}) 不与任何主体重叠, 已丢弃",
        loaded.name.file_name(),
        orphan.rect(),
        orphan.class_id()
      );
    }

    outcome.orphan_items = partitioned.orphans.len();

    if !partitioned.subjects.is_empty() {
      self.write_subject_sample(&loaded, &partitioned.subjects)?;
      outcome.subject_sample = true;
    }

    for crop in &partitioned.crops {
      self.write_item_sample(&loaded, crop)?;
      outcome.item_samples += 1;
    }

    Ok(())
  }

  fn load_boxes(&self, label_path: &Path, frame: Frame<Global>) -> Result<Vec<FramedBox<Global>>, PartitionError> {
    let records = read_label_file(label_path).map_err(|source| PartitionError::LabelError {
      path: label_path.to_path_buf(),
      source,
    })?;

    records
      .iter()
      .map(|record| {
        if self.taxonomy.contains(record.class_id) {
          Ok(record.to_box(frame))
        } else {
          Err(PartitionError::UnknownClass {
            path: label_path.to_path_buf(),
            class_id: record.class_id,
          })
        }
      })
      .collect()
  }

  fn write_subject_sample(&self, loaded: &LoadedImage, subjects: &[FramedBox<Global>]) -> Result<(), PartitionError> {
    let image_path = self.subject_output.image_path(&loaded.name);
    loaded
      .image
      .save(&image_path)
      .map_err(|source| PartitionError::SaveImageError {
        path: image_path,
        source,
      })?;

    let records: Vec<LabelRecord> = subjects.iter().map(LabelRecord::from_box).collect();
    self.write_labels(&self.subject_output.label_path(&loaded.name), &records)
  }

  fn write_item_sample(&self, loaded: &LoadedImage, crop: &CropSample) -> Result<(), PartitionError> {
    let name = loaded.name.crop(crop.index);
    let image_path = self.item_output.image_path(&name);
    crop_image(&loaded.image, &crop.frame)
      .save(&image_path)
      .map_err(|source| PartitionError::SaveImageError {
        path: image_path,
        source,
      })?;

    let records: Vec<LabelRecord> = crop.items.iter().map(LabelRecord::from_box).collect();
    self.write_labels(&self.item_output.label_path(&name), &records)
  }

  fn write_labels(&self, path: &Path, records: &[LabelRecord]) -> Result<(), PartitionError> {
    write_label_file(path, records).map_err(|source| PartitionError::LabelError {
      path: path.to_path_buf(),
      source,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::{FrameSize, Rect};

  fn global(width: u32, height: u32) -> Frame<Global> {
    Frame::global(FrameSize::new(width, height).unwrap())
  }

  fn framed(class_id: u32, rect: Rect) -> FramedBox<Global> {
    FramedBox::clamped(class_id, rect, global(100, 100))
  }

  #[test]
  fn items_move_into_subject_crop_with_shifted_class() {
    let boxes = [
      framed(0, Rect::new(0, 0, 50, 50)),
      framed(1, Rect::new(10, 10, 30, 30)),
    ];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());

    assert_eq!(sample.subjects.len(), 1);
    assert_eq!(sample.subjects[0].class_id(), 0);
    assert_eq!(sample.crops.len(), 1);

    let crop = &sample.crops[0];
    assert_eq!((crop.frame.width(), crop.frame.height()), (50, 50));
    assert_eq!(crop.items.len(), 1);
    assert_eq!(crop.items[0].class_id(), 0);
    assert_eq!(crop.items[0].rect(), Rect::new(10, 10, 30, 30));
    assert_eq!(
      LabelRecord::from_box(&crop.items[0]).to_string(),
      "0 0.4 0.4 0.4 0.4"
    );
  }

  #[test]
  fn items_extending_past_subject_are_clipped() {
    let boxes = [
      framed(0, Rect::new(20, 20, 60, 80)),
      framed(3, Rect::new(50, 70, 90, 95)),
    ];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());
    let item = sample.crops[0].items[0];
    assert_eq!(item.rect(), Rect::new(30, 50, 40, 60));
    assert_eq!(item.class_id(), 2);
  }

  #[test]
  fn items_are_associated_with_every_overlapping_subject() {
    let boxes = [
      framed(0, Rect::new(0, 0, 50, 100)),
      framed(0, Rect::new(40, 0, 100, 100)),
      framed(6, Rect::new(45, 10, 55, 20)),
      framed(2, Rect::new(70, 70, 80, 80)),
    ];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());

    assert_eq!(sample.crops.len(), 2);
    assert_eq!(sample.crops[0].index, 0);
    assert_eq!(sample.crops[0].items.len(), 1);
    assert_eq!(sample.crops[0].items[0].rect(), Rect::new(45, 10, 50, 20));
    assert_eq!(sample.crops[1].index, 1);
    assert_eq!(sample.crops[1].items.len(), 2);
    assert_eq!(sample.crops[1].items[0].rect(), Rect::new(5, 10, 15, 20));
    assert!(sample.orphans.is_empty());
  }

  #[test]
  fn single_pixel_overlap_associates_but_shared_edge_does_not() {
    let boxes = [
      framed(0, Rect::new(0, 0, 50, 50)),
      framed(4, Rect::new(49, 49, 60, 60)),
      framed(5, Rect::new(50, 0, 70, 50)),
    ];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());

    assert_eq!(sample.crops[0].items.len(), 1);
    assert_eq!(sample.crops[0].items[0].rect(), Rect::new(49, 49, 50, 50));
    assert_eq!(sample.crops[0].items[0].class_id(), 3);
    assert_eq!(sample.orphans, vec![boxes[2]]);
  }

  #[test]
  fn orphan_items_are_dropped_from_item_samples() {
    let boxes = [
      framed(0, Rect::new(0, 0, 30, 30)),
      framed(1, Rect::new(60, 60, 90, 90)),
    ];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());

    assert_eq!(sample.subjects.len(), 1);
    assert!(sample.crops.is_empty());
    assert_eq!(sample.orphans.len(), 1);
  }

  #[test]
  fn subject_indices_stay_stable_across_skipped_subjects() {
    let boxes = [
      framed(0, Rect::new(10, 10, 10, 40)),
      framed(0, Rect::new(50, 50, 90, 90)),
      framed(7, Rect::new(60, 60, 70, 70)),
    ];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());

    assert_eq!(sample.subjects.len(), 2);
    assert_eq!(sample.crops.len(), 1);
    assert_eq!(sample.crops[0].index, 1);
  }

  #[test]
  fn images_without_subjects_produce_nothing() {
    let boxes = [framed(1, Rect::new(10, 10, 20, 20))];
    let sample = partition_boxes(&boxes, &Taxonomy::ppe());
    assert!(sample.subjects.is_empty());
    assert!(sample.crops.is_empty());
    assert_eq!(sample.orphans.len(), 1);

    assert_eq!(partition_boxes(&[], &Taxonomy::ppe()), PartitionedSample::default());
  }
}
