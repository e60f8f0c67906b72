// 该文件是 Shanan （山南西风） 项目的一部分。
// src/geometry.rs - 坐标系与边框运算
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

//! 帧坐标系与边框。
//!
//! 每个边框都和它所在的帧绑定在一起（[`FramedBox<K>`]），帧的种类由类型参数
//! 区分：[`Global`] 表示原始整图，[`Crop`] 表示整图中某个主体的裁剪区域。
//! 两种坐标系之间只能通过 [`FramedBox::to_crop`] 和 [`FramedBox::to_global`]
//! 转换，转换结果总是重新裁剪到目标帧内。

use std::fmt::Debug;
use std::marker::PhantomData;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
  #[error("帧尺寸无效: {width}x{height}")]
  InvalidFrameSize { width: u32, height: u32 },
}

/// 帧的宽高，两者均大于 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
  width: u32,
  height: u32,
}

impl FrameSize {
  pub fn new(width: u32, height: u32) -> Result<Self, GeometryError> {
    if width == 0 || height == 0 {
      return Err(GeometryError::InvalidFrameSize { width, height });
    }
    Ok(Self { width, height })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }
}

pub trait FrameKind: Debug + Clone + Copy + PartialEq + Eq {}

/// 原始整图坐标系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Global;

/// 裁剪区域坐标系，原点位于裁剪区域在整图中的左上角
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop;

impl FrameKind for Global {}
impl FrameKind for Crop {}

/// 帧描述：尺寸、在整图中的原点以及所属整图的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<K> {
  size: FrameSize,
  origin: (i32, i32),
  parent: FrameSize,
  _kind: PhantomData<K>,
}

impl Frame<Global> {
  pub fn global(size: FrameSize) -> Self {
    Self {
      size,
      origin: (0, 0),
      parent: size,
      _kind: PhantomData,
    }
  }
}

impl Frame<Crop> {
  /// 裁剪区域左上角在整图中的坐标
  pub fn origin(&self) -> (i32, i32) {
    self.origin
  }

  /// 裁剪区域所属的整图
  pub fn parent(&self) -> Frame<Global> {
    Frame::global(self.parent)
  }
}

impl<K: FrameKind> Frame<K> {
  pub fn size(&self) -> FrameSize {
    self.size
  }

  pub fn width(&self) -> u32 {
    self.size.width
  }

  pub fn height(&self) -> u32 {
    self.size.height
  }

  /// 将边框裁剪到 `[0, width] × [0, height]`。
  ///
  /// 倒置的边框（max < min）会被压缩为零宽或零高。
  pub fn clamp(&self, rect: Rect) -> Rect {
    let width = extent(self.size.width);
    let height = extent(self.size.height);

    let x_min = rect.x_min.clamp(0, width);
    let y_min = rect.y_min.clamp(0, height);
    let x_max = rect.x_max.clamp(x_min, width);
    let y_max = rect.y_max.clamp(y_min, height);

    Rect::new(x_min, y_min, x_max, y_max)
  }
}

fn extent(value: u32) -> i32 {
  i32::try_from(value).unwrap_or(i32::MAX)
}

/// 像素坐标下的边框 `[x_min, y_min, x_max, y_max]`，不带任何坐标系信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
  pub x_min: i32,
  pub y_min: i32,
  pub x_max: i32,
  pub y_max: i32,
}

impl Rect {
  pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
    Self {
      x_min,
      y_min,
      x_max,
      y_max,
    }
  }

  /// 由检测器输出的浮点坐标构造，小数部分向零截断
  pub fn from_xyxy(bbox: [f32; 4]) -> Self {
    Self::new(
      bbox[0] as i32,
      bbox[1] as i32,
      bbox[2] as i32,
      bbox[3] as i32,
    )
  }

  pub fn width(&self) -> i64 {
    self.x_max as i64 - self.x_min as i64
  }

  pub fn height(&self) -> i64 {
    self.y_max as i64 - self.y_min as i64
  }

  pub fn area(&self) -> i64 {
    self.width().max(0) * self.height().max(0)
  }

  pub fn translate(&self, dx: i32, dy: i32) -> Self {
    Self::new(
      self.x_min.saturating_add(dx),
      self.y_min.saturating_add(dy),
      self.x_max.saturating_add(dx),
      self.y_max.saturating_add(dy),
    )
  }

  pub fn intersection_area(&self, other: &Rect) -> i64 {
    let x_min = self.x_min.max(other.x_min) as i64;
    let y_min = self.y_min.max(other.y_min) as i64;
    let x_max = self.x_max.min(other.x_max) as i64;
    let y_max = self.y_max.min(other.y_max) as i64;

    (x_max - x_min).max(0) * (y_max - y_min).max(0)
  }

  pub fn iou(&self, other: &Rect) -> f64 {
    let intersection = self.intersection_area(other);
    let union = self.area() + other.area() - intersection;
    if union > 0 {
      intersection as f64 / union as f64
    } else {
      0.0
    }
  }

  /// 两个边框是否有正面积的重叠。
  ///
  /// 等价于 `iou > 0`，只共享一条边的边框不算重叠。
  pub fn overlaps(&self, other: &Rect) -> bool {
    self.iou(other) > 0.0
  }
}

/// 与所在帧绑定的带类别边框，坐标总在帧的范围内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramedBox<K> {
  class_id: u32,
  rect: Rect,
  frame: Frame<K>,
}

impl<K: FrameKind> FramedBox<K> {
  pub fn clamped(class_id: u32, rect: Rect, frame: Frame<K>) -> Self {
    Self {
      class_id,
      rect: frame.clamp(rect),
      frame,
    }
  }

  pub fn class_id(&self) -> u32 {
    self.class_id
  }

  pub fn rect(&self) -> Rect {
    self.rect
  }

  pub fn frame(&self) -> Frame<K> {
    self.frame
  }

  pub fn width(&self) -> u32 {
    self.rect.width() as u32
  }

  pub fn height(&self) -> u32 {
    self.rect.height() as u32
  }

  pub fn is_degenerate(&self) -> bool {
    self.rect.area() == 0
  }

  pub fn with_class_id(self, class_id: u32) -> Self {
    Self { class_id, ..self }
  }
}

impl FramedBox<Global> {
  /// 以该边框为范围的裁剪帧；零宽或零高时返回 `None`
  pub fn crop_frame(&self) -> Option<Frame<Crop>> {
    let size = FrameSize::new(self.width(), self.height()).ok()?;
    Some(Frame {
      size,
      origin: (self.rect.x_min, self.rect.y_min),
      parent: self.frame.size,
      _kind: PhantomData,
    })
  }

  /// 整图坐标 → 裁剪区域坐标，超出裁剪区域的部分被截掉
  pub fn to_crop(&self, crop: &Frame<Crop>) -> FramedBox<Crop> {
    debug_assert_eq!(crop.parent, self.frame.size, "裁剪帧不属于该整图");
    let (x, y) = crop.origin;
    FramedBox::clamped(self.class_id, self.rect.translate(-x, -y), *crop)
  }
}

impl FramedBox<Crop> {
  /// 裁剪区域坐标 → 整图坐标
  pub fn to_global(&self) -> FramedBox<Global> {
    let (x, y) = self.frame.origin;
    FramedBox::clamped(
      self.class_id,
      self.rect.translate(x, y),
      self.frame.parent(),
    )
  }
}
