// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use thiserror::Error;
use tracing::debug;

use crate::{
  cascade::CascadeResult,
  geometry::{FramedBox, Global},
  taxonomy::Taxonomy,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_OFFSET: i32 = 10; // 文字底部到边框上沿的距离
const BOX_THICKNESS: u32 = 2;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("读取字体文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  label_offset: i32,
  thickness: u32,
  color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_offset: LABEL_OFFSET,
      thickness: BOX_THICKNESS,
      color: BOX_COLOR,
    }
  }
}

impl Draw {
  pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc, DrawError> {
    let data = std::fs::read(path)?;
    Ok(FontArc::try_from_vec(data)?)
  }

  /// 设置绘制类别名称的字体，没有字体时只画边框
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn draw_box_with_label(&self, image: &mut RgbImage, framed: &FramedBox<Global>, label: &str) {
    let rect = framed.rect();
    let color = Rgb(self.color);

    for t in 0..self.thickness {
      let inset = t as i32;
      let width = framed.width().saturating_sub(2 * t);
      let height = framed.height().saturating_sub(2 * t);
      if width == 0 || height == 0 {
        break;
      }
      let outline = imageproc::rect::Rect::at(rect.x_min + inset, rect.y_min + inset).of_size(width, height);
      draw_hollow_rect_mut(image, outline, color);
    }

    if let Some(font) = &self.font {
      let text_y = (rect.y_min - self.label_offset - self.font_size as i32).max(0);
      draw_text_mut(
        image,
        color,
        rect.x_min,
        text_y,
        PxScale::from(self.font_size),
        font,
        label,
      );
    }
  }

  /// 在整图上绘制所有物品，类别名按物品类别表解析
  pub fn draw_items(&self, image: &mut RgbImage, result: &CascadeResult, taxonomy: &Taxonomy) {
    debug_assert_eq!(
      (result.frame().width(), result.frame().height()),
      image.dimensions(),
      "检测结果与图像尺寸不一致"
    );

    for item in result.items() {
      if item.is_degenerate() {
        debug!("物品边框面积为 0, 不绘制: {:?}", item.rect());
        continue;
      }
      let label = match taxonomy.item_class_name(item.class_id()) {
        Some(name) => name.to_string(),
        None => format!("class {}", item.class_id()),
      };
      self.draw_box_with_label(image, item, &label);
    }
  }
}
