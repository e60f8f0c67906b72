// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 图像帧
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

use image::{RgbImage, imageops};

use crate::geometry::{Crop, Frame, FrameSize, GeometryError, Global};

/// 整张图像对应的全局帧
pub fn global_frame(image: &RgbImage) -> Result<Frame<Global>, GeometryError> {
  let (width, height) = image.dimensions();
  Ok(Frame::global(FrameSize::new(width, height)?))
}

/// 按裁剪帧从整图中取出子图，子图尺寸与裁剪帧一致
pub fn crop_image(image: &RgbImage, crop: &Frame<Crop>) -> RgbImage {
  let parent = crop.parent();
  debug_assert_eq!(
    (parent.width(), parent.height()),
    image.dimensions(),
    "裁剪帧不属于该图像"
  );
  let (x, y) = crop.origin();
  imageops::crop_imm(image, x as u32, y as u32, crop.width(), crop.height()).to_image()
}
