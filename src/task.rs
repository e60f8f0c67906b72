// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 批量推理任务
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

use std::sync::mpsc::Receiver;

use image::RgbImage;
use tracing::{error, info, warn};

use crate::{
  cascade::CascadeResult,
  input::{InputError, LoadedImage},
  model::Model,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CascadeSummary {
  pub processed: usize,
  pub skipped: usize,
  pub failed: usize,
  pub subjects: usize,
  pub items: usize,
}

/// 逐张处理图像：读取 → 级联检测 → 输出。
///
/// 单张图像的解码、推理或输出失败只记录日志并计数，批处理继续。
#[derive(Default, Debug)]
pub struct BatchTask {
  max_images: Option<usize>,
  interrupt: bool,
}

impl BatchTask {
  pub fn with_max_images(mut self, max_images: Option<usize>) -> Self {
    self.max_images = max_images;
    self
  }

  /// 安装 Ctrl-C 处理，收到信号后在当前图像处理完毕时退出
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }

  fn install_interrupt(&self) -> anyhow::Result<Option<Receiver<()>>> {
    if !self.interrupt {
      return Ok(None);
    }

    let (tx, rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，当前图像处理完成后退出...");
      let _ = tx.send(());
    })?;
    Ok(Some(rx))
  }
}

impl<I, M, O, ME, RE> Task<I, M, O> for BatchTask
where
  I: Iterator<Item = Result<LoadedImage, InputError>>,
  M: Model<Input = RgbImage, Output = CascadeResult, Error = ME>,
  O: Render<LoadedImage, CascadeResult, Error = RE>,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Output = CascadeSummary;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let interrupt = self.install_interrupt()?;
    let mut summary = CascadeSummary::default();

    if let Some(n) = self.max_images {
      info!("最多处理 {} 张图像", n);
    }

    // 超出数量的图像不会被读取解码
    for frame in input.take(self.max_images.unwrap_or(usize::MAX)) {
      let frame = match frame {
        Ok(frame) => frame,
        Err(e) => {
          warn!("跳过无法读取的图像: {}", e);
          summary.skipped += 1;
          continue;
        }
      };

      let now = std::time::Instant::now();
      match model.infer(&frame.image) {
        Ok(result) => {
          let elapsed = now.elapsed();
          info!(
            "{}: {} 个主体, {} 个物品, 耗时 {:.2?}",
            frame.name.file_name(),
            result.subjects().len(),
            result.item_count(),
            elapsed
          );
          if let Err(e) = output.render_result(&frame, &result) {
            error!("输出 {} 失败: {}", frame.path.display(), e);
            summary.failed += 1;
          } else {
            summary.processed += 1;
            summary.subjects += result.subjects().len();
            summary.items += result.item_count();
          }
        }
        Err(e) => {
          error!("推理 {} 失败: {}", frame.path.display(), e);
          summary.failed += 1;
        }
      }

      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!(
      "任务完成: 成功 {}, 跳过 {}, 失败 {}, 主体 {}, 物品 {}",
      summary.processed, summary.skipped, summary.failed, summary.subjects, summary.items
    );
    Ok(summary)
  }
}
