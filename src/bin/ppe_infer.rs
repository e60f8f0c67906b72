// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/ppe_infer.rs - 人员/防护装备级联推理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use shanan_ppe::{
  FromUrl,
  cascade::Cascade,
  input::ImageDirectoryInput,
  model::ExecModel,
  output::{SaveImageFileOutput, draw::Draw},
  task::{BatchTask, Task},
  taxonomy::Taxonomy,
};

/// 级联推理参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像目录（*.jpg, *.jpeg, *.png）
  pub input_dir: PathBuf,
  /// 输出目录，标注后的图像与输入同名
  pub output_dir: PathBuf,

  /// 主体（人员）检测器，例如 exec:///usr/local/bin/detect?arg=person.pt
  #[arg(long, value_name = "MODEL")]
  pub subject_model: Url,
  /// 物品（防护装备）检测器
  #[arg(long, value_name = "MODEL")]
  pub item_model: Url,

  /// 联合类别表 TOML 文件，缺省使用内置的防护装备类别表
  #[arg(long, value_name = "TOML")]
  pub labels: Option<PathBuf>,
  /// 用于绘制类别名称的 TTF 字体
  #[arg(long, value_name = "TTF")]
  pub font: PathBuf,
  /// 同时输出整图坐标系下的物品标注
  #[arg(long)]
  pub record: bool,
  /// 最多处理的图像数量
  #[arg(long, value_name = "COUNT")]
  pub max_images: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入目录: {}", args.input_dir.display());
  info!("输出目录: {}", args.output_dir.display());
  info!("主体检测器: {}", args.subject_model);
  info!("物品检测器: {}", args.item_model);

  let taxonomy = match &args.labels {
    Some(path) => Taxonomy::from_toml_file(path)?,
    None => Taxonomy::default(),
  };
  info!("物品类别: {:?}", taxonomy.item_names());

  // 字体在开始批处理之前加载，失败时直接退出
  let font = Draw::load_font(&args.font)
    .with_context(|| format!("无法加载字体 {}", args.font.display()))?;
  let draw = Draw::default().with_font(font);

  let input = ImageDirectoryInput::open(&args.input_dir)?;
  let cascade = Cascade::new(
    ExecModel::from_url(&args.subject_model)?,
    ExecModel::from_url(&args.item_model)?,
  );
  let output = SaveImageFileOutput::new(&args.output_dir)
    .with_draw(draw)
    .with_taxonomy(taxonomy)
    .with_record(args.record);

  BatchTask::default()
    .with_max_images(args.max_images)
    .with_interrupt(true)
    .run_task(input, cascade, output)?;

  Ok(())
}
