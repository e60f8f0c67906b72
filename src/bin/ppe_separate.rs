// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/ppe_separate.rs - 拆分人员/防护装备数据集
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use shanan_ppe::{partition::DatasetPartitioner, taxonomy::Taxonomy};

/// 数据集拆分参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入数据集目录，包含 images/ 与 labels/
  pub input_dir: PathBuf,
  /// 人员检测数据集输出目录
  pub person_output_dir: PathBuf,
  /// 防护装备检测数据集输出目录
  pub ppe_output_dir: PathBuf,

  /// 联合类别表 TOML 文件，缺省使用内置的防护装备类别表
  #[arg(long, value_name = "TOML")]
  pub labels: Option<PathBuf>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let taxonomy = match &args.labels {
    Some(path) => Taxonomy::from_toml_file(path)?,
    None => Taxonomy::default(),
  };
  info!("主体类别: {}", taxonomy.subject_name());

  let summary = DatasetPartitioner::new(&args.input_dir, &args.person_output_dir, &args.ppe_output_dir)
    .with_taxonomy(taxonomy)
    .run()?;

  info!(
    "已写出 {} 个人员样本, {} 个防护装备样本",
    summary.subject_samples, summary.item_samples
  );

  Ok(())
}
