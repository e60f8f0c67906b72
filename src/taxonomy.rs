// 该文件是 Shanan （山南西风） 项目的一部分。
// src/taxonomy.rs - 类别表
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

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// 联合类别表中主体（人）的类别编号
pub const SUBJECT_CLASS_ID: u32 = 0;

/// 随仓库发布的类别表文件，与内置类别表保持一致
pub const PPE_LABELS_TOML: &str = include_str!("../labels/ppe.toml");

const PPE_CLASS_NAMES: [&str; 10] = [
  "person",
  "hard-hat",
  "gloves",
  "mask",
  "glasses",
  "boots",
  "vest",
  "ppe-suit",
  "ear-protector",
  "safety-harness",
];

#[derive(Error, Debug)]
pub enum TaxonomyError {
  #[error("类别表为空")]
  Empty,
  #[error("类别名称重复: {0}")]
  DuplicateName(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别表解析错误: {0}")]
  ParseError(#[from] toml::de::Error),
}

#[derive(Deserialize)]
struct TaxonomyFile {
  names: Vec<String>,
}

/// 联合类别表，下标即类别编号，主体固定在 0 号，其余为物品类别
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
  names: Vec<String>,
}

impl Default for Taxonomy {
  fn default() -> Self {
    Self::ppe()
  }
}

impl Taxonomy {
  pub fn new<I, S>(names: I) -> Result<Self, TaxonomyError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
      return Err(TaxonomyError::Empty);
    }

    let mut seen = HashSet::new();
    for name in &names {
      if !seen.insert(name.as_str()) {
        return Err(TaxonomyError::DuplicateName(name.clone()));
      }
    }

    Ok(Self { names })
  }

  /// 内置的人员防护装备类别表
  pub fn ppe() -> Self {
    Self {
      names: PPE_CLASS_NAMES.iter().map(|name| name.to_string()).collect(),
    }
  }

  /// 从 TOML 文本读取，格式为 `names = ["person", ...]`
  pub fn from_toml_str(text: &str) -> Result<Self, TaxonomyError> {
    let file: TaxonomyFile = toml::from_str(text)?;
    Self::new(file.names)
  }

  pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, TaxonomyError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_toml_str(&text)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn contains(&self, class_id: u32) -> bool {
    (class_id as usize) < self.names.len()
  }

  pub fn class_name(&self, class_id: u32) -> Option<&str> {
    self.names.get(class_id as usize).map(String::as_str)
  }

  pub fn subject_name(&self) -> &str {
    &self.names[SUBJECT_CLASS_ID as usize]
  }

  pub fn is_subject(&self, class_id: u32) -> bool {
    class_id == SUBJECT_CLASS_ID
  }

  /// 物品类别表（去掉主体后的类别）
  pub fn item_names(&self) -> &[String] {
    &self.names[1..]
  }

  /// 按物品类别表中的编号查找名称
  pub fn item_class_name(&self, item_class_id: u32) -> Option<&str> {
    self.item_names().get(item_class_id as usize).map(String::as_str)
  }

  /// 联合类别编号 → 物品类别编号，最小为 0
  pub fn to_item_class(class_id: u32) -> u32 {
    class_id.saturating_sub(1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_taxonomy_puts_subject_first() {
    let taxonomy = Taxonomy::ppe();
    assert_eq!(taxonomy.len(), 10);
    assert_eq!(taxonomy.subject_name(), "person");
    assert!(taxonomy.is_subject(0));
    assert!(!taxonomy.is_subject(1));
    assert_eq!(taxonomy.item_names().len(), 9);
    assert_eq!(taxonomy.item_class_name(0), Some("hard-hat"));
    assert_eq!(taxonomy.item_class_name(8), Some("safety-harness"));
    assert_eq!(taxonomy.item_class_name(9), None);
  }

  #[test]
  fn bundled_label_file_matches_builtin_taxonomy() {
    assert_eq!(Taxonomy::from_toml_str(PPE_LABELS_TOML).unwrap(), Taxonomy::ppe());
  }

  #[test]
  fn item_class_shift_floors_at_zero() {
    assert_eq!(Taxonomy::to_item_class(3), 2);
    assert_eq!(Taxonomy::to_item_class(1), 0);
    assert_eq!(Taxonomy::to_item_class(0), 0);
  }

  #[test]
  fn loads_from_toml() {
    let taxonomy = Taxonomy::from_toml_str(r#"names = ["worker", "helmet", "vest"]"#).unwrap();
    assert_eq!(taxonomy.subject_name(), "worker");
    assert_eq!(taxonomy.class_name(2), Some("vest"));
    assert!(taxonomy.contains(2));
    assert!(!taxonomy.contains(3));
  }

  #[test]
  fn rejects_empty_and_duplicate_names() {
    assert!(matches!(
      Taxonomy::from_toml_str("names = []"),
      Err(TaxonomyError::Empty)
    ));
    assert!(matches!(
      Taxonomy::new(["person", "mask", "mask"]),
      Err(TaxonomyError::DuplicateName(name)) if name == "mask"
    ));
    assert!(matches!(
      Taxonomy::from_toml_str("labels = 3"),
      Err(TaxonomyError::ParseError(_))
    ));
  }
}
