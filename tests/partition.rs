use std::path::Path;

use image::{Rgb, RgbImage};
use shanan_ppe::{
  partition::{DatasetPartitioner, PartitionSummary},
  taxonomy::Taxonomy,
};
use tempfile::TempDir;

fn write_sample(root: &Path, name: &str, image: &RgbImage, labels: Option<&str>) {
  std::fs::create_dir_all(root.join("images")).unwrap();
  std::fs::create_dir_all(root.join("labels")).unwrap();
  image.save(root.join("images").join(format!("{name}.png"))).unwrap();
  if let Some(labels) = labels {
    std::fs::write(root.join("labels").join(format!("{name}.txt")), labels).unwrap();
  }
}

fn gradient(width: u32, height: u32) -> RgbImage {
  RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]))
}

fn read(path: impl AsRef<Path>) -> String {
  std::fs::read_to_string(path).unwrap()
}

struct Workspace {
  _dir: TempDir,
  input: std::path::PathBuf,
  person: std::path::PathBuf,
  ppe: std::path::PathBuf,
}

impl Workspace {
  fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("joint");
    let person = dir.path().join("person");
    let ppe = dir.path().join("ppe");
    Self {
      _dir: dir,
      input,
      person,
      ppe,
    }
  }

  fn partitioner(&self) -> DatasetPartitioner {
    DatasetPartitioner::new(&self.input, &self.person, &self.ppe)
  }
}

#[test]
fn splits_joint_sample_into_subject_and_item_datasets() {
  let ws = Workspace::new();
  write_sample(
    &ws.input,
    "site",
    &gradient(100, 100),
    Some("0 0.25 0.25 0.5 0.5\n1 0.2 0.2 0.2 0.2\n"),
  );

  let summary = ws.partitioner().run().unwrap();
  assert_eq!(
    summary,
    PartitionSummary {
      images: 1,
      missing_labels: 0,
      failed: 0,
      subject_samples: 1,
      item_samples: 1,
      orphan_items: 0,
    }
  );

  assert_eq!(read(ws.person.join("labels/site.txt")), "0 0.25 0.25 0.5 0.5\n");
  let person_image = image::open(ws.person.join("images/site.png")).unwrap().into_rgb8();
  assert_eq!(person_image.dimensions(), (100, 100));

  assert_eq!(read(ws.ppe.join("labels/site_0.txt")), "0 0.4 0.4 0.4 0.4\n");
  let crop = image::open(ws.ppe.join("images/site_0.png")).unwrap().into_rgb8();
  assert_eq!(crop.dimensions(), (50, 50));
  assert_eq!(crop.get_pixel(49, 49), &Rgb([49, 49, 7]));
}

#[test]
fn items_shared_by_subjects_go_to_every_crop() {
  let ws = Workspace::new();
  // 两个主体，一个横跨两者的物品，以及各自独有的物品
  write_sample(
    &ws.input,
    "crew",
    &gradient(200, 100),
    Some(concat!(
      "0 0.25 0.5 0.5 1.0\n",
      "0 0.75 0.5 0.5 1.0\n",
      "6 0.5 0.2 0.1 0.2\n",
      "3 0.9 0.9 0.05 0.1\n",
      "2 0.1 0.8 0.1 0.2\n",
    )),
  );

  let summary = ws.partitioner().run().unwrap();
  assert_eq!(summary.subject_samples, 1);
  assert_eq!(summary.item_samples, 2);
  assert_eq!(summary.orphan_items, 0);

  // 主体 0: 0..100, 物品 vest 90..110 被截为 90..100, gloves 10..30
  assert_eq!(
    read(ws.ppe.join("labels/crew_0.txt")),
    "5 0.95 0.2 0.1 0.2\n1 0.2 0.8 0.2 0.2\n"
  );
  // 主体 1: 100..200, vest 截为 0..10, mask 175..185
  assert_eq!(
    read(ws.ppe.join("labels/crew_1.txt")),
    "5 0.05 0.2 0.1 0.2\n2 0.8 0.9 0.1 0.1\n"
  );
  assert_eq!(
    read(ws.person.join("labels/crew.txt")),
    "0 0.25 0.5 0.5 1\n0 0.75 0.5 0.5 1\n"
  );
}

#[test]
fn items_outside_every_subject_are_silently_dropped() {
  let ws = Workspace::new();
  write_sample(
    &ws.input,
    "lonely",
    &gradient(100, 100),
    Some("0 0.15 0.15 0.3 0.3\n1 0.8 0.8 0.2 0.2\n"),
  );

  let summary = ws.partitioner().run().unwrap();
  assert_eq!(summary.subject_samples, 1);
  assert_eq!(summary.item_samples, 0);
  assert_eq!(summary.orphan_items, 1);
  assert!(ws.person.join("labels/lonely.txt").exists());
  assert_eq!(std::fs::read_dir(ws.ppe.join("labels")).unwrap().count(), 0);
  assert_eq!(std::fs::read_dir(ws.ppe.join("images")).unwrap().count(), 0);
}

#[test]
fn bad_samples_are_skipped_without_stopping_the_batch() {
  let ws = Workspace::new();
  write_sample(&ws.input, "a_nolabel", &gradient(10, 10), None);
  write_sample(&ws.input, "b_malformed", &gradient(10, 10), Some("0 0.5 0.5\n"));
  write_sample(&ws.input, "c_unknown", &gradient(10, 10), Some("42 0.5 0.5 0.2 0.2\n"));
  std::fs::write(ws.input.join("images/d_corrupt.jpg"), b"garbage").unwrap();
  std::fs::write(ws.input.join("labels/d_corrupt.txt"), "0 0.5 0.5 1 1\n").unwrap();
  write_sample(&ws.input, "e_good", &gradient(10, 10), Some("0 0.5 0.5 1 1\n"));

  let summary = ws.partitioner().run().unwrap();
  assert_eq!(summary.images, 5);
  assert_eq!(summary.missing_labels, 1);
  assert_eq!(summary.failed, 3);
  assert_eq!(summary.subject_samples, 1);
  assert!(!ws.person.join("labels/b_malformed.txt").exists());
  assert_eq!(read(ws.person.join("labels/e_good.txt")), "0 0.5 0.5 1 1\n");
}

#[test]
fn rerun_produces_identical_labels() {
  let ws = Workspace::new();
  write_sample(
    &ws.input,
    "yard",
    &gradient(64, 48),
    Some("0 0.3 0.5 0.4 0.9\n4 0.31 0.2 0.1 0.1\n9 0.3 0.6 0.35 0.2\n0 0.8 0.5 0.3 0.5\n5 0.85 0.7 0.1 0.1\n"),
  );

  let partitioner = ws.partitioner();
  partitioner.run().unwrap();
  let first = [
    read(ws.person.join("labels/yard.txt")),
    read(ws.ppe.join("labels/yard_0.txt")),
    read(ws.ppe.join("labels/yard_1.txt")),
  ];
  partitioner.run().unwrap();
  let second = [
    read(ws.person.join("labels/yard.txt")),
    read(ws.ppe.join("labels/yard_0.txt")),
    read(ws.ppe.join("labels/yard_1.txt")),
  ];
  assert_eq!(first, second);
}

#[test]
fn custom_taxonomy_selects_subject_by_first_name() {
  let ws = Workspace::new();
  write_sample(
    &ws.input,
    "t",
    &gradient(100, 100),
    Some("0 0.5 0.5 1 1\n2 0.5 0.5 0.2 0.2\n"),
  );

  let taxonomy = Taxonomy::new(["worker", "helmet", "boots"]).unwrap();
  let summary = ws.partitioner().with_taxonomy(taxonomy).run().unwrap();
  assert_eq!(summary.item_samples, 1);
  assert_eq!(read(ws.ppe.join("labels/t_0.txt")), "1 0.5 0.5 0.2 0.2\n");
}

#[test]
fn written_subject_sample_is_counted_when_a_crop_fails() {
  let ws = Workspace::new();
  write_sample(
    &ws.input,
    "site",
    &gradient(100, 100),
    Some("0 0.25 0.25 0.5 0.5\n1 0.2 0.2 0.2 0.2\n"),
  );
  // 目标位置被目录占用，裁剪图无法写出
  std::fs::create_dir_all(ws.ppe.join("images/site_0.png")).unwrap();

  let summary = ws.partitioner().run().unwrap();
  assert_eq!(summary.failed, 1);
  assert_eq!(summary.subject_samples, 1);
  assert_eq!(summary.item_samples, 0);
  assert!(ws.person.join("labels/site.txt").exists());
  assert!(!ws.ppe.join("labels/site_0.txt").exists());
}
