#![cfg(feature = "save_image_file")]

use image::{Rgb, RgbImage};
use shanan_ppe::{
  cascade::Cascade,
  input::ImageDirectoryInput,
  model::{DetectItem, DetectResult, Model},
  output::SaveImageFileOutput,
  task::{BatchTask, Task},
};

#[derive(Debug, thiserror::Error)]
#[error("detector offline")]
struct Offline;

/// 在整图上报告一个越界的主体
struct Person;

impl Model for Person {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Offline;

  fn infer(&self, input: &RgbImage) -> Result<DetectResult, Offline> {
    if input.width() == 77 {
      return Err(Offline);
    }
    Ok(DetectResult::from(vec![DetectItem {
      class_id: 0,
      score: 0.8,
      bbox: [10.7, 10.2, 50.0, 200.0],
    }]))
  }
}

/// 在裁剪图上报告一个头盔
struct HardHat;

impl Model for HardHat {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = Offline;

  fn infer(&self, input: &RgbImage) -> Result<DetectResult, Offline> {
    assert_eq!(input.dimensions(), (40, 90));
    Ok(DetectResult::from(vec![DetectItem {
      class_id: 0,
      score: 0.3,
      bbox: [5.0, 5.0, 15.0, 15.0],
    }]))
  }
}

#[test]
fn annotates_images_and_records_global_item_labels() {
  let dir = tempfile::tempdir().unwrap();
  let input_dir = dir.path().join("in");
  let output_dir = dir.path().join("out");
  std::fs::create_dir_all(&input_dir).unwrap();

  RgbImage::new(100, 100).save(input_dir.join("gate.png")).unwrap();
  RgbImage::new(77, 20).save(input_dir.join("offline.png")).unwrap();
  std::fs::write(input_dir.join("broken.jpg"), b"not a jpeg").unwrap();

  let input = ImageDirectoryInput::open(&input_dir).unwrap();
  let output = SaveImageFileOutput::new(&output_dir).with_record(true);
  let summary = BatchTask::default()
    .run_task(input, Cascade::new(Person, HardHat), output)
    .unwrap();

  assert_eq!(summary.processed, 1);
  assert_eq!(summary.skipped, 1);
  assert_eq!(summary.failed, 1);
  assert_eq!(summary.items, 1);

  // 主体 (10,10,50,100)，物品平移到 (15,15,25,25)
  let labels = std::fs::read_to_string(output_dir.join("gate.txt")).unwrap();
  assert_eq!(labels, "0 0.2 0.2 0.1 0.1\n");

  let annotated = image::open(output_dir.join("gate.png")).unwrap().into_rgb8();
  assert_eq!(annotated.get_pixel(15, 15), &Rgb([0, 255, 0]));
  assert_eq!(annotated.get_pixel(20, 20), &Rgb([0, 0, 0]));
  assert!(!output_dir.join("offline.png").exists());
  assert!(!output_dir.join("broken.jpg").exists());
}
