use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::{Dataset, InMemDataset};
use burn::prelude::{Backend, ElementConversion, Int};
use burn::tensor::{Shape, Tensor, TensorData};
use image::imageops::FilterType;

use crate::error::PredictError;

pub const SIDE_LENGTH: u32 = 224;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

const IMAGE_EXTENSIONS: [&str; 7] = ["bmp", "jpg", "jpeg", "png", "tif", "tiff", "webp"];

fn is_image_file(path: &Path) -> bool {
	path.extension()
		.and_then(|ext| ext.to_str())
		.map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
		.unwrap_or(false)
}

#[derive(Clone)]
pub struct Normalizer<B: Backend> {
	pub mean: Tensor<B, 4>,
	pub std: Tensor<B, 4>,
}

impl <B: Backend> Normalizer<B> {
	pub fn new(device: &B::Device) -> Self {
		let mean = Tensor::<B, 1>::from_floats(MEAN, device).reshape([1, 3, 1, 1]);
		let std = Tensor::<B, 1>::from_floats(STD, device).reshape([1, 3, 1, 1]);
		Self { mean, std }
	}

	pub fn normalize(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		(input - self.mean.clone()) / self.std.clone()
	}
}

/// One test image, decoded and resized, with its path kept as the
/// identifier reported in the result file.
#[derive(Debug, Clone)]
pub struct PredictItem {
	pub pixels: Vec<u8>, // RGB, row major, SIDE_LENGTH x SIDE_LENGTH
	pub label: usize,
	pub name: String,
}

pub struct PredictDataset {
	dataset: InMemDataset<PredictItem>,
}

impl PredictDataset {
	/// Reads a test folder with one subfolder per class. Class indices
	/// follow the sorted subfolder names; entries are sorted by path so
	/// every pass over the dataset yields the same sequence.
	pub fn from_dir<A: AsRef<Path>>(test_dir: A) -> Result<Self, PredictError> {
		let test_dir = test_dir.as_ref();
		if !test_dir.is_dir() {
			return Err(PredictError::NotFound(test_dir.to_path_buf()));
		}

		let mut class_dirs = Vec::new();
		for entry in test_dir.read_dir()? {
			let path = entry?.path();
			if path.is_dir() {
				class_dirs.push(path);
			}
		}
		class_dirs.sort();
		if class_dirs.is_empty() {
			return Err(PredictError::Config(format!(
				"test folder '{}' contains no class subfolders",
				test_dir.display()
			)));
		}

		let mut items = Vec::new();
		for (label, class_dir) in class_dirs.iter().enumerate() {
			let mut files = Vec::new();
			for entry in class_dir.read_dir()? {
				let path = entry?.path();
				// Stray non-image files (.DS_Store, notes) are skipped;
				// files claiming to be images must still decode
				if path.is_file() && is_image_file(&path) {
					files.push(path);
				}
			}
			files.sort();

			for path in files {
				let image = image::open(&path)
					.map_err(|e| PredictError::Image(path.clone(), e.to_string()))?;
				let resized = image.resize_exact(SIDE_LENGTH, SIDE_LENGTH, FilterType::Lanczos3);
				items.push(PredictItem {
					pixels: resized.into_rgb8().into_raw(),
					label,
					name: path.display().to_string(),
				});
			}
		}

		Ok(Self { dataset: InMemDataset::new(items) })
	}
}

impl Dataset<PredictItem> for PredictDataset {
	fn get(&self, index: usize) -> Option<PredictItem> {
		self.dataset.get(index)
	}

	fn len(&self) -> usize {
		self.dataset.len()
	}
}

#[derive(Clone, Debug)]
pub struct PredictBatch<B: Backend> {
	pub images: Tensor<B, 4>,
	pub targets: Tensor<B, 1, Int>,
	pub names: Vec<String>,
}

#[derive(Clone)]
pub struct PredictBatcher<B: Backend> {
	normalizer: Normalizer<B>,
	device: B::Device,
}

impl <B: Backend> PredictBatcher<B> {
	pub fn new(device: B::Device) -> Self {
		Self {
			normalizer: Normalizer::<B>::new(&device),
			device,
		}
	}
}

impl <B: Backend> Batcher<PredictItem, PredictBatch<B>> for PredictBatcher<B> {
	fn batch(&self, items: Vec<PredictItem>) -> PredictBatch<B> {
		let side = SIDE_LENGTH as usize;

		let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();

		let targets = items
			.iter()
			.map(|item| {
				Tensor::<B, 1, Int>::from_data(
					TensorData::from([(item.label as i64).elem::<B::IntElem>()]),
					&self.device,
				)
			})
			.collect();

		let images = items
			.into_iter()
			.map(|item| TensorData::new(item.pixels, Shape::new([side, side, 3])))
			.map(|data| {
				Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), &self.device)
					.swap_dims(2, 1) // [H, C, W]
					.swap_dims(1, 0) // [C, H, W]
			})
			.map(|tensor| tensor / 255)
			.collect();

		let images = Tensor::stack(images, 0);
		let targets = Tensor::cat(targets, 0);

		let images = self.normalizer.normalize(images);

		PredictBatch {
			images,
			targets,
			names,
		}
	}
}

#[cfg(test)]
pub fn test_item(value: u8, label: usize, name: &str) -> PredictItem {
	let side = SIDE_LENGTH as usize;
	PredictItem {
		pixels: vec![value; side * side * 3],
		label,
		name: name.to_string(),
	}
}
