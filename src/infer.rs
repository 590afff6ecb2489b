use std::sync::Arc;

use burn::data::dataloader::DataLoader;
use burn::prelude::Backend;
use burn::tensor::activation::softmax;
use log::debug;

use crate::data::PredictBatch;
use crate::error::PredictError;
use crate::model::RenalClassModel;

/// Class indices summed into the renal sclerosis score: every class
/// except index 0 (the healthy grade), up to grade 4.
pub const SCLEROSIS_CLASSES: std::ops::Range<usize> = 1..5;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DatasetVariant {
	/// Renal biopsy grading; adds the sclerosis score column
	Renal,
	Generic,
}

/// One scored test image, in dataset order.
#[derive(Debug, Clone)]
pub struct PredictionRecord {
	pub image: String,
	pub prediction: usize,
	pub probabilities: Vec<f32>,
	pub target: usize,
}

impl PredictionRecord {
	/// Summed probability mass of the sclerotic grades.
	pub fn sclerosis_score(&self) -> f32 {
		self.probabilities[SCLEROSIS_CLASSES].iter().sum()
	}
}

#[derive(Debug)]
pub struct ResultTable {
	pub records: Vec<PredictionRecord>,
	pub variant: DatasetVariant,
}

/// Runs one full pass over the test loader and accumulates a record per
/// sample, preserving the loader's iteration order.
///
/// The renal variant requires at least `SCLEROSIS_CLASSES.end` classes;
/// fewer is rejected up front instead of silently truncating the score.
pub fn predict<B: Backend>(
	loader: Arc<dyn DataLoader<PredictBatch<B>>>,
	model: &RenalClassModel<B>,
	num_classes: usize,
	variant: DatasetVariant,
) -> Result<ResultTable, PredictError> {
	if variant == DatasetVariant::Renal && num_classes < SCLEROSIS_CLASSES.end {
		return Err(PredictError::Shape {
			expected: SCLEROSIS_CLASSES.end,
			actual: num_classes,
		});
	}

	let mut records = Vec::new();

	for batch in loader.iter() {
		let logits = model.forward(batch.images);
		let [batch_size, width] = logits.dims();
		if width != num_classes {
			return Err(PredictError::Shape {
				expected: num_classes,
				actual: width,
			});
		}

		let probabilities = softmax(logits, 1);
		let predictions: Vec<i64> = probabilities
			.clone()
			.argmax(1)
			.flatten::<1>(0, 1)
			.into_data()
			.convert::<i64>()
			.to_vec()
			.expect("argmax output should convert to i64");
		let targets: Vec<i64> = batch
			.targets
			.into_data()
			.convert::<i64>()
			.to_vec()
			.expect("targets should convert to i64");
		let scores: Vec<f32> = probabilities
			.into_data()
			.convert::<f32>()
			.to_vec()
			.expect("probabilities should convert to f32");

		for (i, name) in batch.names.into_iter().enumerate() {
			records.push(PredictionRecord {
				image: name,
				prediction: predictions[i] as usize,
				probabilities: scores[i * num_classes..(i + 1) * num_classes].to_vec(),
				target: targets[i] as usize,
			});
		}

		debug!("scored batch of {batch_size} images, {} total", records.len());
	}

	Ok(ResultTable { records, variant })
}
