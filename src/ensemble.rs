use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use burn::data::dataloader::DataLoader;
use burn::prelude::Backend;
use log::info;
use serde::Deserialize;

use crate::checkpoint::{checkpoint_path, load_checkpoint};
use crate::data::PredictBatch;
use crate::error::PredictError;
use crate::infer::{predict, DatasetVariant};
use crate::model::RenalClassConfig;
use crate::output::write_results;

/// How many checkpoints an ensemble run replays, at most.
pub const TOP_K: usize = 5;

/// One evaluation-log row. The log carries more columns (loss,
/// accuracy, a leading index column); only these two matter here.
#[derive(Debug, Deserialize)]
struct EpochMetrics {
	// The training side serializes epoch numbers as floats at times
	epoch_num: f64,
	f1: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedCheckpoint {
	pub epoch: u32,
	pub f1: f64,
}

/// Ranks the evaluation log's epochs by F1 score, descending, and keeps
/// the best `TOP_K`. A log with fewer rows yields them all.
pub fn rank_checkpoints<R: Read>(reader: R) -> Result<Vec<RankedCheckpoint>, PredictError> {
	let mut reader = csv::Reader::from_reader(reader);

	let headers = reader.headers()?.clone();
	for required in ["epoch_num", "f1"] {
		if !headers.iter().any(|h| h == required) {
			return Err(PredictError::Config(format!(
				"evaluation log is missing the '{required}' column"
			)));
		}
	}

	let mut ranking = Vec::new();
	for row in reader.deserialize::<EpochMetrics>() {
		let row = row?;
		ranking.push(RankedCheckpoint {
			epoch: row.epoch_num as u32,
			f1: row.f1,
		});
	}

	ranking.sort_by(|a, b| b.f1.total_cmp(&a.f1));
	ranking.truncate(TOP_K);
	Ok(ranking)
}

/// Replays inference once per selected checkpoint, best F1 first,
/// writing each pass to its own rank-suffixed result file. A missing
/// checkpoint aborts the run instead of being skipped.
pub fn run_ensemble<B: Backend>(
	loader: Arc<dyn DataLoader<PredictBatch<B>>>,
	config: &RenalClassConfig,
	device: &B::Device,
	variant: DatasetVariant,
	output_csv_dir: &Path,
	save_model_dir: &Path,
) -> Result<(), PredictError> {
	let log_path = output_csv_dir.join("output.csv");
	if !log_path.exists() {
		return Err(PredictError::NotFound(log_path));
	}

	let ranking = rank_checkpoints(File::open(&log_path)?)?;
	if ranking.is_empty() {
		return Err(PredictError::Config(format!(
			"evaluation log '{}' holds no epochs to rank",
			log_path.display()
		)));
	}

	for (idx, selected) in ranking.iter().enumerate() {
		info!("predicting with epoch{} checkpoint (f1 {:.4})", selected.epoch, selected.f1);

		let path = checkpoint_path(save_model_dir, selected.epoch);
		let model = load_checkpoint::<B>(config, &path, device)?;
		let table = predict(loader.clone(), &model, config.num_classes, variant)?;
		let written = write_results(&table, output_csv_dir, Some(idx))?;

		info!("wrote {}", written.display());
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::data::{test_item, PredictBatcher, PredictItem};
	use burn::data::dataloader::DataLoaderBuilder;
	use burn::data::dataset::InMemDataset;
	use burn::module::Module;
	use burn::record::CompactRecorder;
	use std::io::Write;
	use tempfile::tempdir;

	type TestBackend = burn::backend::NdArray;

	#[test]
	fn ranking_keeps_the_top_five_in_descending_order() {
		let log = ",epoch_num,f1,loss\n\
			0,1,0.61,0.9\n\
			1,2,0.72,0.7\n\
			2,3,0.55,0.8\n\
			3,4,0.90,0.4\n\
			4,5,0.88,0.5\n\
			5,6,0.70,0.6\n";

		let ranking = rank_checkpoints(log.as_bytes()).unwrap();
		let epochs: Vec<u32> = ranking.iter().map(|r| r.epoch).collect();
		assert_eq!(epochs, vec![4, 5, 2, 6, 1]);
		assert!(ranking.windows(2).all(|w| w[0].f1 >= w[1].f1));
	}

	#[test]
	fn short_logs_yield_every_epoch() {
		let log = "epoch_num,f1\n3,0.4\n1,0.6\n";
		let ranking = rank_checkpoints(log.as_bytes()).unwrap();
		assert_eq!(ranking.len(), 2);
		assert_eq!(ranking[0], RankedCheckpoint { epoch: 1, f1: 0.6 });
	}

	#[test]
	fn float_epoch_numbers_are_truncated() {
		let log = "epoch_num,f1\n7.0,0.5\n";
		let ranking = rank_checkpoints(log.as_bytes()).unwrap();
		assert_eq!(ranking[0].epoch, 7);
	}

	#[test]
	fn missing_f1_column_is_a_config_error() {
		let log = "epoch_num,loss\n1,0.5\n";
		let err = rank_checkpoints(log.as_bytes()).unwrap_err();
		assert!(matches!(err, PredictError::Config(_)));
	}

	fn test_loader(count: usize) -> Arc<dyn DataLoader<PredictBatch<TestBackend>>> {
		let items: Vec<PredictItem> = (0..count)
			.map(|i| test_item((i * 60) as u8, i % 2, &format!("img{i}.png")))
			.collect();

		DataLoaderBuilder::new(PredictBatcher::<TestBackend>::new(Default::default()))
			.batch_size(2)
			.build(InMemDataset::new(items))
	}

	fn save_model(config: &RenalClassConfig, seed: u64, dir: &Path, epoch: u32) {
		TestBackend::seed(seed);
		let device = Default::default();
		let model = config.init::<TestBackend>(&device);
		model
			.save_file(checkpoint_path(dir, epoch), &CompactRecorder::new())
			.unwrap();
	}

	#[test]
	fn ensemble_replays_checkpoints_in_f1_order() {
		let out_dir = tempdir().unwrap();
		let model_dir = tempdir().unwrap();
		let device = Default::default();
		let config = RenalClassConfig::new(5);

		save_model(&config, 1, model_dir.path(), 1);
		save_model(&config, 2, model_dir.path(), 2);

		let mut log = File::create(out_dir.path().join("output.csv")).unwrap();
		writeln!(log, ",epoch_num,f1").unwrap();
		writeln!(log, "0,1,0.80").unwrap();
		writeln!(log, "1,2,0.90").unwrap();

		run_ensemble::<TestBackend>(
			test_loader(4),
			&config,
			&device,
			DatasetVariant::Renal,
			out_dir.path(),
			model_dir.path(),
		)
		.unwrap();

		// Epoch 2 has the higher f1, so its predictions land in top1
		let epoch2 = load_checkpoint::<TestBackend>(&config, &checkpoint_path(model_dir.path(), 2), &device).unwrap();
		let expected = predict(test_loader(4), &epoch2, 5, DatasetVariant::Renal).unwrap();
		let single_dir = tempdir().unwrap();
		let expected_path = write_results(&expected, single_dir.path(), None).unwrap();

		let top1 = std::fs::read_to_string(out_dir.path().join("top1_predict_f1.csv")).unwrap();
		assert_eq!(top1, std::fs::read_to_string(expected_path).unwrap());

		let top2 = std::fs::read_to_string(out_dir.path().join("top2_predict_f1.csv")).unwrap();
		assert_eq!(top2.lines().count(), 5); // header + one row per sample
		assert!(!out_dir.path().join("top3_predict_f1.csv").exists());
	}

	#[test]
	fn missing_checkpoint_aborts_the_run() {
		let out_dir = tempdir().unwrap();
		let model_dir = tempdir().unwrap();
		let device = Default::default();
		let config = RenalClassConfig::new(5);

		let mut log = File::create(out_dir.path().join("output.csv")).unwrap();
		writeln!(log, "epoch_num,f1").unwrap();
		writeln!(log, "9,0.75").unwrap();

		let err = run_ensemble::<TestBackend>(
			test_loader(2),
			&config,
			&device,
			DatasetVariant::Generic,
			out_dir.path(),
			model_dir.path(),
		)
		.unwrap_err();
		assert!(matches!(err, PredictError::NotFound(_)));
	}

	#[test]
	fn missing_evaluation_log_is_reported() {
		let out_dir = tempdir().unwrap();
		let model_dir = tempdir().unwrap();
		let device = Default::default();
		let config = RenalClassConfig::new(5);

		let err = run_ensemble::<TestBackend>(
			test_loader(2),
			&config,
			&device,
			DatasetVariant::Generic,
			out_dir.path(),
			model_dir.path(),
		)
		.unwrap_err();
		assert!(matches!(err, PredictError::NotFound(_)));
	}
}
