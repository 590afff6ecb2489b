use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::PredictError;
use crate::infer::{DatasetVariant, ResultTable};

/// File name for one inference pass. `None` is the single-model pass;
/// `Some(idx)` is the 0-based ensemble pass, named by its 1-based rank.
pub fn result_file_name(rank: Option<usize>) -> String {
	match rank {
		None => "predict_f1.csv".to_string(),
		Some(idx) => format!("top{}_predict_f1.csv", idx + 1),
	}
}

/// Serializes the table to `{output_csv_dir}/{result_file_name}`,
/// replacing any previous file at that path.
pub fn write_results(
	table: &ResultTable,
	output_csv_dir: &Path,
	rank: Option<usize>,
) -> Result<PathBuf, PredictError> {
	let path = output_csv_dir.join(result_file_name(rank));
	let file = File::create(&path)?;
	let mut writer = csv::Writer::from_writer(file);

	match table.variant {
		DatasetVariant::Renal => {
			writer.write_record(["image", "prediction", "sclerosis_score", "target"])?;
			for record in &table.records {
				writer.write_record(&[
					record.image.clone(),
					record.prediction.to_string(),
					record.sclerosis_score().to_string(),
					record.target.to_string(),
				])?;
			}
		}
		DatasetVariant::Generic => {
			writer.write_record(["image", "prediction", "target"])?;
			for record in &table.records {
				writer.write_record(&[
					record.image.clone(),
					record.prediction.to_string(),
					record.target.to_string(),
				])?;
			}
		}
	}

	writer.flush()?;
	Ok(path)
}
