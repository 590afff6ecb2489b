use std::path::PathBuf;

use clap::builder::PossibleValue;
use clap::{Parser, ValueEnum};

use crate::backend::DeviceKind;
use crate::error::PredictError;
use crate::infer::DatasetVariant;

// Argument parsing stays out of the inference modules, so the variant
// gets its clap mapping here rather than a derive at the definition.
impl ValueEnum for DatasetVariant {
	fn value_variants<'a>() -> &'a [Self] {
		&[DatasetVariant::Renal, DatasetVariant::Generic]
	}

	fn to_possible_value(&self) -> Option<PossibleValue> {
		Some(match self {
			DatasetVariant::Renal => PossibleValue::new("renal"),
			DatasetVariant::Generic => PossibleValue::new("generic"),
		})
	}
}

/// Batched inference over an external test set, with optional top-5
/// checkpoint ensembling ranked by F1 score.
#[derive(Debug, Parser)]
#[command(name = "renal-classification", version)]
pub struct Cli {
	/// Directory holding the external test set, one subfolder per class
	#[arg(long)]
	pub ext_test: PathBuf,

	#[arg(long, default_value_t = 16)]
	pub batch_size: usize,

	/// Class count of the trained model's output layer
	#[arg(long)]
	pub num_classes: usize,

	/// Ensemble the top-5 checkpoints by F1 instead of a single pass
	#[arg(long)]
	pub average: bool,

	/// Directory holding the evaluation log and receiving result files
	#[arg(long)]
	pub output_csv_dir: PathBuf,

	/// Directory holding the epoch{N}_checkpoint files
	#[arg(long, default_value = "model")]
	pub save_model_dir: PathBuf,

	/// Dataset variant selecting the output column schema
	#[arg(long, value_enum, default_value = "generic")]
	pub dataset: DatasetVariant,

	/// Checkpoint to restore for a single (non-ensembled) pass
	#[arg(long)]
	pub checkpoint: Option<PathBuf>,

	#[arg(long, value_enum, default_value = "cpu")]
	pub device: DeviceKind,
}

impl Cli {
	pub fn validate(&self) -> Result<(), PredictError> {
		if self.batch_size == 0 {
			return Err(PredictError::Config("batch_size must be greater than zero".to_string()));
		}
		if self.num_classes == 0 {
			return Err(PredictError::Config("num_classes must be greater than zero".to_string()));
		}
		Ok(())
	}
}
