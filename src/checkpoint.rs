use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{CompactRecorder, Recorder};

use crate::error::PredictError;
use crate::model::{RenalClassConfig, RenalClassModel};

/// Path stem of the checkpoint saved after training epoch N. The
/// recorder appends its own file extension.
pub fn checkpoint_path(save_model_dir: &Path, epoch: u32) -> PathBuf {
	save_model_dir.join(format!("epoch{epoch}_checkpoint"))
}

/// Builds a fresh model from the config and restores the named
/// checkpoint into it, leaving any previously loaded model untouched.
pub fn load_checkpoint<B: Backend>(
	config: &RenalClassConfig,
	path: &Path,
	device: &B::Device,
) -> Result<RenalClassModel<B>, PredictError> {
	if !path.with_extension("mpk").exists() {
		return Err(PredictError::NotFound(path.with_extension("mpk")));
	}

	let record = CompactRecorder::new()
		.load(path.to_path_buf(), device)
		.map_err(|e| PredictError::Checkpoint(path.to_path_buf(), e.to_string()))?;

	Ok(config.init(device).load_record(record))
}
