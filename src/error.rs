use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
	#[error("Invalid configuration: {0}")]
	Config(String),
	#[error("File not found: {0}")]
	NotFound(PathBuf),
	#[error("Failed to load checkpoint '{0}': {1}")]
	Checkpoint(PathBuf, String),
	#[error("Compute device unavailable: {0}")]
	Device(String),
	#[error("Class count mismatch: expected {expected}, got {actual}")]
	Shape { expected: usize, actual: usize },
	#[error("Failed to load image '{0}': {1}")]
	Image(PathBuf, String),
	#[error("IO error: {0}")]
	StdIoError(#[from] std::io::Error),
	#[error("CSV error: {0}")]
	CsvError(#[from] csv::Error),
}
