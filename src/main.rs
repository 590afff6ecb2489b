use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use clap::Parser;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;

use crate::backend::InferBackend;
use crate::cli::Cli;
use crate::data::{PredictBatcher, PredictDataset};
use crate::error::PredictError;
use crate::model::RenalClassConfig;

mod backend;
mod checkpoint;
mod cli;
mod data;
mod ensemble;
mod error;
mod infer;
mod model;
mod output;

fn main() {
	SimpleLogger::new()
		.with_level(LevelFilter::Info)
		.env()
		.init()
		.expect("Logger should initialize once");

	let args = Cli::parse();
	if let Err(err) = run(args) {
		error!("{err}");
		std::process::exit(1);
	}
}

fn run(args: Cli) -> Result<(), PredictError> {
	args.validate()?;

	let device = backend::init_device(args.device)?;

	info!("loading test set from {}", args.ext_test.display());
	let dataset = PredictDataset::from_dir(&args.ext_test)?;
	info!("loaded {} test images", dataset.len());

	// Single-threaded loader: result rows must keep dataset order
	let batcher = PredictBatcher::<InferBackend>::new(device.clone());
	let loader = DataLoaderBuilder::new(batcher)
		.batch_size(args.batch_size)
		.build(dataset);

	info!("creating model with {} classes", args.num_classes);
	let config = RenalClassConfig::new(args.num_classes);

	if args.average {
		ensemble::run_ensemble::<InferBackend>(
			loader,
			&config,
			&device,
			args.dataset,
			&args.output_csv_dir,
			&args.save_model_dir,
		)?;
	} else {
		let model = match &args.checkpoint {
			Some(path) => checkpoint::load_checkpoint::<InferBackend>(&config, path, &device)?,
			None => config.init::<InferBackend>(&device),
		};
		let table = infer::predict(loader, &model, args.num_classes, args.dataset)?;
		let written = output::write_results(&table, &args.output_csv_dir, None)?;
		info!("wrote {}", written.display());
	}

	Ok(())
}
