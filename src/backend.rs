use clap::ValueEnum;

use crate::error::PredictError;

#[cfg(feature = "tch")]
pub type InferBackend = burn_tch::LibTorch;

#[cfg(all(feature = "ndarray", not(feature = "tch")))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(not(any(feature = "ndarray", feature = "tch")))]
compile_error!("At least one backend (ndarray or tch) must be enabled");

pub type InferDevice = <InferBackend as burn::prelude::Backend>::Device;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
	Cpu,
	Cuda,
}

#[cfg(feature = "tch")]
pub fn init_device(kind: DeviceKind) -> Result<InferDevice, PredictError> {
	use burn_tch::LibTorchDevice;

	match kind {
		DeviceKind::Cpu => Ok(LibTorchDevice::Cpu),
		DeviceKind::Cuda => {
			if !tch::utils::has_cuda() {
				return Err(PredictError::Device("could not detect a valid CUDA configuration".to_string()));
			}
			Ok(LibTorchDevice::Cuda(0))
		}
	}
}

#[cfg(all(feature = "ndarray", not(feature = "tch")))]
pub fn init_device(kind: DeviceKind) -> Result<InferDevice, PredictError> {
	use burn::backend::ndarray::NdArrayDevice;

	match kind {
		DeviceKind::Cpu => Ok(NdArrayDevice::Cpu),
		DeviceKind::Cuda => Err(PredictError::Device(
			"the ndarray backend runs on CPU only; rebuild with the 'tch' feature for CUDA".to_string(),
		)),
	}
}
