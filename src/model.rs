use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Tensor};

#[derive(Debug, Module)]
pub struct RenalClassModel<B: Backend> {
	activation: Relu,
	pool: MaxPool2d,
	conv1: Conv2d<B>,
	conv2: Conv2d<B>,
	conv3: Conv2d<B>,
	fc1: Linear<B>,
	fc2: Linear<B>,
}

impl <B: Backend> RenalClassModel<B> {
	/// [batch, 3, 224, 224] -> [batch, num_classes] logits
	pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
		let x = self.conv1.forward(images);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv2.forward(x);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv3.forward(x);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = x.flatten(1, 3);

		let x = self.fc1.forward(x);
		let x = self.activation.forward(x);

		self.fc2.forward(x)
	}
}

#[derive(Debug, Config)]
pub struct RenalClassConfig {
	pub num_classes: usize,
	#[config(default = 64)]
	pub hidden_size: usize,
}

impl RenalClassConfig {
	pub fn init<B: Backend>(&self, device: &B::Device) -> RenalClassModel<B> {
		let conv1 = Conv2dConfig::new([3, 8], [3, 3])
			.with_padding(PaddingConfig2d::Same)
			.init(device);

		let conv2 = Conv2dConfig::new([8, 16], [3, 3])
			.with_padding(PaddingConfig2d::Same)
			.init(device);

		let conv3 = Conv2dConfig::new([16, 32], [3, 3])
			.with_padding(PaddingConfig2d::Same)
			.init(device);

		let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

		// 224 halved by three pools -> 28; 32 * 28 * 28 flattened features
		let fc1 = LinearConfig::new(25_088, self.hidden_size).init(device);
		let fc2 = LinearConfig::new(self.hidden_size, self.num_classes).init(device);

		RenalClassModel {
			activation: Relu::new(),
			pool,
			conv1,
			conv2,
			conv3,
			fc1,
			fc2,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	type TestBackend = burn::backend::NdArray;

	#[test]
	fn forward_produces_one_logit_row_per_class() {
		let device = Default::default();
		let model = RenalClassConfig::new(5).init::<TestBackend>(&device);

		let images = Tensor::<TestBackend, 4>::zeros([2, 3, 224, 224], &device);
		let logits = model.forward(images);

		assert_eq!(logits.dims(), [2, 5]);
	}
}
