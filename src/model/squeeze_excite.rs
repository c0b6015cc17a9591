use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{relu, sigmoid};

use super::conv::he_normal;

/// Squeeze-and-excite channel gating block
///
/// Each channel is summarised by its mean over time, passed through a
/// bottleneck of two bias-free dense layers and turned into a gate in (0, 1)
/// that rescales the channel.
#[derive(Module, Debug)]
pub struct SqueezeExcite<B: Backend> {
    /// Bottleneck projection (channels -> channels / ratio)
    reduce: Linear<B>,
    /// Restore projection (channels / ratio -> channels)
    expand: Linear<B>,
}

/// Squeeze-and-excite configuration
#[derive(Config, Debug)]
pub struct SqueezeExciteConfig {
    /// Number of channels being gated
    pub channels: usize,
    /// Bottleneck reduction ratio
    #[config(default = "16")]
    pub reduction_ratio: usize,
}

impl SqueezeExciteConfig {
    /// Bottleneck width, at least one unit
    pub fn reduced_width(&self) -> usize {
        (self.channels / self.reduction_ratio.max(1)).max(1)
    }

    /// Initialize squeeze-and-excite block
    pub fn init<B: Backend>(&self, device: &B::Device) -> SqueezeExcite<B> {
        let reduced = self.reduced_width();

        let reduce = LinearConfig::new(self.channels, reduced)
            .with_bias(false)
            .with_initializer(he_normal())
            .init(device);

        let expand = LinearConfig::new(reduced, self.channels)
            .with_bias(false)
            .with_initializer(he_normal())
            .init(device);

        SqueezeExcite { reduce, expand }
    }
}

impl<B: Backend> SqueezeExcite<B> {
    /// Per-channel gates
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, channels, length]
    ///
    /// # Returns
    /// * Tensor of shape [batch_size, channels] with values in (0, 1)
    pub fn gates(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch_size, channels, _] = x.dims();

        let squeezed = x.mean_dim(2).reshape([batch_size, channels]);
        let hidden = relu(self.reduce.forward(squeezed));
        sigmoid(self.expand.forward(hidden))
    }

    /// Forward pass: rescale every channel by its gate
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch_size, channels, _] = x.dims();
        let gates = self.gates(x.clone()).reshape([batch_size, channels, 1]);
        x.mul(gates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_reduced_width() {
        assert_eq!(SqueezeExciteConfig::new(64).reduced_width(), 4);
        assert_eq!(SqueezeExciteConfig::new(128).reduced_width(), 8);
        assert_eq!(SqueezeExciteConfig::new(8).reduced_width(), 1);
        assert_eq!(SqueezeExciteConfig::new(8).with_reduction_ratio(4).reduced_width(), 2);
    }

    #[test]
    fn test_forward_keeps_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let block = SqueezeExciteConfig::new(32).init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 3>::ones([2, 32, 12], &device);
        assert_eq!(block.forward(x).dims(), [2, 32, 12]);
    }

    #[test]
    fn test_gates_in_unit_interval() {
        let device = <TestBackend as Backend>::Device::default();
        let block = SqueezeExciteConfig::new(16).init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 3>::ones([3, 16, 5], &device);
        let gates = block.gates(x);
        assert_eq!(gates.dims(), [3, 16]);

        let values: Vec<f32> = gates.into_data().to_vec().unwrap();
        assert!(values.iter().all(|&g| g > 0.0 && g < 1.0));
    }
}
