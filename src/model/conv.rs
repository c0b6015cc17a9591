use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::nn::{Initializer, PaddingConfig1d};
use burn::prelude::*;

/// Dilated 1-D convolution whose output keeps the input length.
///
/// The total padding `dilation * (kernel_size - 1)` is split with the smaller
/// half on the left. When the total is odd the convolution pads the larger half
/// on both sides and the first output step is dropped.
#[derive(Module, Debug)]
pub struct SameConv1d<B: Backend> {
    conv: Conv1d<B>,
    /// Output steps to drop from the front (0 or 1)
    offset: usize,
}

/// Same-length convolution configuration
#[derive(Config, Debug)]
pub struct SameConv1dConfig {
    /// Input channels
    pub channels_in: usize,
    /// Output channels
    pub channels_out: usize,
    /// Kernel width
    pub kernel_size: usize,
    /// Spacing between kernel taps
    #[config(default = "1")]
    pub dilation: usize,
}

impl SameConv1dConfig {
    /// Left and right padding around the time axis
    pub fn padding(&self) -> (usize, usize) {
        let total = self.dilation * self.kernel_size.saturating_sub(1);
        let left = total / 2;
        (left, total - left)
    }

    /// Initialize the convolution with He-uniform weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> SameConv1d<B> {
        let (left, right) = self.padding();

        let conv = Conv1dConfig::new(self.channels_in, self.channels_out, self.kernel_size)
            .with_dilation(self.dilation)
            .with_padding(PaddingConfig1d::Explicit(right))
            .with_initializer(he_uniform())
            .init(device);

        SameConv1d {
            conv,
            offset: right - left,
        }
    }
}

impl<B: Backend> SameConv1d<B> {
    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, channels_in, length]
    ///
    /// # Returns
    /// * Tensor of shape [batch_size, channels_out, length]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, _, length] = x.dims();
        let y = self.conv.forward(x);

        if self.offset == 0 {
            y
        } else {
            y.narrow(2, self.offset, length)
        }
    }
}

/// He-uniform initializer: U(-sqrt(6 / fan_in), sqrt(6 / fan_in))
pub fn he_uniform() -> Initializer {
    Initializer::KaimingUniform {
        gain: std::f64::consts::SQRT_2,
        fan_out_only: false,
    }
}

/// He-normal initializer: N(0, 2 / fan_in)
pub fn he_normal() -> Initializer {
    Initializer::KaimingNormal {
        gain: std::f64::consts::SQRT_2,
        fan_out_only: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::module::Param;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_padding_split() {
        assert_eq!(SameConv1dConfig::new(1, 1, 5).with_dilation(2).padding(), (4, 4));
        assert_eq!(SameConv1dConfig::new(1, 1, 1).with_dilation(2).padding(), (0, 0));
        assert_eq!(SameConv1dConfig::new(1, 1, 4).padding(), (1, 2));
        assert_eq!(SameConv1dConfig::new(1, 1, 8).with_dilation(3).padding(), (10, 11));
    }

    #[test]
    fn test_odd_kernel_keeps_length() {
        let device = <TestBackend as Backend>::Device::default();
        let conv = SameConv1dConfig::new(3, 8, 5)
            .with_dilation(2)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 3>::ones([2, 3, 10], &device);
        assert_eq!(conv.forward(x).dims(), [2, 8, 10]);
    }

    #[test]
    fn test_even_kernel_keeps_length() {
        let device = <TestBackend as Backend>::Device::default();
        let conv = SameConv1dConfig::new(2, 4, 4)
            .with_dilation(1)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 3>::ones([1, 2, 7], &device);
        assert_eq!(conv.forward(x).dims(), [1, 4, 7]);
    }

    #[test]
    fn test_odd_padding_drops_first_step() {
        let device = <TestBackend as Backend>::Device::default();
        let mut conv = SameConv1dConfig::new(1, 1, 4).init::<TestBackend>(&device);
        conv.conv.weight = Param::from_tensor(Tensor::ones([1, 1, 4], &device));
        conv.conv.bias = None;

        // One zero on the left and two on the right, as Keras pads
        let x = Tensor::<TestBackend, 3>::ones([1, 1, 6], &device);
        let values: Vec<f32> = conv.forward(x).into_data().to_vec().unwrap();
        assert_eq!(values, vec![3.0, 4.0, 4.0, 4.0, 3.0, 2.0]);
    }

        #[test]
    fn test_kernel_wider_than_sequence() {
        let device = <TestBackend as Backend>::Device::default();
        let conv = SameConv1dConfig::new(1, 2, 5)
            .with_dilation(2)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 3>::ones([1, 1, 3], &device);
        assert_eq!(conv.forward(x).dims(), [1, 2, 3]);
    }
}
