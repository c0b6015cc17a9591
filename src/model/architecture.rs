use crate::error::Result;
use crate::model::attention_lstm::{AttentionLstm, AttentionLstmConfig};
use crate::model::conv::{SameConv1d, SameConv1dConfig};
use crate::model::squeeze_excite::{SqueezeExcite, SqueezeExciteConfig};
use crate::model::{InputShape, NetworkConfig};
use burn::nn::*;
use burn::prelude::*;
use burn::tensor::activation::relu;
use tracing::debug;

/// MLSTM-FCN feature network
///
/// Two arms read the same sample: an LSTM over the channel-major sequence and
/// a stack of three same-length convolutions. Their summaries are concatenated
/// into one feature vector per sample.
#[derive(Module, Debug)]
pub struct MlstmFcn<B: Backend> {
    /// Plain recurrent cell (when attention is off)
    lstm: Option<Lstm<B>>,
    /// Attention recurrent cell (when attention is on)
    attention_lstm: Option<AttentionLstm<B>>,
    /// Dropout after the recurrent arm
    dropout: Dropout,
    /// Convolutional stages
    stages: Vec<ConvStage<B>>,
    /// Width of the merged feature vector
    output_width: usize,
}

/// One convolutional stage: conv -> batch norm -> relu, optionally gated
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    conv: SameConv1d<B>,
    norm: BatchNorm<B, 1>,
    squeeze_excite: Option<SqueezeExcite<B>>,
}

impl<B: Backend> ConvStage<B> {
    /// Forward pass over [batch_size, channels, length]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        let x = relu(x);

        match &self.squeeze_excite {
            Some(block) => block.forward(x),
            None => x,
        }
    }
}

impl<B: Backend> MlstmFcn<B> {
    /// Forward pass
    ///
    /// # Arguments
    /// * `input` - Tensor of shape [batch_size, timesteps, channels]
    ///
    /// # Returns
    /// * Feature tensor of shape [batch_size, lstm_size + filter_sizes[2]]
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        // Both arms read the channel-major layout [batch, channels, timesteps]
        let x = input.swap_dims(1, 2);

        let recurrent = self.dropout.forward(self.recurrent_arm(x.clone()));
        let convolutional = self.convolutional_arm(x);

        Tensor::cat(vec![recurrent, convolutional], 1)
    }

    /// Recurrent arm: channels are the sequence, timesteps the features
    fn recurrent_arm(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        match (&self.lstm, &self.attention_lstm) {
            (_, Some(cell)) => cell.forward(x),
            (Some(cell), None) => {
                let (_, state) = cell.forward(x, None);
                state.hidden
            }
            (None, None) => unreachable!("MlstmFcn is always built with a recurrent cell"),
        }
    }

    /// Convolutional arm: three stages then global average pooling over time
    fn convolutional_arm(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let y = self
            .stages
            .iter()
            .fold(x, |y, stage| stage.forward(y));

        let [batch_size, channels, _] = y.dims();
        y.mean_dim(2).reshape([batch_size, channels])
    }

    /// Width of the merged feature vector
    pub fn output_width(&self) -> usize {
        self.output_width
    }

    /// Whether the recurrent arm uses attention
    pub fn uses_attention(&self) -> bool {
        self.attention_lstm.is_some()
    }
}

/// Initialize MLSTM-FCN network from configuration
///
/// The backend RNG is seeded with `random_state` before any weight is drawn.
pub fn init_network<B: Backend>(
    config: &NetworkConfig,
    input_shape: InputShape,
    device: &B::Device,
) -> Result<MlstmFcn<B>> {
    config.validate()?;
    input_shape.validate()?;

    B::seed(config.random_state);

    // After the permute the recurrent cell sees `channels` steps of
    // `timesteps` features each
    let (lstm, attention_lstm) = if config.attention {
        debug!(
            "Recurrent arm: attention LSTM {} -> {}",
            input_shape.timesteps, config.lstm_size
        );
        let cell = AttentionLstmConfig::new(input_shape.timesteps, config.lstm_size).init(device);
        (None, Some(cell))
    } else {
        debug!(
            "Recurrent arm: LSTM {} -> {}",
            input_shape.timesteps, config.lstm_size
        );
        let cell = LstmConfig::new(input_shape.timesteps, config.lstm_size, true).init(device);
        (Some(cell), None)
    };

    let dropout = DropoutConfig::new(config.dropout).init();

    let mut stages = Vec::with_capacity(config.filter_sizes.len());
    let mut channels_in = input_shape.channels;
    let last = config.filter_sizes.len() - 1;

    for (i, (&filters, &kernel_size)) in config
        .filter_sizes
        .iter()
        .zip(config.kernel_sizes.iter())
        .enumerate()
    {
        debug!(
            "Conv stage {}: {} -> {} channels, kernel {}, dilation {}",
            i + 1,
            channels_in,
            filters,
            kernel_size,
            config.dilation_rate
        );

        let conv = SameConv1dConfig::new(channels_in, filters, kernel_size)
            .with_dilation(config.dilation_rate)
            .init(device);
        let norm = BatchNormConfig::new(filters).init(device);
        let squeeze_excite = (i < last).then(|| SqueezeExciteConfig::new(filters).init(device));

        stages.push(ConvStage {
            conv,
            norm,
            squeeze_excite,
        });
        channels_in = filters;
    }

    Ok(MlstmFcn {
        lstm,
        attention_lstm,
        dropout,
        stages,
        output_width: config.output_width(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_default_output_width() {
        let device = <TestBackend as Backend>::Device::default();
        let config = NetworkConfig::new();
        let network =
            init_network::<TestBackend>(&config, InputShape::new(128, 3), &device).unwrap();

        let input = Tensor::<TestBackend, 3>::zeros([2, 128, 3], &device);
        let output = network.forward(input);

        assert_eq!(output.dims(), [2, 69]);
        assert_eq!(network.output_width(), 69);
    }

    #[test]
    fn test_attention_keeps_output_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let shape = InputShape::new(16, 4);
        let config = NetworkConfig::small();

        let plain = init_network::<TestBackend>(&config, shape, &device).unwrap();
        let attention =
            init_network::<TestBackend>(&config.clone().with_attention(true), shape, &device)
                .unwrap();

        assert!(!plain.uses_attention());
        assert!(attention.uses_attention());

        let input = Tensor::<TestBackend, 3>::ones([3, 16, 4], &device);
        assert_eq!(plain.forward(input.clone()).dims(), [3, 20]);
        assert_eq!(attention.forward(input).dims(), [3, 20]);
    }

    #[test]
    fn test_short_univariate_series() {
        let device = <TestBackend as Backend>::Device::default();
        let config = NetworkConfig::new()
            .with_dilation_rate(1)
            .with_kernel_sizes(vec![5, 3, 1]);
        let network =
            init_network::<TestBackend>(&config, InputShape::new(10, 1), &device).unwrap();

        let input = Tensor::<TestBackend, 3>::ones([1, 10, 1], &device);
        assert_eq!(network.forward(input).dims(), [1, 69]);
    }

    #[test]
    fn test_stage_lengths_preserved() {
        let device = <TestBackend as Backend>::Device::default();
        let config = NetworkConfig::small()
            .with_dilation_rate(3)
            .with_kernel_sizes(vec![4, 2, 6]);
        let network =
            init_network::<TestBackend>(&config, InputShape::new(9, 2), &device).unwrap();

        let mut y = Tensor::<TestBackend, 3>::ones([1, 9, 2], &device).swap_dims(1, 2);
        for (stage, &filters) in network.stages.iter().zip(config.filter_sizes.iter()) {
            y = stage.forward(y);
            assert_eq!(y.dims(), [1, filters, 9]);
        }
    }

    #[test]
    fn test_dropout_does_not_change_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let shape = InputShape::new(12, 2);

        for dropout in [0.0, 0.5, 0.8] {
            let config = NetworkConfig::small().with_dropout(dropout);
            let network = init_network::<TestBackend>(&config, shape, &device).unwrap();
            let input = Tensor::<TestBackend, 3>::ones([2, 12, 2], &device);
            assert_eq!(network.forward(input).dims(), [2, 20]);
        }
    }

    #[test]
    fn test_filter_permutations() {
        let device = <TestBackend as Backend>::Device::default();
        let orders = [[8, 16, 32], [32, 8, 16], [16, 32, 8]];

        for filters in orders {
            let config = NetworkConfig::small()
                .with_filter_sizes(filters.to_vec())
                .with_kernel_sizes(vec![1, 5, 3]);
            let network =
                init_network::<TestBackend>(&config, InputShape::new(8, 3), &device).unwrap();
            let input = Tensor::<TestBackend, 3>::zeros([1, 8, 3], &device);
            assert_eq!(network.forward(input).dims(), [1, 4 + filters[2]]);
        }
    }

    #[test]
    fn test_squeeze_excite_after_first_two_stages() {
        let device = <TestBackend as Backend>::Device::default();
        let network = init_network::<TestBackend>(
            &NetworkConfig::small(),
            InputShape::new(8, 2),
            &device,
        )
        .unwrap();

        let gated: Vec<bool> = network
            .stages
            .iter()
            .map(|stage| stage.squeeze_excite.is_some())
            .collect();
        assert_eq!(gated, vec![true, true, false]);
    }

    #[test]
    fn test_invalid_configuration_fails_fast() {
        let device = <TestBackend as Backend>::Device::default();
        let config = NetworkConfig::new().with_kernel_sizes(vec![5, 3]);

        let result = init_network::<TestBackend>(&config, InputShape::new(10, 1), &device);
        assert!(matches!(result, Err(NetworkError::StageCount { .. })));

        let result =
            init_network::<TestBackend>(&NetworkConfig::new(), InputShape::new(0, 1), &device);
        assert!(matches!(result, Err(NetworkError::InvalidShape { .. })));
    }
}
