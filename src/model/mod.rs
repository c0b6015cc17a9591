pub mod architecture;
pub mod attention_lstm;
pub mod classifier;
pub mod conv;
pub mod squeeze_excite;

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{self, NetworkError};

/// Number of convolutional stages in the convolutional arm
pub const CONV_STAGES: usize = 3;

/// Network hyperparameters
#[derive(Config, Debug)]
pub struct NetworkConfig {
    /// Seed applied to the backend RNG before weights are drawn
    #[config(default = "0")]
    pub random_state: u64,

    /// Dropout rate after the recurrent arm
    #[config(default = "0.8")]
    pub dropout: f64,

    /// Use the attention LSTM instead of a plain LSTM
    #[config(default = "false")]
    pub attention: bool,

    /// Dilation of every convolution
    #[config(default = "2")]
    pub dilation_rate: usize,

    /// Output channels of the three conv stages
    #[config(default = "vec![64, 128, 64]")]
    pub filter_sizes: Vec<usize>,

    /// Kernel widths of the three conv stages
    #[config(default = "vec![5, 3, 1]")]
    pub kernel_sizes: Vec<usize>,

    /// Output width of the recurrent cell
    #[config(default = "5")]
    pub lstm_size: usize,
}

impl NetworkConfig {
    /// Hyperparameters used by Karim et al. for the UEA benchmarks
    pub fn karim_default() -> Self {
        Self::new()
            .with_dropout(0.8)
            .with_attention(false)
            .with_dilation_rate(1)
            .with_filter_sizes(vec![128, 256, 128])
            .with_kernel_sizes(vec![8, 5, 3])
            .with_lstm_size(8)
    }

    /// A narrow variant for quick experiments
    pub fn small() -> Self {
        Self::new()
            .with_dropout(0.2)
            .with_filter_sizes(vec![16, 32, 16])
            .with_kernel_sizes(vec![5, 3, 1])
            .with_lstm_size(4)
    }

    /// Check the hyperparameters before any node is built.
    ///
    /// Stage lists are checked first so that a wrong length is reported as a
    /// bounds error rather than as a value error on a missing stage.
    pub fn validate(&self) -> error::Result<()> {
        check_stage_count("filter_sizes", &self.filter_sizes)?;
        check_stage_count("kernel_sizes", &self.kernel_sizes)?;

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(NetworkError::invalid_parameter(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.dilation_rate == 0 {
            return Err(NetworkError::invalid_parameter("dilation_rate must be positive"));
        }
        if self.lstm_size == 0 {
            return Err(NetworkError::invalid_parameter("lstm_size must be positive"));
        }
        if let Some(i) = self.filter_sizes.iter().position(|&f| f == 0) {
            return Err(NetworkError::invalid_parameter(format!(
                "filter_sizes[{}] must be positive",
                i
            )));
        }
        if let Some(i) = self.kernel_sizes.iter().position(|&k| k == 0) {
            return Err(NetworkError::invalid_parameter(format!(
                "kernel_sizes[{}] must be positive",
                i
            )));
        }

        Ok(())
    }

    /// Width of the merged feature vector
    pub fn output_width(&self) -> usize {
        self.lstm_size + self.filter_sizes.last().copied().unwrap_or(0)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> error::Result<Self> {
        let path = path.as_ref();
        let config = <Self as Config>::load(path)
            .map_err(|e| NetworkError::Config(format!("{}: {:?}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

fn check_stage_count(field: &'static str, values: &[usize]) -> error::Result<()> {
    if values.len() != CONV_STAGES {
        return Err(NetworkError::StageCount {
            field,
            expected: CONV_STAGES,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Shape of one unbatched sample: time steps by channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    /// Sequence length
    pub timesteps: usize,
    /// Number of variables per time step
    pub channels: usize,
}

impl InputShape {
    /// Create a new input shape
    pub fn new(timesteps: usize, channels: usize) -> Self {
        Self { timesteps, channels }
    }

    /// Reject empty dimensions
    pub fn validate(&self) -> error::Result<()> {
        if self.timesteps == 0 {
            return Err(NetworkError::invalid_shape("timesteps must be positive"));
        }
        if self.channels == 0 {
            return Err(NetworkError::invalid_shape("channels must be positive"));
        }
        Ok(())
    }
}

impl From<(usize, usize)> for InputShape {
    fn from((timesteps, channels): (usize, usize)) -> Self {
        Self::new(timesteps, channels)
    }
}
