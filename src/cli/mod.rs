use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{NetworkError, Result};
use crate::model::{InputShape, NetworkConfig};

/// MLSTM-FCN: multivariate LSTM fully convolutional network builder
#[derive(Parser, Debug)]
#[command(name = "mlstmfcn")]
#[command(about = "Build and inspect MLSTM-FCN time series classification networks")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the network topology for an input shape
    Describe(DescribeArgs),

    /// Write a configuration file with default hyperparameters
    InitConfig(InitConfigArgs),

    /// Instantiate the network and run a random batch through it
    Check(CheckArgs),
}

/// Network hyperparameters shared by the subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Network configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Use the attention LSTM
    #[arg(long)]
    pub attention: bool,

    /// Recurrent cell width
    #[arg(long)]
    pub lstm_size: Option<usize>,

    /// Dropout rate after the recurrent arm
    #[arg(long)]
    pub dropout: Option<f64>,

    /// Convolution dilation
    #[arg(long)]
    pub dilation_rate: Option<usize>,

    /// Filters of the three conv stages, comma separated
    #[arg(long, value_delimiter = ',')]
    pub filter_sizes: Option<Vec<usize>>,

    /// Kernel widths of the three conv stages, comma separated
    #[arg(long, value_delimiter = ',')]
    pub kernel_sizes: Option<Vec<usize>>,

    /// Random seed for weight initialisation
    #[arg(long)]
    pub seed: Option<u64>,
}

impl NetworkArgs {
    /// Resolve the configuration: file (or defaults) then command-line overrides
    pub fn resolve(&self) -> Result<NetworkConfig> {
        let mut config = match &self.config {
            Some(path) => NetworkConfig::from_file(path)?,
            None => NetworkConfig::new(),
        };

        if self.attention {
            config = config.with_attention(true);
        }
        if let Some(lstm_size) = self.lstm_size {
            config = config.with_lstm_size(lstm_size);
        }
        if let Some(dropout) = self.dropout {
            config = config.with_dropout(dropout);
        }
        if let Some(dilation_rate) = self.dilation_rate {
            config = config.with_dilation_rate(dilation_rate);
        }
        if let Some(filter_sizes) = &self.filter_sizes {
            config = config.with_filter_sizes(filter_sizes.clone());
        }
        if let Some(kernel_sizes) = &self.kernel_sizes {
            config = config.with_kernel_sizes(kernel_sizes.clone());
        }
        if let Some(seed) = self.seed {
            config = config.with_random_state(seed);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Describe arguments
#[derive(Parser, Debug)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Time steps per sample
    #[arg(short, long, required = true)]
    pub timesteps: usize,

    /// Channels (variables) per time step
    #[arg(short = 'n', long, required = true)]
    pub channels: usize,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Init-config arguments
#[derive(Parser, Debug)]
pub struct InitConfigArgs {
    /// Output file
    #[arg(short, long, default_value = "mlstmfcn.json")]
    pub output: PathBuf,

    /// Preset (default, karim, small)
    #[arg(short, long, default_value = "default")]
    pub preset: String,
}

/// Check arguments
#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Time steps per sample
    #[arg(short, long, required = true)]
    pub timesteps: usize,

    /// Channels (variables) per time step
    #[arg(short = 'n', long, required = true)]
    pub channels: usize,

    /// Batch size of the random input
    #[arg(short, long, default_value = "8")]
    pub batch_size: usize,

    /// Number of classes for the classification head (0 = features only)
    #[arg(long, default_value = "0")]
    pub n_classes: usize,

    /// Device to use (cpu, cuda, wgpu)
    #[arg(short, long, default_value = "cpu")]
    pub device: String,
}

impl CheckArgs {
    /// Reject a batch or sample shape the check cannot run on
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(NetworkError::invalid_parameter("batch_size must be positive"));
        }
        InputShape::new(self.timesteps, self.channels).validate()
    }
}

/// Look up a configuration preset by name
pub fn preset(name: &str) -> Option<NetworkConfig> {
    match name.to_lowercase().as_str() {
        "default" => Some(NetworkConfig::new()),
        "karim" => Some(NetworkConfig::karim_default()),
        "small" => Some(NetworkConfig::small()),
        _ => None,
    }
}

/// Parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Setup logging based on verbosity
pub fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
