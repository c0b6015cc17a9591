//! # MLSTM-FCN: Multivariate LSTM Fully Convolutional Network
//!
//! Builder for the MLSTM-FCN time series classifier (Karim et al., 2019).
//! A recurrent arm and a convolutional arm with squeeze-and-excite blocks read
//! the same sample and are merged into one feature vector.
//!
//! ## Features
//!
//! - Static topology description with per-node shape inference
//! - Executable burn network for any backend
//! - Optional attention LSTM in the recurrent arm
//! - Dense classification head with softmax probabilities
//! - JSON configuration files
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use burn::prelude::*;
//! use mlstmfcn::model::{InputShape, NetworkConfig};
//! use mlstmfcn::network::{describe, DeepNetwork, MlstmFcnNetwork};
//!
//! let shape = InputShape::new(128, 3);
//! let builder = MlstmFcnNetwork::new(NetworkConfig::new().with_attention(true));
//!
//! // Static topology: input and output handles into a graph
//! let topology = describe(&builder, shape).unwrap();
//! assert_eq!(topology.output_shape(), &[69]);
//!
//! // Executable network on the CPU backend
//! let device = burn::backend::ndarray::NdArrayDevice::default();
//! let network = builder.init::<mlstmfcn::DefaultBackend>(shape, &device).unwrap();
//! let features = network.forward(Tensor::zeros([4, 128, 3], &device));
//! assert_eq!(features.dims(), [4, 69]);
//! ```

pub mod cli;
pub mod error;
pub mod graph;
pub mod model;
pub mod network;
pub mod runtime;
pub mod utils;

use burn::backend::NdArray;

/// Default backend type
pub type DefaultBackend = NdArray<f32>;

/// Re-export commonly used types
pub use error::NetworkError;
pub use graph::{Graph, NodeId};
pub use model::{architecture::MlstmFcn, InputShape, NetworkConfig};
pub use network::{describe, DeepNetwork, MlstmFcnNetwork, Topology};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!(
        "{} v{} - MLSTM-FCN time series network builder",
        NAME, VERSION
    )
}
