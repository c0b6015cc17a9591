//! Network builders.
//!
//! A [`DeepNetwork`] turns an input shape into two things: a static topology
//! wired into a [`Graph`] (returning its input and output handles) and an
//! executable burn module with the same wiring.

use burn::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::graph::summary::GraphSummary;
use crate::graph::{Activation, Graph, LayerKind, NodeId, WeightInit};
use crate::model::architecture::{init_network, MlstmFcn};
use crate::model::squeeze_excite::SqueezeExciteConfig;
use crate::model::{InputShape, NetworkConfig};

/// Capability expected by an estimator that fits and predicts with a network
pub trait DeepNetwork {
    /// Executable network for a backend
    type Network<B: Backend>: Module<B>;

    /// Wire the topology into `graph` and return its input and output nodes
    fn build_network(&self, graph: &mut Graph, input_shape: InputShape) -> Result<(NodeId, NodeId)>;

    /// Instantiate the executable network with freshly initialised weights
    fn init<B: Backend>(
        &self,
        input_shape: InputShape,
        device: &B::Device,
    ) -> Result<Self::Network<B>>;

    /// Width of the output feature vector
    fn output_width(&self) -> usize;
}

/// A graph together with its input and output handles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub graph: Graph,
    pub input: NodeId,
    pub output: NodeId,
}

impl Topology {
    /// Per-sample output shape
    pub fn output_shape(&self) -> &[usize] {
        self.graph.shape(self.output).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Layer table
    pub fn summary(&self) -> GraphSummary {
        GraphSummary::new(&self.graph, self.input, self.output)
    }
}

/// Build a network's topology into a fresh graph
pub fn describe<N: DeepNetwork>(network: &N, input_shape: InputShape) -> Result<Topology> {
    let mut graph = Graph::new();
    let (input, output) = network.build_network(&mut graph, input_shape)?;
    Ok(Topology {
        graph,
        input,
        output,
    })
}

/// MLSTM-FCN builder
#[derive(Debug, Clone)]
pub struct MlstmFcnNetwork {
    config: NetworkConfig,
}

impl MlstmFcnNetwork {
    /// Create a builder from a configuration
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    /// Configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    fn recurrent_arm(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId> {
        let x = graph.add_unique("permute", LayerKind::Permute { dims: vec![2, 1] }, &[input])?;

        let units = self.config.lstm_size;
        let x = if self.config.attention {
            graph.add_unique("attention_lstm", LayerKind::AttentionLstm { units }, &[x])?
        } else {
            graph.add_unique("lstm", LayerKind::Lstm { units }, &[x])?
        };

        graph.add_unique(
            "dropout",
            LayerKind::Dropout {
                rate: self.config.dropout,
            },
            &[x],
        )
    }

    fn convolutional_arm(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId> {
        let stages = self.config.filter_sizes.len();
        let mut y = input;

        for (i, (&filters, &kernel_size)) in self
            .config
            .filter_sizes
            .iter()
            .zip(self.config.kernel_sizes.iter())
            .enumerate()
        {
            let stage = i + 1;

            y = graph.add_unique(
                &format!("conv1d_{}", stage),
                LayerKind::Conv1d {
                    filters,
                    kernel_size,
                    dilation: self.config.dilation_rate,
                    init: WeightInit::HeUniform,
                },
                &[y],
            )?;
            y = graph.add_unique(&format!("batch_norm_{}", stage), LayerKind::BatchNorm, &[y])?;
            y = graph.add_unique(
                &format!("relu_{}", stage),
                LayerKind::Activation {
                    function: Activation::Relu,
                },
                &[y],
            )?;

            if stage < stages {
                let reduced = SqueezeExciteConfig::new(filters).reduced_width();
                y = graph.add_unique(
                    &format!("squeeze_excite_{}", stage),
                    LayerKind::SqueezeExcite { reduced },
                    &[y],
                )?;
            }
        }

        graph.add_unique("global_avg_pool", LayerKind::GlobalAveragePool1d, &[y])
    }
}

impl Default for MlstmFcnNetwork {
    fn default() -> Self {
        Self::new(NetworkConfig::new())
    }
}

impl DeepNetwork for MlstmFcnNetwork {
    type Network<B: Backend> = MlstmFcn<B>;

    fn build_network(&self, graph: &mut Graph, input_shape: InputShape) -> Result<(NodeId, NodeId)> {
        self.config.validate()?;
        input_shape.validate()?;

        debug!("Building MLSTM-FCN topology: {:?}", self.config);

        let input = graph.input("input", vec![input_shape.timesteps, input_shape.channels])?;
        let recurrent = self.recurrent_arm(graph, input)?;
        let convolutional = self.convolutional_arm(graph, input)?;
        let output = graph.add_unique("concatenate", LayerKind::Concatenate, &[recurrent, convolutional])?;

        info!(
            "MLSTM-FCN topology: {} nodes, input {:?}, output width {}",
            graph.len(),
            (input_shape.timesteps, input_shape.channels),
            self.config.output_width()
        );

        Ok((input, output))
    }

    fn init<B: Backend>(
        &self,
        input_shape: InputShape,
        device: &B::Device,
    ) -> Result<Self::Network<B>> {
        init_network(&self.config, input_shape, device)
    }

    fn output_width(&self) -> usize {
        self.config.output_width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn topology(config: NetworkConfig, shape: (usize, usize)) -> Result<Topology> {
        describe(&MlstmFcnNetwork::new(config), shape.into())
    }

    #[test]
    fn test_default_scenario_width() {
        let topology = topology(NetworkConfig::new(), (128, 3)).unwrap();
        assert_eq!(topology.output_shape(), &[69]);
        assert_eq!(topology.graph.shape(topology.input), Some(&vec![128, 3]));
    }

    #[test]
    fn test_node_sequence() {
        let topology = topology(NetworkConfig::new(), (128, 3)).unwrap();
        let names: Vec<&str> = topology
            .graph
            .nodes()
            .iter()
            .map(|n| n.name.as_str())
            .collect();

        assert_eq!(
            names,
            vec![
                "input",
                "permute",
                "lstm",
                "dropout",
                "conv1d_1",
                "batch_norm_1",
                "relu_1",
                "squeeze_excite_1",
                "conv1d_2",
                "batch_norm_2",
                "relu_2",
                "squeeze_excite_2",
                "conv1d_3",
                "batch_norm_3",
                "relu_3",
                "global_avg_pool",
                "concatenate",
            ]
        );
    }

    #[test]
    fn test_arms_share_input_and_meet_at_merge() {
        let topology = topology(NetworkConfig::new(), (128, 3)).unwrap();
        let graph = &topology.graph;

        let permute = graph.find("permute").unwrap().id;
        let conv = graph.find("conv1d_1").unwrap().id;
        assert_eq!(graph.consumers(topology.input), vec![permute, conv]);

        let merge = graph.node(topology.output).unwrap();
        let dropout = graph.find("dropout").unwrap().id;
        let pool = graph.find("global_avg_pool").unwrap().id;
        assert_eq!(merge.inputs, vec![dropout, pool]);

        assert_eq!(graph.find("permute").unwrap().shape, vec![3, 128]);
        assert_eq!(graph.find("lstm").unwrap().shape, vec![5]);
        assert_eq!(graph.find("relu_3").unwrap().shape, vec![128, 64]);
        assert_eq!(graph.find("global_avg_pool").unwrap().shape, vec![64]);
    }

    #[test]
    fn test_attention_only_changes_recurrent_node() {
        let plain = topology(NetworkConfig::new(), (50, 4)).unwrap();
        let attention = topology(NetworkConfig::new().with_attention(true), (50, 4)).unwrap();

        assert_eq!(plain.output_shape(), attention.output_shape());
        assert!(plain.graph.find("lstm").is_some());
        assert!(attention.graph.find("attention_lstm").is_some());
        assert!(attention.graph.find("lstm").is_none());

        let differing = plain
            .graph
            .nodes()
            .iter()
            .zip(attention.graph.nodes())
            .filter(|(a, b)| a.kind != b.kind)
            .count();
        assert_eq!(differing, 1);
    }

    #[test]
    fn test_squeeze_excite_widths() {
        let topology = topology(NetworkConfig::new(), (20, 2)).unwrap();
        let graph = &topology.graph;

        assert_eq!(
            graph.find("squeeze_excite_1").unwrap().kind,
            LayerKind::SqueezeExcite { reduced: 4 }
        );
        assert_eq!(
            graph.find("squeeze_excite_2").unwrap().kind,
            LayerKind::SqueezeExcite { reduced: 8 }
        );
        assert!(graph.find("squeeze_excite_3").is_none());
    }

    #[test]
    fn test_dropout_zero_same_shape() {
        let zero = topology(NetworkConfig::new().with_dropout(0.0), (30, 2)).unwrap();
        let high = topology(NetworkConfig::new().with_dropout(0.9), (30, 2)).unwrap();

        let shapes = |t: &Topology| t.graph.nodes().iter().map(|n| n.shape.clone()).collect::<Vec<_>>();
        assert_eq!(shapes(&zero), shapes(&high));
    }

    #[test]
    fn test_permutations_of_stage_lists() {
        let kernels = [[5, 3, 1], [1, 5, 3], [3, 1, 5]];
        let filters = [[64, 128, 64], [128, 64, 64], [64, 64, 128]];

        for k in kernels {
            for f in filters {
                let config = NetworkConfig::new()
                    .with_kernel_sizes(k.to_vec())
                    .with_filter_sizes(f.to_vec());
                let topology = topology(config, (16, 3)).unwrap();
                assert_eq!(topology.output_shape(), &[5 + f[2]]);
            }
        }
    }

    #[test]
    fn test_wrong_stage_lengths_fail() {
        for len in [0, 1, 2, 4] {
            let config = NetworkConfig::new().with_filter_sizes(vec![32; len]);
            let result = topology(config, (16, 3));
            assert!(matches!(result, Err(NetworkError::StageCount { .. })));
        }
    }

    #[test]
    fn test_short_series_keeps_length() {
        let config = NetworkConfig::new()
            .with_dilation_rate(1)
            .with_kernel_sizes(vec![5, 3, 1]);
        let topology = topology(config, (10, 1)).unwrap();

        for stage in 1..=3 {
            let conv = topology.graph.find(&format!("conv1d_{}", stage)).unwrap();
            assert_eq!(conv.shape[0], 10);
        }
    }

    #[test]
    fn test_graph_matches_executable_network() {
        let device = <TestBackend as Backend>::Device::default();
        let builder = MlstmFcnNetwork::new(NetworkConfig::small().with_attention(true));
        let shape = InputShape::new(12, 3);

        let topology = describe(&builder, shape).unwrap();
        let network = builder.init::<TestBackend>(shape, &device).unwrap();

        let input = Tensor::<TestBackend, 3>::ones([4, 12, 3], &device);
        let output = network.forward(input);

        assert_eq!(output.dims()[1], topology.output_shape()[0]);
        assert_eq!(builder.output_width(), network.output_width());
    }

    #[test]
    fn test_summary_names_io_nodes() {
        let topology = topology(NetworkConfig::new(), (128, 3)).unwrap();
        let summary = topology.summary();

        assert_eq!(summary.input, "input");
        assert_eq!(summary.output, "concatenate");
        assert_eq!(summary.output_width, 69);
        assert_eq!(summary.rows.len(), topology.graph.len());
    }

    #[test]
    fn test_two_networks_share_one_graph() {
        let mut graph = Graph::new();
        let plain = MlstmFcnNetwork::default();
        let attention = MlstmFcnNetwork::new(NetworkConfig::small().with_attention(true));

        let (input_a, output_a) = plain.build_network(&mut graph, InputShape::new(128, 3)).unwrap();
        let (input_b, output_b) = attention.build_network(&mut graph, InputShape::new(20, 2)).unwrap();

        assert_ne!(input_a, input_b);
        assert_eq!(graph.shape(output_a), Some(&vec![69]));
        assert_eq!(graph.shape(output_b), Some(&vec![20]));
        assert_eq!(graph.shape(input_b), Some(&vec![20, 2]));

        assert_eq!(graph.node(input_b).unwrap().name, "input_1");
        assert_eq!(graph.node(output_b).unwrap().name, "concatenate_1");
        assert!(graph.find("conv1d_1_1").is_some());
        assert!(graph.find("attention_lstm").is_some());

        let mut names: Vec<&str> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), graph.len());

        let second = GraphSummary::new(&graph, input_b, output_b);
        assert_eq!(second.rows.len(), 17);
        assert_eq!(second.rows[0].name, "input_1");
        assert_eq!(second.output_width, 20);
    }
}
