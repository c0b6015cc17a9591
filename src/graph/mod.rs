//! Static topology description with per-node shape inference.
//!
//! Nodes are appended in construction order, so node ids are already a
//! topological order. Shapes are per sample (no batch axis) and channels-last,
//! matching the `(timesteps, channels)` input convention.
//!
//! Node names are unique within a graph. [`Graph::add`] rejects a taken name,
//! while [`Graph::add_unique`] suffixes it (`lstm`, `lstm_1`, `lstm_2`, ...) so
//! several networks can be built into the same graph.

pub mod summary;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{NetworkError, Result};

/// Handle to a node inside a [`Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-sample tensor shape
pub type Shape = Vec<usize>;

/// Elementwise activation functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
}

/// Weight initialization schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightInit {
    HeUniform,
}

/// Layer kinds understood by the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayerKind {
    /// Graph input placeholder
    Input { shape: Shape },
    /// Axis permutation (1-based, batch axis excluded)
    Permute { dims: Vec<usize> },
    /// LSTM returning its last hidden state
    Lstm { units: usize },
    /// Attention LSTM returning its last hidden state
    AttentionLstm { units: usize },
    /// Training-time dropout
    Dropout { rate: f64 },
    /// Same-length 1-D convolution over the time axis
    Conv1d {
        filters: usize,
        kernel_size: usize,
        dilation: usize,
        init: WeightInit,
    },
    /// Batch normalisation over the channel axis
    BatchNorm,
    /// Elementwise activation
    Activation { function: Activation },
    /// Squeeze-and-excite channel gating
    SqueezeExcite { reduced: usize },
    /// Mean over the time axis
    GlobalAveragePool1d,
    /// Concatenation along the last axis
    Concatenate,
}

impl LayerKind {
    /// Short operation name
    pub fn op_name(&self) -> &'static str {
        match self {
            LayerKind::Input { .. } => "Input",
            LayerKind::Permute { .. } => "Permute",
            LayerKind::Lstm { .. } => "LSTM",
            LayerKind::AttentionLstm { .. } => "AttentionLSTM",
            LayerKind::Dropout { .. } => "Dropout",
            LayerKind::Conv1d { .. } => "Conv1D",
            LayerKind::BatchNorm => "BatchNorm",
            LayerKind::Activation { .. } => "Activation",
            LayerKind::SqueezeExcite { .. } => "SqueezeExcite",
            LayerKind::GlobalAveragePool1d => "GlobalAvgPool1D",
            LayerKind::Concatenate => "Concatenate",
        }
    }

    /// Infer the output shape from the input shapes
    fn infer_shape(&self, name: &str, inputs: &[&Shape]) -> Result<Shape> {
        let mismatch = |message: String| NetworkError::shape_mismatch(name, message);

        if let LayerKind::Input { shape } = self {
            if !inputs.is_empty() {
                return Err(mismatch("input node takes no inputs".to_string()));
            }
            return Ok(shape.clone());
        }

        if let LayerKind::Concatenate = self {
            if inputs.len() < 2 {
                return Err(mismatch(format!("expected at least 2 inputs, got {}", inputs.len())));
            }
            let rank = inputs[0].len();
            if rank == 0 || inputs.iter().any(|s| s.len() != rank) {
                return Err(mismatch("inputs must share a non-zero rank".to_string()));
            }
            if inputs.iter().any(|s| s[..rank - 1] != inputs[0][..rank - 1]) {
                return Err(mismatch("inputs differ outside the concatenation axis".to_string()));
            }
            let mut shape = inputs[0].clone();
            shape[rank - 1] = inputs.iter().map(|s| s[rank - 1]).sum();
            return Ok(shape);
        }

        let input = match inputs {
            [single] => *single,
            _ => return Err(mismatch(format!("expected 1 input, got {}", inputs.len()))),
        };

        match self {
            LayerKind::Permute { dims } => {
                let mut sorted = dims.clone();
                sorted.sort_unstable();
                if sorted != (1..=input.len()).collect::<Vec<_>>() {
                    return Err(mismatch(format!(
                        "permutation {:?} does not match rank {}",
                        dims,
                        input.len()
                    )));
                }
                Ok(dims.iter().map(|&d| input[d - 1]).collect())
            }
            LayerKind::Lstm { units } | LayerKind::AttentionLstm { units } => {
                expect_rank(input, 2, &mismatch)?;
                Ok(vec![*units])
            }
            LayerKind::Conv1d { filters, .. } => {
                expect_rank(input, 2, &mismatch)?;
                Ok(vec![input[0], *filters])
            }
            LayerKind::SqueezeExcite { .. } => {
                expect_rank(input, 2, &mismatch)?;
                Ok(input.clone())
            }
            LayerKind::GlobalAveragePool1d => {
                expect_rank(input, 2, &mismatch)?;
                Ok(vec![input[1]])
            }
            LayerKind::Dropout { .. } | LayerKind::BatchNorm | LayerKind::Activation { .. } => {
                Ok(input.clone())
            }
            LayerKind::Input { .. } | LayerKind::Concatenate => unreachable!("handled above"),
        }
    }
}

fn expect_rank<F>(shape: &Shape, rank: usize, mismatch: &F) -> Result<()>
where
    F: Fn(String) -> NetworkError,
{
    if shape.len() != rank {
        return Err(mismatch(format!(
            "expected rank {} input, got shape {:?}",
            rank, shape
        )));
    }
    Ok(())
}

/// A node of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: LayerKind,
    pub inputs: Vec<NodeId>,
    pub shape: Shape,
}

/// Append-only computation graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input placeholder under the first free name derived from `base`
    pub fn input(&mut self, base: &str, shape: Shape) -> Result<NodeId> {
        self.add_unique(base, LayerKind::Input { shape }, &[])
    }

    /// Add a node fed by `inputs`, inferring its output shape
    pub fn add(
        &mut self,
        name: impl Into<String>,
        kind: LayerKind,
        inputs: &[NodeId],
    ) -> Result<NodeId> {
        let name = name.into();

        if self.find(&name).is_some() {
            return Err(NetworkError::DuplicateName { name });
        }

        let input_shapes = inputs
            .iter()
            .map(|id| {
                self.nodes
                    .get(id.0)
                    .map(|n| &n.shape)
                    .ok_or_else(|| NetworkError::shape_mismatch(&name, format!("unknown input {}", id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let shape = kind.infer_shape(&name, &input_shapes)?;
        let id = NodeId(self.nodes.len());

        self.nodes.push(Node {
            id,
            name,
            kind,
            inputs: inputs.to_vec(),
            shape,
        });

        Ok(id)
    }

    /// Add a node under `base`, or under the first free `base_{n}` if taken
    pub fn add_unique(&mut self, base: &str, kind: LayerKind, inputs: &[NodeId]) -> Result<NodeId> {
        let name = self.unique_name(base);
        self.add(name, kind, inputs)
    }

    /// First free name among `base`, `base_1`, `base_2`, ...
    pub fn unique_name(&self, base: &str) -> String {
        if self.find(base).is_none() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|name| self.find(name).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look up a node by name
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Output shape of a node
    pub fn shape(&self, id: NodeId) -> Option<&Shape> {
        self.node(id).map(|n| &n.shape)
    }

    /// All nodes in construction (topological) order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that consume the output of `id`
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.inputs.contains(&id))
            .map(|n| n.id)
            .collect()
    }
}
