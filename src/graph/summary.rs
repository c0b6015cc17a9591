use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::{Graph, LayerKind, NodeId};

/// One row of a layer table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerRow {
    /// Node name
    pub name: String,
    /// Operation name
    pub op: String,
    /// Operation parameters in short form
    pub detail: String,
    /// Per-sample output shape
    pub shape: Vec<usize>,
    /// Names of the input nodes
    pub inputs: Vec<String>,
}

/// Layer table of a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Rows in topological order
    pub rows: Vec<LayerRow>,
    /// Input node name
    pub input: String,
    /// Output node name
    pub output: String,
    /// Width of the output node's last axis
    pub output_width: usize,
}

impl GraphSummary {
    /// Summarise the nodes built from `input` up to `output`
    pub fn new(graph: &Graph, input: NodeId, output: NodeId) -> Self {
        let name_of = |id: NodeId| {
            graph
                .node(id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let rows = graph
            .nodes()
            .iter()
            .filter(|node| (input..=output).contains(&node.id))
            .map(|node| LayerRow {
                name: node.name.clone(),
                op: node.kind.op_name().to_string(),
                detail: detail(&node.kind),
                shape: node.shape.clone(),
                inputs: node.inputs.iter().map(|&id| name_of(id)).collect(),
            })
            .collect();

        let output_width = graph
            .shape(output)
            .and_then(|s| s.last().copied())
            .unwrap_or(0);

        Self {
            rows,
            input: name_of(input),
            output: name_of(output),
            output_width,
        }
    }

    /// Render as a fixed-width text table
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "-".repeat(96);

        let _ = writeln!(out, "{:<20} {:<16} {:<26} {:<14} {}", "Layer", "Op", "Params", "Output", "Inputs");
        let _ = writeln!(out, "{}", rule);
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<20} {:<16} {:<26} {:<14} {}",
                row.name,
                row.op,
                row.detail,
                format!("{:?}", row.shape),
                row.inputs.join(", ")
            );
        }
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Input: {}  Output: {}  Feature width: {}", self.input, self.output, self.output_width);

        out
    }
}

fn detail(kind: &LayerKind) -> String {
    match kind {
        LayerKind::Input { .. } | LayerKind::BatchNorm | LayerKind::GlobalAveragePool1d => String::new(),
        LayerKind::Concatenate => "axis=-1".to_string(),
        LayerKind::Permute { dims } => format!("dims={:?}", dims),
        LayerKind::Lstm { units } | LayerKind::AttentionLstm { units } => format!("units={}", units),
        LayerKind::Dropout { rate } => format!("rate={}", rate),
        LayerKind::Conv1d {
            filters,
            kernel_size,
            dilation,
            ..
        } => format!("f={} k={} d={} same", filters, kernel_size, dilation),
        LayerKind::Activation { function } => format!("{:?}", function).to_lowercase(),
        LayerKind::SqueezeExcite { reduced } => format!("reduced={}", reduced),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Activation;

    #[test]
    fn test_summary_rows() {
        let mut graph = Graph::new();
        let input = graph.input("input", vec![8, 2]).unwrap();
        let relu = graph
            .add(
                "relu",
                LayerKind::Activation {
                    function: Activation::Relu,
                },
                &[input],
            )
            .unwrap();
        let pool = graph.add("pool", LayerKind::GlobalAveragePool1d, &[relu]).unwrap();

        let summary = GraphSummary::new(&graph, input, pool);
        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[1].detail, "relu");
        assert_eq!(summary.rows[2].inputs, vec!["relu".to_string()]);
        assert_eq!(summary.output_width, 2);

        let text = summary.render();
        assert!(text.contains("GlobalAvgPool1D"));
        assert!(text.contains("Feature width: 2"));
    }
}
