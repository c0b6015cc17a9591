use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, softmax, tanh};

/// LSTM with additive attention over its own input sequence
///
/// At every step the previous hidden state scores each input step
/// (`v^T tanh(W x_j + U h)`), the softmax-weighted sum of the inputs forms a
/// context vector, and the context is fed to the gates next to the current
/// input and the previous hidden state.
#[derive(Module, Debug)]
pub struct AttentionLstm<B: Backend> {
    /// Input contribution to the four gates
    input_gates: Linear<B>,
    /// Hidden state contribution to the four gates
    hidden_gates: Linear<B>,
    /// Context contribution to the four gates
    context_gates: Linear<B>,
    /// Attention projection of the input steps
    attention_input: Linear<B>,
    /// Attention projection of the hidden state
    attention_hidden: Linear<B>,
    /// Attention score vector
    attention_score: Linear<B>,
    d_hidden: usize,
}

/// Attention LSTM configuration
#[derive(Config, Debug)]
pub struct AttentionLstmConfig {
    /// Features per input step
    pub d_input: usize,
    /// Hidden state width
    pub d_hidden: usize,
}

impl AttentionLstmConfig {
    /// Initialize attention LSTM
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentionLstm<B> {
        let gates = 4 * self.d_hidden;

        AttentionLstm {
            input_gates: LinearConfig::new(self.d_input, gates).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, gates)
                .with_bias(false)
                .init(device),
            context_gates: LinearConfig::new(self.d_input, gates)
                .with_bias(false)
                .init(device),
            attention_input: LinearConfig::new(self.d_input, self.d_hidden)
                .with_bias(false)
                .init(device),
            attention_hidden: LinearConfig::new(self.d_hidden, self.d_hidden).init(device),
            attention_score: LinearConfig::new(self.d_hidden, 1)
                .with_bias(false)
                .init(device),
            d_hidden: self.d_hidden,
        }
    }
}

impl<B: Backend> AttentionLstm<B> {
    /// Attention weights of every input step for a given hidden state
    ///
    /// # Arguments
    /// * `projected` - Attention projection of the inputs [batch_size, seq_len, d_hidden]
    /// * `hidden` - Previous hidden state [batch_size, d_hidden]
    ///
    /// # Returns
    /// * Tensor of shape [batch_size, seq_len, 1] summing to one over the sequence
    fn attention_weights(&self, projected: Tensor<B, 3>, hidden: Tensor<B, 2>) -> Tensor<B, 3> {
        let query = self.attention_hidden.forward(hidden).unsqueeze_dim::<3>(1);
        let scores = self.attention_score.forward(tanh(projected + query));
        softmax(scores, 1)
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, seq_len, d_input]
    ///
    /// # Returns
    /// * Last hidden state of shape [batch_size, d_hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let device = x.device();
        let [batch_size, seq_len, d_input] = x.dims();

        let projected = self.attention_input.forward(x.clone());

        let mut hidden = Tensor::<B, 2>::zeros([batch_size, self.d_hidden], &device);
        let mut cell = Tensor::<B, 2>::zeros([batch_size, self.d_hidden], &device);

        for t in 0..seq_len {
            let x_t = x.clone().narrow(1, t, 1).reshape([batch_size, d_input]);

            let weights = self.attention_weights(projected.clone(), hidden.clone());
            let context = x
                .clone()
                .mul(weights)
                .sum_dim(1)
                .reshape([batch_size, d_input]);

            let gates = self.input_gates.forward(x_t)
                + self.hidden_gates.forward(hidden)
                + self.context_gates.forward(context);

            let h = self.d_hidden;
            let input_gate = gates.clone().narrow(1, 0, h);
            let forget_gate = gates.clone().narrow(1, h, h);
            let candidate = gates.clone().narrow(1, 2 * h, h);
            let output_gate = gates.narrow(1, 3 * h, h);

            cell = sigmoid(forget_gate) * cell + sigmoid(input_gate) * tanh(candidate);
            hidden = sigmoid(output_gate) * tanh(cell.clone());
        }

        hidden
    }

    /// Hidden state width
    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }
}
