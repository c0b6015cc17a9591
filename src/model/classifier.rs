use crate::error::{self, NetworkError};
use crate::model::architecture::{init_network, MlstmFcn};
use crate::model::{InputShape, NetworkConfig};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::softmax;

/// Classifier configuration
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    /// Feature network hyperparameters
    pub network: NetworkConfig,
    /// Number of target classes
    #[config(default = "2")]
    pub n_classes: usize,
}

/// MLSTM-FCN with a dense classification head on the merged features
#[derive(Module, Debug)]
pub struct MlstmFcnClassifier<B: Backend> {
    network: MlstmFcn<B>,
    head: Linear<B>,
}

/// Classifier output
#[derive(Debug, Clone)]
pub struct ClassifierOutput<B: Backend> {
    /// Class probabilities [batch_size, n_classes]
    pub probabilities: Tensor<B, 2>,
    /// Most probable class per sample
    pub predictions: Tensor<B, 1, Int>,
}

impl ClassifierConfig {
    /// Initialize classifier
    pub fn init<B: Backend>(
        &self,
        input_shape: InputShape,
        device: &B::Device,
    ) -> error::Result<MlstmFcnClassifier<B>> {
        if self.n_classes < 2 {
            return Err(NetworkError::invalid_parameter(format!(
                "n_classes must be at least 2, got {}",
                self.n_classes
            )));
        }

        let network = init_network(&self.network, input_shape, device)?;
        let head = LinearConfig::new(network.output_width(), self.n_classes).init(device);

        Ok(MlstmFcnClassifier { network, head })
    }
}

impl<B: Backend> MlstmFcnClassifier<B> {
    /// Class logits for a batch of [batch_size, timesteps, channels]
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        self.head.forward(self.network.forward(input))
    }

    /// Class probabilities
    pub fn predict_proba(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        softmax(self.forward(input), 1)
    }

    /// Probabilities and most probable class
    pub fn predict(&self, input: Tensor<B, 3>) -> ClassifierOutput<B> {
        let probabilities = self.predict_proba(input);
        let predictions = probabilities.clone().argmax(1).squeeze(1);

        ClassifierOutput {
            probabilities,
            predictions,
        }
    }

    /// Feature network
    pub fn network(&self) -> &MlstmFcn<B> {
        &self.network
    }
}
