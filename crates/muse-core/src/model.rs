use tch::nn::RNN;
use tch::{nn, Tensor};

use crate::config::ModelConfig;

/// Stacked recurrent classifier over note tokens.
///
/// Input is a `[batch, sequence_length, 1]` float tensor of token indices
/// normalized by the vocabulary size; output is a `[batch, n_vocab]` logits
/// tensor. Softmax is left to the loss at train time and to the sampler at
/// inference.
pub struct MuseLstm {
    lstm1: nn::LSTM,
    lstm2: nn::LSTM,
    lstm3: nn::LSTM,
    dense1: nn::Linear,
    dense2: nn::Linear,
    dropout: f64,
    pub config: ModelConfig,
}

impl MuseLstm {
    pub fn new(vs: &nn::Path, config: &ModelConfig) -> Self {
        let [units1, units2, units3] = config.lstm_units;
        let lstm1 = nn::lstm(vs / "lstm1", 1, units1, Default::default());
        let lstm2 = nn::lstm(vs / "lstm2", units1, units2, Default::default());
        let lstm3 = nn::lstm(vs / "lstm3", units2, units3, Default::default());
        let dense1 = nn::linear(vs / "dense1", units3, config.dense_units, Default::default());
        let dense2 = nn::linear(
            vs / "dense2",
            config.dense_units,
            config.n_vocab,
            Default::default(),
        );

        Self {
            lstm1,
            lstm2,
            lstm3,
            dense1,
            dense2,
            dropout: config.dropout,
            config: config.clone(),
        }
    }

    /// xs: `[batch, sequence_length, 1]` float. Returns `[batch, n_vocab]`
    /// logits.
    pub fn forward(&self, xs: &Tensor, train: bool) -> Tensor {
        let (hidden, _) = self.lstm1.seq(xs);
        let hidden = hidden.dropout(self.dropout, train);
        let (hidden, _) = self.lstm2.seq(&hidden);
        let hidden = hidden.dropout(self.dropout, train);
        let (hidden, _) = self.lstm3.seq(&hidden);

        // Only the final timestep feeds the classifier head.
        let steps = hidden.size()[1];
        let last = hidden.select(1, steps - 1);

        last.apply(&self.dense1)
            .dropout(self.dropout, train)
            .apply(&self.dense2)
    }
}

unsafe impl Send for MuseLstm {}
unsafe impl Sync for MuseLstm {}
