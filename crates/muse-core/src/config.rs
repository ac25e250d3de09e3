use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of distinct tokens the classifier predicts over.
    pub n_vocab: i64,
    /// Length of the input window, in tokens.
    pub sequence_length: i64,
    /// Hidden sizes of the three stacked recurrent layers.
    pub lstm_units: [i64; 3],
    /// Width of the fully-connected layer before the classifier head.
    pub dense_units: i64,
    /// Dropout probability applied between layers.
    pub dropout: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_vocab: 128, // overwritten from the corpus vocabulary before training
            sequence_length: 30,
            lstm_units: [256, 512, 256],
            dense_units: 256,
            dropout: 0.3,
        }
    }
}
