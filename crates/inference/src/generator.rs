use rand::Rng;
use std::sync::Arc;
use tch::{Device, IndexOp, Kind, Tensor};
use thiserror::Error;

use muse_core::MuseLstm;
use notation::Vocab;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("seed stream of length {len} is too short for window length {window}")]
    SeedTooShort { len: usize, window: usize },

    #[error("seed token not in vocabulary: {0}")]
    UnknownToken(String),

    #[error("predicted index outside vocabulary: {0}")]
    BadIndex(i64),
}

/// Greedy autoregressive sampler over a trained model.
///
/// The only randomness is the position of the initial seed window; decoding
/// itself is argmax, so a fixed window position reproduces the same output
/// for the same weights.
pub struct Generator {
    model: Arc<MuseLstm>,
    device: Device,
}

impl Generator {
    pub fn new(model: Arc<MuseLstm>, device: Device) -> Self {
        Self { model, device }
    }

    /// Produce `steps` new tokens, seeding from a uniformly random window
    /// of the seed stream.
    pub fn generate(
        &self,
        seed: &[String],
        vocab: &Vocab,
        steps: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        let window = self.model.config.sequence_length as usize;
        if seed.len() <= window {
            return Err(GeneratorError::SeedTooShort {
                len: seed.len(),
                window,
            });
        }
        let start = rand::thread_rng().gen_range(0..seed.len() - window);
        self.generate_from(seed, vocab, steps, start)
    }

    /// Deterministic variant: decode from a fixed seed-window position.
    pub fn generate_from(
        &self,
        seed: &[String],
        vocab: &Vocab,
        steps: usize,
        start: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        let _guard = tch::no_grad_guard();
        let window = self.model.config.sequence_length as usize;
        let n_vocab = self.model.config.n_vocab;

        if seed.len() <= window || start > seed.len() - window {
            return Err(GeneratorError::SeedTooShort {
                len: seed.len(),
                window,
            });
        }

        // Encode through the training-time vocabulary; a foreign token in
        // the seed is fatal.
        let mut pattern: Vec<i64> = Vec::with_capacity(window);
        for token in &seed[start..start + window] {
            let id = vocab
                .get_id(token)
                .ok_or_else(|| GeneratorError::UnknownToken(token.clone()))?;
            pattern.push(id);
        }

        let mut output = Vec::with_capacity(steps);
        for _ in 0..steps {
            let normalized: Vec<f32> = pattern
                .iter()
                .map(|&id| id as f32 / n_vocab as f32)
                .collect();
            let input = Tensor::from_slice(&normalized)
                .view([1, window as i64, 1])
                .to(self.device);

            let logits = self.model.forward(&input, false);
            let probs = logits.softmax(-1, Kind::Float);
            let index = probs.i((0, ..)).argmax(0, false).int64_value(&[]);

            let token = vocab
                .get_token(index)
                .ok_or(GeneratorError::BadIndex(index))?;
            output.push(token.clone());

            // Slide the window: drop the oldest index, append the prediction.
            pattern.remove(0);
            pattern.push(index);
        }

        Ok(output)
    }
}

unsafe impl Send for Generator {}

#[cfg(test)]
mod tests {
    use super::*;
    use muse_core::ModelConfig;
    use tch::nn;

    fn tiny_model() -> Arc<MuseLstm> {
        let config = ModelConfig {
            n_vocab: 4,
            sequence_length: 3,
            lstm_units: [8, 8, 8],
            dense_units: 8,
            dropout: 0.0,
        };
        let vs = nn::VarStore::new(Device::Cpu);
        Arc::new(MuseLstm::new(&vs.root(), &config))
    }

    fn seed_stream() -> (Vec<String>, Vocab) {
        let alphabet = ["C4", "D4", "E4", "G4"];
        let seed: Vec<String> = (0..10).map(|i| alphabet[i % 4].to_string()).collect();
        let vocab = Vocab::from_tokens(&seed).unwrap();
        (seed, vocab)
    }

    #[test]
    fn test_greedy_decoding_is_deterministic() {
        let generator = Generator::new(tiny_model(), Device::Cpu);
        let (seed, vocab) = seed_stream();

        let first = generator.generate_from(&seed, &vocab, 20, 2).unwrap();
        let second = generator.generate_from(&seed, &vocab, 20, 2).unwrap();

        assert_eq!(first.len(), 20);
        assert_eq!(first, second);
        assert!(first.iter().all(|t| vocab.get_id(t).is_some()));
    }

    #[test]
    fn test_short_seed_is_rejected() {
        let generator = Generator::new(tiny_model(), Device::Cpu);
        let (seed, vocab) = seed_stream();

        let short = &seed[..3];
        assert!(matches!(
            generator.generate(short, &vocab, 5),
            Err(GeneratorError::SeedTooShort { len: 3, window: 3 })
        ));
    }

    #[test]
    fn test_foreign_seed_token_is_rejected() {
        let generator = Generator::new(tiny_model(), Device::Cpu);
        let (mut seed, vocab) = seed_stream();
        seed[4] = "B-7".to_string();

        assert!(matches!(
            generator.generate_from(&seed, &vocab, 5, 2),
            Err(GeneratorError::UnknownToken(t)) if t == "B-7"
        ));
    }
}
