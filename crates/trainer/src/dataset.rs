use tch::{Device, Tensor};

/// Windowed training pairs as device tensors.
///
/// Inputs are `[n, sequence_length, 1]` floats, each index divided by the
/// vocabulary size; targets are `[n]` class indices. Pairs keep the order
/// the windower produced them in.
pub struct NoteDataset {
    inputs: Tensor,
    targets: Tensor,
    len: i64,
}

impl NoteDataset {
    pub fn new(
        network_input: &[Vec<i64>],
        network_output: &[i64],
        n_vocab: i64,
        device: Device,
    ) -> Self {
        let n = network_input.len();
        let sequence_length = network_input.first().map_or(0, Vec::len);

        let mut flat: Vec<f32> = Vec::with_capacity(n * sequence_length);
        for window in network_input {
            flat.extend(window.iter().map(|&id| id as f32 / n_vocab as f32));
        }

        let inputs = Tensor::from_slice(&flat)
            .view([n as i64, sequence_length as i64, 1])
            .to(device);
        let targets = Tensor::from_slice(network_output).to(device);

        Self {
            inputs,
            targets,
            len: n as i64,
        }
    }

    pub fn len(&self) -> i64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_batches(&self, batch_size: i64) -> i64 {
        (self.len + batch_size - 1) / batch_size
    }

    /// Sequential batch in stream order; the final batch may be short.
    pub fn batch(&self, index: i64, batch_size: i64) -> (Tensor, Tensor) {
        let start = index * batch_size;
        let size = batch_size.min(self.len - start);
        (
            self.inputs.narrow(0, start, size),
            self.targets.narrow(0, start, size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_and_normalization() {
        let input = vec![vec![0, 1, 2], vec![1, 2, 3], vec![2, 3, 0]];
        let output = vec![3, 0, 1];
        let dataset = NoteDataset::new(&input, &output, 4, Device::Cpu);

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.num_batches(2), 2);

        let (first, first_targets) = dataset.batch(0, 2);
        assert_eq!(first.size(), &[2, 3, 1]);
        assert_eq!(first_targets.size(), &[2]);
        let value = first.double_value(&[0, 1, 0]);
        assert!((value - 0.25).abs() < 1e-6);

        let (last, last_targets) = dataset.batch(1, 2);
        assert_eq!(last.size(), &[1, 3, 1]);
        assert_eq!(last_targets.int64_value(&[0]), 1);
    }
}
