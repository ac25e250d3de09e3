//! Windowing of a token stream into fixed-length training pairs.

use crate::error::{NotationError, Result};
use crate::vocab::Vocab;

/// Fixed training window length, in tokens.
pub const SEQUENCE_LENGTH: usize = 30;

/// Slice an encoded token stream into overlapping `(window, next)` pairs,
/// step 1, in stream order.
///
/// Indices are returned raw; normalization by the vocabulary size happens
/// when the tensors are built. A stream no longer than the window cannot
/// produce a single pair and is rejected.
pub fn prepare_sequences(
    notes: &[String],
    vocab: &Vocab,
    sequence_length: usize,
) -> Result<(Vec<Vec<i64>>, Vec<i64>)> {
    if notes.len() <= sequence_length {
        return Err(NotationError::StreamTooShort {
            len: notes.len(),
            window: sequence_length,
        });
    }

    let ids = vocab.encode(notes)?;

    let mut network_input = Vec::with_capacity(ids.len() - sequence_length);
    let mut network_output = Vec::with_capacity(ids.len() - sequence_length);
    for i in 0..ids.len() - sequence_length {
        network_input.push(ids[i..i + sequence_length].to_vec());
        network_output.push(ids[i + sequence_length]);
    }

    Ok((network_input, network_output))
}
