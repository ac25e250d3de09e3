use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{NotationError, Result};

/// Sorted set of distinct tokens with a fixed integer assignment.
///
/// Token -> index is a bijection onto `[0, n_vocab)`; the order is the
/// lexicographic sort of the token strings, so a vocabulary is fully
/// determined by the token set. Immutable once built.
#[derive(Debug, Clone)]
pub struct Vocab {
    pitchnames: Vec<String>,
    token_to_id: HashMap<String, i64>,
}

impl Vocab {
    /// Build the vocabulary of a token stream.
    pub fn from_tokens(tokens: &[String]) -> Result<Self> {
        let mut pitchnames = tokens.to_vec();
        pitchnames.sort();
        pitchnames.dedup();
        if pitchnames.is_empty() {
            return Err(NotationError::EmptyCorpus);
        }
        Ok(Self::from_pitchnames(pitchnames))
    }

    /// Rebuild a vocabulary from an already-sorted pitchname list, as
    /// persisted alongside the token stream.
    pub fn from_pitchnames(pitchnames: Vec<String>) -> Self {
        let token_to_id = pitchnames
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id as i64))
            .collect();
        Self {
            pitchnames,
            token_to_id,
        }
    }

    pub fn get_id(&self, token: &str) -> Option<i64> {
        self.token_to_id.get(token).copied()
    }

    pub fn get_token(&self, id: i64) -> Option<&String> {
        usize::try_from(id).ok().and_then(|i| self.pitchnames.get(i))
    }

    pub fn pitchnames(&self) -> &[String] {
        &self.pitchnames
    }

    pub fn len(&self) -> usize {
        self.pitchnames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitchnames.is_empty()
    }

    /// Encode a token stream to indices. Any token outside the vocabulary
    /// is an error.
    pub fn encode(&self, tokens: &[String]) -> Result<Vec<i64>> {
        tokens
            .iter()
            .map(|token| {
                self.get_id(token)
                    .ok_or_else(|| NotationError::UnknownToken(token.clone()))
            })
            .collect()
    }
}

/// Persisted per-job corpus blob: the token stream plus its vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesData {
    pub notes: Vec<String>,
    pub pitchnames: Vec<String>,
    pub n_vocab: usize,
}

impl NotesData {
    pub fn new(notes: Vec<String>) -> Result<Self> {
        let vocab = Vocab::from_tokens(&notes)?;
        Ok(Self {
            n_vocab: vocab.len(),
            pitchnames: vocab.pitchnames().to_vec(),
            notes,
        })
    }

    /// The encoding used at training time, rebuilt from the persisted
    /// pitchname list.
    pub fn vocab(&self) -> Vocab {
        Vocab::from_pitchnames(self.pitchnames.clone())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_vocab_is_a_sorted_bijection() {
        let tokens = stream(&["G4", "C4", "E4", "C4", "0.4.7", "G4"]);
        let vocab = Vocab::from_tokens(&tokens).unwrap();

        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.pitchnames(), &stream(&["0.4.7", "C4", "E4", "G4"]));

        // Every id in [0, n_vocab) maps back to exactly one token.
        for id in 0..vocab.len() as i64 {
            let token = vocab.get_token(id).unwrap();
            assert_eq!(vocab.get_id(token), Some(id));
        }
        assert_eq!(vocab.get_token(vocab.len() as i64), None);
        assert_eq!(vocab.get_token(-1), None);
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        assert!(matches!(
            Vocab::from_tokens(&[]),
            Err(NotationError::EmptyCorpus)
        ));
        assert!(matches!(
            NotesData::new(Vec::new()),
            Err(NotationError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_encode_rejects_unknown_token() {
        let vocab = Vocab::from_tokens(&stream(&["C4", "D4"])).unwrap();
        assert_eq!(vocab.encode(&stream(&["D4", "C4"])).unwrap(), vec![1, 0]);
        assert!(matches!(
            vocab.encode(&stream(&["C4", "Z9"])),
            Err(NotationError::UnknownToken(t)) if t == "Z9"
        ));
    }

    #[test]
    fn test_notes_data_rebuilds_the_same_encoding() {
        let notes = stream(&["E4", "C4", "G4", "C4"]);
        let data = NotesData::new(notes).unwrap();
        assert_eq!(data.n_vocab, 3);

        let vocab = data.vocab();
        assert_eq!(vocab.get_id("C4"), Some(0));
        assert_eq!(vocab.get_id("E4"), Some(1));
        assert_eq!(vocab.get_id("G4"), Some(2));
    }
}
