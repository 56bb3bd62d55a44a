//! A byte-pair-encoding tokenizer of the GPT-2 family: trains a vocabulary
//! and merge list from a raw UTF-8 corpus, and encodes/decodes text against
//! a trained (or loaded) vocabulary.
//!
//! ```no_run
//! use bpe_tokenizer::{train, BpeTokenizer, TrainerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TrainerConfig::new(1000).with_special_tokens(vec!["<|endoftext|>".to_string()]);
//! let model = train("corpus.txt", &config)?;
//! let tokenizer = BpeTokenizer::new(model)?;
//! let ids = tokenizer.encode("hello world");
//! assert_eq!(tokenizer.decode(&ids)?, "hello world");
//! # Ok(())
//! # }
//! ```

mod byte_codec;
mod core;
mod counter;
mod error;
mod partition;
mod persistence;
mod pretokenize;
mod trainer;

use std::collections::HashMap;
use std::path::Path;

pub use error::{ConfigError, DecodeError, EncodeError, PersistError, TrainError};
pub use trainer::{train, TrainedModel, TrainerConfig};

use core::BpeCore;

/// A trained tokenizer: holds the vocabulary, merge priorities and special
/// tokens, and encodes/decodes text against them.
pub struct BpeTokenizer {
    core: BpeCore,
}

impl BpeTokenizer {
    /// Builds a tokenizer from an already-trained model.
    pub fn new(model: TrainedModel) -> Result<Self, ConfigError> {
        let special_tokens = special_token_map(&model.vocab, &model.special_tokens);
        let core = BpeCore::new(model.vocab, &model.merges, special_tokens)?;
        Ok(Self { core })
    }

    /// Loads a tokenizer from a vocab file and a merges file (§6). Any
    /// `special_tokens` not already present in the loaded vocab are
    /// appended with monotonically increasing ids.
    pub fn from_files(
        vocab_path: impl AsRef<Path>,
        merges_path: impl AsRef<Path>,
        special_tokens: &[String],
    ) -> Result<Self, PersistError> {
        let mut vocab = persistence::load_vocab(vocab_path)?;
        let merges = persistence::load_merges(merges_path)?;

        let mut present: std::collections::HashSet<Vec<u8>> = vocab.iter().cloned().collect();
        for token in special_tokens {
            let bytes = token.as_bytes().to_vec();
            if present.insert(bytes.clone()) {
                vocab.push(bytes);
            }
        }

        let special_token_map = special_token_map(&vocab, special_tokens);
        let core = BpeCore::new(vocab, &merges, special_token_map).map_err(PersistError::Config)?;
        Ok(Self { core })
    }

    /// Encodes `text` into a sequence of token ids.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.core.encode(text)
    }

    /// Decodes a sequence of token ids back into text, substituting the
    /// Unicode replacement character for any ill-formed UTF-8 produced by
    /// concatenating the decoded byte-strings.
    pub fn decode(&self, ids: &[u32]) -> Result<String, DecodeError> {
        self.core.decode(ids)
    }

    /// The size of the loaded/trained vocabulary.
    pub fn vocab_len(&self) -> usize {
        self.core.vocab_len()
    }
}

fn special_token_map(vocab: &[Vec<u8>], special_tokens: &[String]) -> HashMap<String, u32> {
    let encoder: HashMap<&[u8], u32> =
        vocab.iter().enumerate().map(|(id, bytes)| (bytes.as_slice(), id as u32)).collect();
    special_tokens
        .iter()
        .filter_map(|token| encoder.get(token.as_bytes()).map(|&id| (token.clone(), id)))
        .collect()
}

/// On-disk persistence helpers (§6, §4.H), for callers (such as the CLI)
/// that want to save a freshly trained model or load one without going
/// through [`BpeTokenizer::from_files`].
pub mod persist {
    pub use crate::persistence::{load_merges, load_vocab, save_merges, save_vocab};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train_small() -> TrainedModel {
        let corpus = "low low low low low lower lower newest newest newest newest newest newest widest widest widest";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, corpus).unwrap();
        let config = TrainerConfig::new(262).with_chunk_count(1);
        train(&path, &config).unwrap()
    }

    #[test]
    fn trains_and_round_trips_ascii() {
        let model = train_small();
        let tokenizer = BpeTokenizer::new(model).unwrap();
        let text = "the newest widest lower";
        let ids = tokenizer.encode(text);
        assert_eq!(tokenizer.decode(&ids).unwrap(), text);
    }

    #[test]
    fn vocab_len_matches_base_plus_merges() {
        let model = train_small();
        assert_eq!(model.vocab.len(), 256 + model.merges.len());
        let tokenizer = BpeTokenizer::new(model).unwrap();
        assert!(tokenizer.vocab_len() <= 262);
    }

    #[test]
    fn from_files_appends_missing_special_tokens() {
        let model = train_small();
        let dir = tempfile::tempdir().unwrap();
        let vocab_path = dir.path().join("vocab.json");
        let merges_path = dir.path().join("merges.txt");
        persist::save_vocab(&model.vocab, &vocab_path).unwrap();
        persist::save_merges(&model.merges, &merges_path).unwrap();

        let specials = vec!["<|endoftext|>".to_string()];
        let tokenizer = BpeTokenizer::from_files(&vocab_path, &merges_path, &specials).unwrap();
        assert_eq!(tokenizer.vocab_len(), model.vocab.len() + 1);

        let special_id = model.vocab.len() as u32;
        let ids = tokenizer.encode("hi<|endoftext|>bye");
        assert_eq!(ids.iter().filter(|&&id| id == special_id).count(), 1);
    }

    #[test]
    fn empty_text_encodes_to_empty_ids() {
        let model = train_small();
        let tokenizer = BpeTokenizer::new(model).unwrap();
        assert_eq!(tokenizer.encode(""), Vec::<u32>::new());
        assert_eq!(tokenizer.decode(&[]).unwrap(), "");
    }
}
