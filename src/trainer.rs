//! The BPE trainer: a frequency-driven greedy merge loop with a
//! deterministic tie-break rule, driven by an incrementally maintained
//! pair-frequency index.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::thread::available_parallelism;

use rayon::prelude::*;

use crate::counter::count_range;
use crate::error::{ConfigError, TrainError};
use crate::partition::{find_chunk_boundaries, ranges, TRAIN_DELIMITER};
use crate::pretokenize::{Pretokenizer, SpecialSplitter};

/// Configuration for [`train`].
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    vocab_size: usize,
    special_tokens: Vec<String>,
    num_chunks: Option<usize>,
}

impl TrainerConfig {
    pub fn new(vocab_size: usize) -> Self {
        Self { vocab_size, special_tokens: Vec::new(), num_chunks: None }
    }

    pub fn with_special_tokens(mut self, special_tokens: impl Into<Vec<String>>) -> Self {
        self.special_tokens = special_tokens.into();
        self
    }

    pub fn with_chunk_count(mut self, num_chunks: usize) -> Self {
        self.num_chunks = Some(num_chunks);
        self
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn special_tokens(&self) -> &[String] {
        &self.special_tokens
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let floor = 256 + self.special_tokens.len();
        if self.vocab_size < floor {
            return Err(ConfigError::VocabTooSmall {
                vocab_size: self.vocab_size,
                specials: self.special_tokens.len(),
            });
        }
        let mut seen = HashSet::new();
        for token in &self.special_tokens {
            if !seen.insert(token) {
                return Err(ConfigError::DuplicateSpecialToken(token.clone()));
            }
        }
        Ok(())
    }

    fn resolved_chunk_count(&self) -> usize {
        self.num_chunks
            .unwrap_or_else(|| available_parallelism().map(|p| p.get()).unwrap_or(1) * 2)
    }
}

/// The output of [`train`]: a vocabulary and an ordered list of merges,
/// ready to be persisted or handed directly to an encoder.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    /// `vocab[id]` is the byte-string for that token id.
    pub vocab: Vec<Vec<u8>>,
    /// Ordered merges; position defines priority (earlier = higher).
    pub merges: Vec<(Vec<u8>, Vec<u8>)>,
    pub special_tokens: Vec<String>,
}

/// Trains a BPE vocabulary and merge list from a raw UTF-8 corpus.
pub fn train(input_path: impl AsRef<Path>, config: &TrainerConfig) -> Result<TrainedModel, TrainError> {
    config.validate()?;
    let input_path = input_path.as_ref();

    let pretokenizer = Pretokenizer::new()?;
    let special_splitter = SpecialSplitter::new(config.special_tokens())?;

    let boundaries = find_chunk_boundaries(input_path, config.resolved_chunk_count(), TRAIN_DELIMITER)?;
    let chunk_ranges = ranges(&boundaries);

    tracing::debug!(chunks = chunk_ranges.len(), "partitioned corpus for parallel scan");

    let word_freqs = chunk_ranges
        .par_iter()
        .map(|&(start, end)| count_range(input_path, start, end, &pretokenizer, &special_splitter))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .fold(HashMap::<Vec<u32>, u64>::new(), |mut acc, chunk| {
            for (word, count) in chunk {
                *acc.entry(word).or_insert(0) += count;
            }
            acc
        });

    Ok(train_from_word_freqs(word_freqs, config))
}

/// The incremental-index merge loop over an already-computed frequency map.
/// Split out from [`train`] so the core algorithm can be unit tested without
/// going through the filesystem and rayon.
fn train_from_word_freqs(
    mut word_freqs: HashMap<Vec<u32>, u64>,
    config: &TrainerConfig,
) -> TrainedModel {
    let mut vocab: Vec<Vec<u8>> = (0u32..256).map(|b| vec![b as u8]).collect();
    for token in config.special_tokens() {
        vocab.push(token.as_bytes().to_vec());
    }
    let mut merge_ids: Vec<(u32, u32)> = Vec::new();

    let mut pair_freqs: HashMap<(u32, u32), u64> = HashMap::new();
    let mut pair_to_words: HashMap<(u32, u32), HashSet<Vec<u32>>> = HashMap::new();
    let mut modified: Vec<Vec<u32>> = Vec::new();

    while vocab.len() < config.vocab_size() {
        if pair_freqs.is_empty() && merge_ids.is_empty() {
            for (word, &count) in &word_freqs {
                for pair in word.windows(2) {
                    let p = (pair[0], pair[1]);
                    *pair_freqs.entry(p).or_insert(0) += count;
                    pair_to_words.entry(p).or_default().insert(word.clone());
                }
            }
        } else {
            for word in &modified {
                let Some(&count) = word_freqs.get(word) else { continue };
                for pair in word.windows(2) {
                    let p = (pair[0], pair[1]);
                    *pair_freqs.entry(p).or_insert(0) += count;
                    pair_to_words.entry(p).or_default().insert(word.clone());
                }
            }
        }

        if pair_freqs.is_empty() {
            break;
        }

        let best_pair = *pair_freqs
            .iter()
            .max_by(|(pa, ca), (pb, cb)| {
                ca.cmp(cb).then_with(|| {
                    let a_key = (vocab[pa.0 as usize].as_slice(), vocab[pa.1 as usize].as_slice());
                    let b_key = (vocab[pb.0 as usize].as_slice(), vocab[pb.1 as usize].as_slice());
                    a_key.cmp(&b_key)
                })
            })
            .map(|(p, _)| p)
            .expect("pair_freqs is non-empty");

        let new_id = vocab.len() as u32;
        let merged_bytes =
            [vocab[best_pair.0 as usize].as_slice(), vocab[best_pair.1 as usize].as_slice()].concat();
        tracing::trace!(
            freq = pair_freqs[&best_pair],
            new_id,
            bytes = ?String::from_utf8_lossy(&merged_bytes),
            "merge"
        );
        vocab.push(merged_bytes);
        merge_ids.push(best_pair);

        modified = Vec::new();
        let affected: Vec<Vec<u32>> =
            pair_to_words.get(&best_pair).into_iter().flatten().cloned().collect();
        for word in affected {
            let Some(count) = word_freqs.remove(&word) else { continue };
            let mut new_word = Vec::with_capacity(word.len());
            let mut i = 0;
            while i < word.len() {
                if i + 1 < word.len() && word[i] == best_pair.0 && word[i + 1] == best_pair.1 {
                    new_word.push(new_id);
                    i += 2;
                } else {
                    new_word.push(word[i]);
                    i += 1;
                }
            }

            for pair in word.windows(2) {
                let p = (pair[0], pair[1]);
                if let Some(c) = pair_freqs.get_mut(&p) {
                    *c -= count;
                }
                if let Some(set) = pair_to_words.get_mut(&p) {
                    set.remove(&word);
                }
            }

            word_freqs.insert(new_word.clone(), count);
            modified.push(new_word);
        }
        pair_freqs.remove(&best_pair);
    }

    let merges = merge_ids
        .iter()
        .map(|&(a, b)| (vocab[a as usize].clone(), vocab[b as usize].clone()))
        .collect();

    TrainedModel { vocab, merges, special_tokens: config.special_tokens().to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freqs(pairs: &[(&str, u64)]) -> HashMap<Vec<u32>, u64> {
        pairs
            .iter()
            .map(|&(w, c)| (w.bytes().map(u32::from).collect(), c))
            .collect()
    }

    #[test]
    fn vocab_growth_respects_target_and_uniqueness() {
        let word_freqs = freqs(&[
            ("low", 5),
            ("lower", 2),
            ("newest", 6),
            ("widest", 3),
        ]);
        let config = TrainerConfig::new(262);
        let model = train_from_word_freqs(word_freqs, &config);
        assert!(model.vocab.len() <= 262);
        assert_eq!(model.vocab.len(), 256 + model.merges.len());
        let mut seen = HashSet::new();
        for bytes in &model.vocab {
            assert!(seen.insert(bytes.clone()), "duplicate vocab entry {bytes:?}");
        }
    }

    #[test]
    fn every_merge_components_precede_it_in_the_vocab() {
        let word_freqs =
            freqs(&[("low", 5), ("lower", 2), ("newest", 6), ("widest", 3), ("lowest", 4)]);
        let config = TrainerConfig::new(280);
        let model = train_from_word_freqs(word_freqs, &config);
        let mut known: HashSet<Vec<u8>> = model.vocab[..256].iter().cloned().collect();
        for (left, right) in &model.merges {
            assert!(known.contains(left.as_slice()));
            assert!(known.contains(right.as_slice()));
            let merged: Vec<u8> = left.iter().chain(right).copied().collect();
            known.insert(merged);
        }
    }

    #[test]
    fn tie_break_prefers_lexicographically_greater_byte_pair() {
        // "ab" and "cd" both occur once; (a,b) vs (c,d) with equal counts.
        // vocab[b'c']=[99] > vocab[b'a']=[97], so (c,d) must win.
        let word_freqs = freqs(&[("ab", 10), ("cd", 10)]);
        let config = TrainerConfig::new(257);
        let model = train_from_word_freqs(word_freqs, &config);
        assert_eq!(model.merges.len(), 1);
        assert_eq!(model.merges[0], (b"c".to_vec(), b"d".to_vec()));
    }

    #[test]
    fn double_occurrence_of_winning_pair_is_handled_by_the_final_unconditional_removal() {
        // pretoken bytes for "abab": two non-overlapping (a,b) occurrences.
        let word_freqs = freqs(&[("abab", 3)]);
        let config = TrainerConfig::new(257);
        let model = train_from_word_freqs(word_freqs, &config);
        assert_eq!(model.merges.len(), 1);
        assert_eq!(model.merges[0], (b"a".to_vec(), b"b".to_vec()));
    }

    #[test]
    fn halts_early_when_corpus_is_exhausted() {
        let word_freqs = freqs(&[("ab", 1)]);
        let config = TrainerConfig::new(100_000);
        let model = train_from_word_freqs(word_freqs, &config);
        // Only one mergeable pair exists; after that pair_freqs is empty.
        assert_eq!(model.merges.len(), 1);
        assert!(model.vocab.len() < 100_000);
    }

    #[test]
    fn rejects_vocab_size_smaller_than_base_alphabet_plus_specials() {
        let config = TrainerConfig::new(200).with_special_tokens(vec!["<|endoftext|>".to_string()]);
        assert!(config.validate().is_err());
    }
}
