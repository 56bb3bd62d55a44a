//! The BPE encoder and decoder (§4.F, §4.G): pretokenization driven by the
//! fixed regex, greedy application of learned merges in priority order, and
//! atomic handling of declared special tokens.

use std::collections::HashMap;

use crate::error::{ConfigError, DecodeError};
use crate::pretokenize::{Pretokenizer, Segment, SpecialSplitter};

/// A trained (or loaded) tokenizer: vocabulary, merge priorities and
/// special tokens, ready to encode and decode.
pub struct BpeCore {
    vocab: Vec<Vec<u8>>,
    encoder: HashMap<Vec<u8>, u32>,
    merge_rank: HashMap<(u32, u32), u32>,
    merge_into: HashMap<(u32, u32), u32>,
    special_tokens: HashMap<String, u32>,
    pretokenizer: Pretokenizer,
    special_splitter: SpecialSplitter,
}

impl BpeCore {
    /// Builds a tokenizer from a vocabulary, ordered merges and special
    /// tokens. `vocab[id]` must hold the byte-string for `id`, including
    /// entries for every special token.
    pub fn new(
        vocab: Vec<Vec<u8>>,
        merges: &[(Vec<u8>, Vec<u8>)],
        special_tokens: HashMap<String, u32>,
    ) -> Result<Self, ConfigError> {
        let mut encoder: HashMap<Vec<u8>, u32> = HashMap::with_capacity(vocab.len());
        for (id, bytes) in vocab.iter().enumerate() {
            if encoder.insert(bytes.clone(), id as u32).is_some() {
                return Err(ConfigError::DuplicateVocabEntry(bytes.clone()));
            }
        }

        let mut merge_rank = HashMap::with_capacity(merges.len());
        let mut merge_into = HashMap::with_capacity(merges.len());
        for (rank, (left, right)) in merges.iter().enumerate() {
            let &a = encoder
                .get(left.as_slice())
                .ok_or_else(|| ConfigError::MergeComponentMissing(left.clone()))?;
            let &b = encoder
                .get(right.as_slice())
                .ok_or_else(|| ConfigError::MergeComponentMissing(right.clone()))?;
            let mut merged = left.clone();
            merged.extend_from_slice(right);
            let &merged_id = encoder
                .get(merged.as_slice())
                .ok_or_else(|| ConfigError::MergeComponentMissing(merged.clone()))?;
            merge_rank.insert((a, b), rank as u32);
            merge_into.insert((a, b), merged_id);
        }

        let pretokenizer = Pretokenizer::new()?;
        let special_keys: Vec<String> = special_tokens.keys().cloned().collect();
        let special_splitter = SpecialSplitter::new(&special_keys)?;

        Ok(Self { vocab, encoder, merge_rank, merge_into, special_tokens, pretokenizer, special_splitter })
    }

    pub fn vocab_len(&self) -> usize {
        self.vocab.len()
    }

    /// Encodes `text` into a sequence of token ids.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let mut out = Vec::new();
        for segment in self.special_splitter.split(text) {
            match segment {
                Segment::Special(token) => {
                    out.push(self.special_tokens[token]);
                }
                Segment::Text(doc) => {
                    for pretoken in self.pretokenizer.pretokenize(doc) {
                        let ids: Vec<u32> = pretoken.bytes().map(u32::from).collect();
                        out.extend(self.merge_pretoken(ids));
                    }
                }
            }
        }
        out
    }

    /// Applies learned merges to a single pretoken's byte ids, in priority
    /// order, until no adjacent pair is mergeable.
    fn merge_pretoken(&self, mut ids: Vec<u32>) -> Vec<u32> {
        if ids.len() < 2 {
            return ids;
        }
        let mut ranks: Vec<Option<u32>> =
            (0..ids.len() - 1).map(|i| self.merge_rank.get(&(ids[i], ids[i + 1])).copied()).collect();

        loop {
            let mut best: Option<(u32, usize)> = None;
            for (i, rank) in ranks.iter().enumerate() {
                if let Some(rank) = rank {
                    let is_better = match best {
                        None => true,
                        Some((best_rank, _)) => *rank < best_rank,
                    };
                    if is_better {
                        best = Some((*rank, i));
                    }
                }
            }
            let Some((_, i)) = best else { break };
            let pair = (ids[i], ids[i + 1]);
            let merged = self.merge_into[&pair];
            ids[i] = merged;
            ids.remove(i + 1);
            ranks.remove(i);
            if i < ranks.len() {
                ranks[i] = self.merge_rank.get(&(ids[i], ids[i + 1])).copied();
            }
            if i > 0 {
                ranks[i - 1] = self.merge_rank.get(&(ids[i - 1], ids[i])).copied();
            }
        }
        ids
    }

    /// Concatenates `vocab[id]` for each id and decodes the result as UTF-8,
    /// substituting the replacement character for ill-formed sequences.
    pub fn decode(&self, ids: &[u32]) -> Result<String, DecodeError> {
        let mut bytes = Vec::with_capacity(ids.len() * 2);
        for &id in ids {
            let piece = self.vocab.get(id as usize).ok_or(DecodeError::UnknownTokenId(id))?;
            bytes.extend_from_slice(piece);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tokenizer() -> BpeCore {
        // base bytes + one merge: ('l','o') from training on "low" family.
        let mut vocab: Vec<Vec<u8>> = (0u32..256).map(|b| vec![b as u8]).collect();
        vocab.push(b"<|endoftext|>".to_vec()); // id 256
        vocab.push(b"lo".to_vec()); // id 257, merge of 'l'+'o'
        let merges = vec![(b"l".to_vec(), b"o".to_vec())];
        let mut specials = HashMap::new();
        specials.insert("<|endoftext|>".to_string(), 256u32);
        BpeCore::new(vocab, &merges, specials).unwrap()
    }

    #[test]
    fn empty_input_encodes_and_decodes_to_empty() {
        let tok = small_tokenizer();
        assert_eq!(tok.encode(""), Vec::<u32>::new());
        assert_eq!(tok.decode(&[]).unwrap(), "");
    }

    #[test]
    fn ascii_round_trip() {
        let tok = small_tokenizer();
        let ids = tok.encode("hi there");
        assert_eq!(tok.decode(&ids).unwrap(), "hi there");
    }

    #[test]
    fn special_token_passthrough_exactly_once() {
        let tok = small_tokenizer();
        let ids = tok.encode("hi<|endoftext|>bye");
        let special_count = ids.iter().filter(|&&id| id == 256).count();
        assert_eq!(special_count, 1);
        assert_eq!(tok.decode(&ids).unwrap(), "hi<|endoftext|>bye");
    }

    #[test]
    fn merge_applies_to_adjacent_pair() {
        let tok = small_tokenizer();
        let ids = tok.encode("lo");
        assert_eq!(ids, vec![257]);
    }

    #[test]
    fn duplicate_vocab_entry_is_rejected() {
        let mut vocab: Vec<Vec<u8>> = (0u32..256).map(|b| vec![b as u8]).collect();
        vocab.push(vec![b'a']); // id 256, collides with id 97 ('a')
        let err = BpeCore::new(vocab, &[], HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateVocabEntry(bytes) if bytes == vec![b'a']));
    }

    #[test]
    fn unknown_token_id_is_an_error() {
        let tok = small_tokenizer();
        assert!(matches!(tok.decode(&[999_999]), Err(DecodeError::UnknownTokenId(999_999))));
    }
}
