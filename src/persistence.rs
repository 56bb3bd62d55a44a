//! Loading and saving vocab/merges in the byte-printable on-disk form
//! (§6): a JSON object mapping byte-printable token strings to ids, and a
//! plain-text merges file with one whitespace-separated pair per line.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::byte_codec::{decode_string, encode_bytes};
use crate::error::PersistError;

/// Writes `vocab` (indexed by id) as a JSON object of
/// `byte-printable-string -> id`.
pub fn save_vocab(vocab: &[Vec<u8>], path: impl AsRef<Path>) -> Result<(), PersistError> {
    let map: BTreeMap<String, u32> =
        vocab.iter().enumerate().map(|(id, bytes)| (encode_bytes(bytes), id as u32)).collect();
    let json = serde_json::to_string(&map)?;
    fs::write(path, json)?;
    Ok(())
}

/// Writes `merges` as one whitespace-separated byte-printable pair per
/// line, in priority order.
pub fn save_merges(merges: &[(Vec<u8>, Vec<u8>)], path: impl AsRef<Path>) -> Result<(), PersistError> {
    let mut text = String::new();
    for (left, right) in merges {
        text.push_str(&encode_bytes(left));
        text.push(' ');
        text.push_str(&encode_bytes(right));
        text.push('\n');
    }
    fs::write(path, text)?;
    Ok(())
}

/// Loads a vocab file into a vector indexed by token id. `id` values are
/// canonical; key order in the file is not relied upon.
pub fn load_vocab(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>, PersistError> {
    let contents = fs::read_to_string(path)?;
    let map: BTreeMap<String, u32> = serde_json::from_str(&contents)?;
    let max_id = map.values().copied().max().map(|m| m as usize + 1).unwrap_or(0);
    let mut vocab: Vec<Option<Vec<u8>>> = vec![None; max_id];
    for (token, id) in map {
        vocab[id as usize] = Some(decode_string(&token)?);
    }
    vocab
        .into_iter()
        .enumerate()
        .map(|(id, entry)| entry.ok_or_else(|| PersistError::MalformedMergeLine(format!("missing id {id}"))))
        .collect()
}

/// Loads an ordered merges file.
pub fn load_merges(path: impl AsRef<Path>) -> Result<Vec<(Vec<u8>, Vec<u8>)>, PersistError> {
    let contents = fs::read_to_string(path)?;
    contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.split_whitespace();
            let left = parts.next().ok_or_else(|| PersistError::MalformedMergeLine(line.to_string()))?;
            let right = parts.next().ok_or_else(|| PersistError::MalformedMergeLine(line.to_string()))?;
            if parts.next().is_some() {
                return Err(PersistError::MalformedMergeLine(line.to_string()));
            }
            Ok((decode_string(left)?, decode_string(right)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn vocab_round_trips_through_json() {
        let vocab: Vec<Vec<u8>> =
            (0u32..256).map(|b| vec![b as u8]).chain([b"<|endoftext|>".to_vec(), b" the".to_vec()]).collect();
        let file = NamedTempFile::new().unwrap();
        save_vocab(&vocab, file.path()).unwrap();
        let loaded = load_vocab(file.path()).unwrap();
        assert_eq!(loaded, vocab);
    }

    #[test]
    fn merges_round_trip_and_preserve_order() {
        let merges = vec![
            (b" ".to_vec(), b"t".to_vec()),
            (b" t".to_vec(), b"he".to_vec()),
        ];
        let file = NamedTempFile::new().unwrap();
        save_merges(&merges, file.path()).unwrap();
        let loaded = load_merges(file.path()).unwrap();
        assert_eq!(loaded, merges);
    }

    #[test]
    fn malformed_merge_line_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "only_one_token\n").unwrap();
        assert!(load_merges(file.path()).is_err());
    }
}
