//! Reads a byte range of a corpus file, pretokenizes it, and produces a
//! frequency map from byte-tuple pretokens to occurrence counts.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::TrainError;
use crate::pretokenize::{Pretokenizer, Segment, SpecialSplitter};

/// Counts pretoken frequencies in `path[start..end)`.
///
/// The range is assumed (by construction of the corpus partitioner) to
/// begin and end at special-token boundaries, which are ASCII, so decoding
/// the slice as UTF-8 is safe as long as the corpus itself is valid UTF-8.
pub fn count_range(
    path: impl AsRef<Path>,
    start: u64,
    end: u64,
    pretokenizer: &Pretokenizer,
    special_splitter: &SpecialSplitter,
) -> Result<HashMap<Vec<u32>, u64>, TrainError> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let mut buf = vec![0u8; (end - start) as usize];
    file.read_exact(&mut buf)?;
    let text = std::str::from_utf8(&buf)?;

    let mut counts: HashMap<Vec<u32>, u64> = HashMap::new();
    for segment in special_splitter.split(text) {
        let Segment::Text(doc) = segment else { continue };
        for pretoken in pretokenizer.pretokenize(doc) {
            let ids: Vec<u32> = pretoken.bytes().map(u32::from).collect();
            *counts.entry(ids).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn counts_repeated_words() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"low low low").unwrap();
        file.flush().unwrap();
        let pretokenizer = Pretokenizer::new().unwrap();
        let splitter = SpecialSplitter::new(&[]).unwrap();
        let len = std::fs::metadata(file.path()).unwrap().len();
        let counts = count_range(file.path(), 0, len, &pretokenizer, &splitter).unwrap();
        let low: Vec<u32> = "low".bytes().map(u32::from).collect();
        assert_eq!(counts[&low], 1);
        let space_low: Vec<u32> = " low".bytes().map(u32::from).collect();
        assert_eq!(counts[&space_low], 2);
    }

    #[test]
    fn special_tokens_split_but_are_not_counted() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"a<|endoftext|>b").unwrap();
        file.flush().unwrap();
        let pretokenizer = Pretokenizer::new().unwrap();
        let splitter = SpecialSplitter::new(&["<|endoftext|>".to_string()]).unwrap();
        let len = std::fs::metadata(file.path()).unwrap().len();
        let counts = count_range(file.path(), 0, len, &pretokenizer, &splitter).unwrap();
        let total: u64 = counts.values().sum();
        assert_eq!(total, 2);
        assert!(!counts.keys().any(|k| k.len() >= "<|endoftext|>".len()));
    }
}
