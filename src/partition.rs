//! Splits a corpus file into byte ranges aligned to occurrences of a
//! delimiter, so each range can be scanned independently and in parallel
//! without ever splitting a document in half.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::TrainError;

const SCAN_STEP: usize = 4096;

/// The literal delimiter training chunks are split on.
pub const TRAIN_DELIMITER: &[u8] = b"<|endoftext|>";

/// Computes chunk boundaries for `path`, aiming for `desired_num_chunks`
/// roughly evenly sized chunks, each starting at file start or at an
/// occurrence of `delimiter`. May return fewer boundaries than requested.
pub fn find_chunk_boundaries(
    path: impl AsRef<Path>,
    desired_num_chunks: usize,
    delimiter: &[u8],
) -> Result<Vec<u64>, TrainError> {
    let mut file = File::open(path)?;
    let file_size = file.seek(SeekFrom::End(0))?;

    let desired_num_chunks = desired_num_chunks.max(1);
    let chunk_size = file_size / desired_num_chunks as u64;

    let mut boundaries: Vec<u64> =
        (0..=desired_num_chunks as u64).map(|i| i * chunk_size).collect();
    if let Some(last) = boundaries.last_mut() {
        *last = file_size;
    }

    let mut scan_buf = vec![0u8; SCAN_STEP];
    for bi in 1..boundaries.len() - 1 {
        let mut pos = boundaries[bi];
        let resolved = loop {
            file.seek(SeekFrom::Start(pos))?;
            let n = read_up_to(&mut file, &mut scan_buf)?;
            if n == 0 {
                break file_size;
            }
            match find_subslice(&scan_buf[..n], delimiter) {
                Some(found_at) => break pos + found_at as u64,
                None => pos += n as u64,
            }
        };
        boundaries[bi] = resolved;
    }

    boundaries.sort_unstable();
    boundaries.dedup();
    Ok(boundaries)
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    use bstr::ByteSlice;
    haystack.find(needle)
}

/// The `(start, end)` ranges implied by a boundary list.
pub fn ranges(boundaries: &[u64]) -> Vec<(u64, u64)> {
    boundaries.windows(2).map(|w| (w[0], w[1])).collect()
}
