//! Error types for training, encoding, decoding and persistence.

use std::io;
use std::str::Utf8Error;

/// Invalid trainer or encoder configuration.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `vocab_size` was smaller than the base byte alphabet plus the
    /// declared special tokens.
    #[error("vocab_size {vocab_size} is smaller than 256 + {specials} special tokens")]
    VocabTooSmall { vocab_size: usize, specials: usize },
    /// A special token string was declared more than once.
    #[error("duplicate special token: {0:?}")]
    DuplicateSpecialToken(String),
    /// A merge's left or right byte-string was not present in the vocab at
    /// the position it claims to have been created.
    #[error("merge component not found in vocab: {0:?}")]
    MergeComponentMissing(Vec<u8>),
    /// Two distinct ids mapped to the same vocab byte-string (vocab must not
    /// have duplicates).
    #[error("duplicate vocab entry: {0:?}")]
    DuplicateVocabEntry(Vec<u8>),
    /// The pretokenization or special-token regex failed to compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] fancy_regex::Error),
}

/// Errors encountered while training a vocabulary.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read corpus: {0}")]
    Io(#[from] io::Error),
    #[error("corpus chunk is not valid utf-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    #[error("failed to compile pretokenization regex: {0}")]
    InvalidPattern(#[from] fancy_regex::Error),
}

/// Errors encountered while encoding text.
///
/// The encoder never fails on well-formed `&str` input (every byte is
/// representable via the base-byte ids 0-255); this type exists so the
/// signature can grow without becoming a breaking change.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to compile special-token regex: {0}")]
    InvalidPattern(#[from] fancy_regex::Error),
}

/// Errors encountered while decoding a token id sequence.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A token id was outside `[0, |vocab|)`.
    #[error("unknown token id: {0}")]
    UnknownTokenId(u32),
}

/// Errors encountered while loading or saving a vocabulary/merges pair.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid vocab json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid byte-printable sequence: {0:?}")]
    InvalidBytePrintable(char),
    #[error("malformed merges line: {0:?}")]
    MalformedMergeLine(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
