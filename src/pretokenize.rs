//! Unicode-aware pretokenization (GPT-2 family) and special-token splitting.
//!
//! Pretokenization never crosses a declared special token: text is first
//! split on the (longest-first) alternation of special tokens, and the
//! fixed regex below is only ever applied between those boundaries.

use fancy_regex::Regex;

/// The six-alternative GPT-2 pretokenization pattern. Alternatives are tried
/// in order and matched non-overlapping, left to right.
pub const PRETOKEN_PATTERN: &str =
    r"'(?:[sdmt]|ll|ve|re)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Applies [`PRETOKEN_PATTERN`] to a string.
pub struct Pretokenizer {
    pattern: Regex,
}

impl Pretokenizer {
    pub fn new() -> Result<Self, fancy_regex::Error> {
        Ok(Self { pattern: Regex::new(PRETOKEN_PATTERN)? })
    }

    /// Splits `text` into pretokens. `text` must not itself straddle a
    /// special-token boundary; callers split on specials first.
    pub fn pretokenize<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> + '_ {
        self.pattern.find_iter(text).map(|m| m.expect("pretokenization regex is infallible").as_str())
    }
}

/// Splits text on a longest-first alternation of declared special tokens,
/// yielding both the plain-text spans and the special tokens themselves.
pub struct SpecialSplitter {
    pattern: Option<Regex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    Text(&'t str),
    Special(&'t str),
}

impl SpecialSplitter {
    pub fn new(special_tokens: &[String]) -> Result<Self, fancy_regex::Error> {
        if special_tokens.is_empty() {
            return Ok(Self { pattern: None });
        }
        let mut sorted: Vec<&String> = special_tokens.iter().collect();
        sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
        let alternation =
            sorted.iter().map(|s| fancy_regex::escape(s)).collect::<Vec<_>>().join("|");
        Ok(Self { pattern: Some(Regex::new(&alternation)?) })
    }

    /// Splits `text`, keeping special-token delimiters as separate segments.
    pub fn split<'t>(&self, text: &'t str) -> Vec<Segment<'t>> {
        let Some(pattern) = &self.pattern else {
            return if text.is_empty() { Vec::new() } else { vec![Segment::Text(text)] };
        };
        let mut segments = Vec::new();
        let mut pos = 0usize;
        loop {
            match pattern.find(&text[pos..]).expect("special-token regex is infallible") {
                Some(m) => {
                    let start = pos + m.start();
                    let end = pos + m.end();
                    if start > pos {
                        segments.push(Segment::Text(&text[pos..start]));
                    }
                    segments.push(Segment::Special(&text[start..end]));
                    pos = end;
                }
                None => {
                    if pos < text.len() {
                        segments.push(Segment::Text(&text[pos..]));
                    }
                    break;
                }
            }
        }
        segments
    }
}
