//! Fixed bijection between byte values `0..256` and a set of printable
//! Unicode code points (the GPT-2 "byte-to-unicode" mapping).
//!
//! Bytes in the visually printable ranges keep their own code point; the
//! remaining 68 control/whitespace bytes are shifted into `256..324`. This
//! exists only so vocab and merges can be written as plain, escape-free text
//! (see the persistence module); it has no role in tokenization semantics.

use std::sync::OnceLock;

use crate::error::PersistError;

fn tables() -> &'static (Vec<char>, [Option<u8>; 512]) {
    static TABLES: OnceLock<(Vec<char>, [Option<u8>; 512])> = OnceLock::new();
    TABLES.get_or_init(|| {
        let printable: Vec<u8> = (b'!'..=b'~').chain(0xA1..=0xAC).chain(0xAE..=0xFF).collect();
        let mut byte_to_char = vec![0u32; 256];
        for &b in &printable {
            byte_to_char[b as usize] = b as u32;
        }
        let mut n = 0u32;
        for b in 0u32..256 {
            if !printable.contains(&(b as u8)) {
                byte_to_char[b as usize] = 256 + n;
                n += 1;
            }
        }
        let chars: Vec<char> = byte_to_char
            .iter()
            .map(|&cp| char::from_u32(cp).expect("byte-printable code points are valid scalars"))
            .collect();

        let mut char_to_byte = [None; 512];
        for (byte, &cp) in byte_to_char.iter().enumerate() {
            char_to_byte[cp as usize] = Some(byte as u8);
        }
        (chars, char_to_byte)
    })
}

/// Encodes a byte-string as its byte-printable representation.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let (byte_to_char, _) = tables();
    bytes.iter().map(|&b| byte_to_char[b as usize]).collect()
}

/// Decodes a byte-printable string back into its original byte-string.
pub fn decode_string(s: &str) -> Result<Vec<u8>, PersistError> {
    let (_, char_to_byte) = tables();
    s.chars()
        .map(|c| {
            let cp = c as u32;
            (cp < 512)
                .then(|| char_to_byte[cp as usize])
                .flatten()
                .ok_or(PersistError::InvalidBytePrintable(c))
        })
        .collect()
}
