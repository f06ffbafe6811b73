//! Word Encoding Module
//!
//! Canonical 32-byte-word encoding of static tuples. Everything that is
//! hashed (witnesses, permit structs, intent ids) and the verifier descriptor
//! wire format go through this encoding, so its layout is fixed: every value
//! occupies one big-endian word, addresses and integers are left-padded,
//! fixed byte strings (`bytes4`) are right-padded.

use thiserror::Error;

use crate::types::{Address, B256, U256};

pub const WORD: usize = 32;

/// Decoding failures for word-encoded data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("expected {expected} bytes, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    #[error("word {index} is not a valid address")]
    InvalidAddress { index: usize },

    #[error("word {index} is not a valid bool")]
    InvalidBool { index: usize },

    #[error("word {index} is not a valid bytes4")]
    InvalidBytes4 { index: usize },
}

// ============================================================================
// ENCODER
// ============================================================================

/// Appends 32-byte words to a buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn word(mut self, word: B256) -> Self {
        self.buf.extend_from_slice(word.as_bytes());
        self
    }

    pub fn address(mut self, addr: Address) -> Self {
        self.buf.extend_from_slice(&[0u8; 12]);
        self.buf.extend_from_slice(addr.as_bytes());
        self
    }

    pub fn uint(mut self, value: U256) -> Self {
        let mut word = [0u8; WORD];
        value.to_big_endian(&mut word);
        self.buf.extend_from_slice(&word);
        self
    }

    pub fn u64(self, value: u64) -> Self {
        self.uint(U256::from(value))
    }

    pub fn bool(self, value: bool) -> Self {
        self.u64(value as u64)
    }

    pub fn bytes4(mut self, value: [u8; 4]) -> Self {
        self.buf.extend_from_slice(&value);
        self.buf.extend_from_slice(&[0u8; WORD - 4]);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

// ============================================================================
// DECODER
// ============================================================================

/// Reads a fixed number of 32-byte words, rejecting non-canonical values.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder that requires `data` to be exactly `words` words long.
    pub fn exact(data: &'a [u8], words: usize) -> Result<Self, AbiError> {
        let expected = words * WORD;
        if data.len() != expected {
            return Err(AbiError::UnexpectedLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, index: 0 })
    }

    fn next(&mut self) -> (usize, &'a [u8]) {
        let index = self.index;
        let start = index * WORD;
        self.index += 1;
        (index, &self.data[start..start + WORD])
    }

    pub fn word(&mut self) -> B256 {
        let (_, w) = self.next();
        B256::from_slice(w)
    }

    pub fn uint(&mut self) -> U256 {
        let (_, w) = self.next();
        U256::from_big_endian(w)
    }

    pub fn address(&mut self) -> Result<Address, AbiError> {
        let (index, w) = self.next();
        if w[..12].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidAddress { index });
        }
        Ok(Address::from_slice(&w[12..]))
    }

    pub fn bool(&mut self) -> Result<bool, AbiError> {
        let (index, w) = self.next();
        if w[..WORD - 1].iter().any(|b| *b != 0) || w[WORD - 1] > 1 {
            return Err(AbiError::InvalidBool { index });
        }
        Ok(w[WORD - 1] == 1)
    }

    pub fn bytes4(&mut self) -> Result<[u8; 4], AbiError> {
        let (index, w) = self.next();
        if w[4..].iter().any(|b| *b != 0) {
            return Err(AbiError::InvalidBytes4 { index });
        }
        Ok([w[0], w[1], w[2], w[3]])
    }
}
