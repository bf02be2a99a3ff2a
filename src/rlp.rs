//! Recursive Length Prefix (RLP) encoding and decoding over untyped byte-sequence trees.
//!
//! This is the wire format nodes are hashed and stored under. Unlike a typed
//! RLP codec built around `#[derive]`-style structs, [`RlpItem`] models exactly
//! the shape the trie needs: a string of bytes, or a list of items.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RlpDecodeError {
    #[error("unexpected end of input while decoding RLP")]
    UnexpectedEnd,
    #[error("RLP length prefix does not match remaining input")]
    InvalidLength,
    #[error("non-canonical RLP length encoding")]
    NonCanonicalLength,
}

/// An untyped view of a decoded RLP item: either a byte string or a list of items.
///
/// This is the "node value view" consumed by the trie engine: it discriminates
/// leaf/extension/branch purely by item shape (2-item list vs. 17-item list),
/// without knowing anything about trie semantics itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn is_list(&self) -> bool {
        matches!(self, RlpItem::List(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RlpItem::Bytes(_) => 1,
            RlpItem::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<&RlpItem> {
        match self {
            RlpItem::List(items) => items.get(i),
            RlpItem::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RlpItem::Bytes(b) => Some(b),
            RlpItem::List(_) => None,
        }
    }

    /// True iff this item is a byte string whose length matches a content-addressed
    /// node reference (32 bytes) rather than a raw inlined value.
    pub fn is_hash_shaped(&self) -> bool {
        matches!(self, RlpItem::Bytes(b) if b.len() == 32)
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            RlpItem::Bytes(b) => encode_bytes(b),
            RlpItem::List(items) => {
                let payload: Vec<u8> = items.iter().flat_map(|i| i.encode()).collect();
                encode_list_payload(&payload)
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RlpDecodeError> {
        let (item, rest) = decode_item(bytes)?;
        if !rest.is_empty() {
            return Err(RlpDecodeError::InvalidLength);
        }
        Ok(item)
    }
}

impl From<Vec<u8>> for RlpItem {
    fn from(value: Vec<u8>) -> Self {
        RlpItem::Bytes(value)
    }
}

impl From<Vec<RlpItem>> for RlpItem {
    fn from(value: Vec<RlpItem>) -> Self {
        RlpItem::List(value)
    }
}

/// RLP-encodes a single byte string.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] <= 0x7f {
        return vec![bytes[0]];
    }
    let mut out = encode_length(bytes.len(), 0x80);
    out.extend_from_slice(bytes);
    out
}

fn encode_list_payload(payload: &[u8]) -> Vec<u8> {
    let mut out = encode_length(payload.len(), 0xc0);
    out.extend_from_slice(payload);
    out
}

fn encode_length(len: usize, offset: u8) -> Vec<u8> {
    if len < 56 {
        vec![offset + len as u8]
    } else {
        let len_bytes = be_bytes_without_leading_zeros(len as u64);
        let mut out = Vec::with_capacity(1 + len_bytes.len());
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out
    }
}

fn be_bytes_without_leading_zeros(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[first_nonzero..].to_vec()
}

/// Decodes one RLP item from the front of `input`, returning the item and the
/// unconsumed remainder.
pub fn decode_item(input: &[u8]) -> Result<(RlpItem, &[u8]), RlpDecodeError> {
    let &first = input.first().ok_or(RlpDecodeError::UnexpectedEnd)?;
    match first {
        0x00..=0x7f => Ok((RlpItem::Bytes(vec![first]), &input[1..])),
        0x80..=0xb7 => {
            let len = (first - 0x80) as usize;
            let (data, rest) = split_checked(&input[1..], len)?;
            if len == 1 && data[0] <= 0x7f {
                return Err(RlpDecodeError::NonCanonicalLength);
            }
            Ok((RlpItem::Bytes(data.to_vec()), rest))
        }
        0xb8..=0xbf => {
            let len_of_len = (first - 0xb7) as usize;
            let (len, rest) = decode_long_length(&input[1..], len_of_len)?;
            let (data, rest) = split_checked(rest, len)?;
            Ok((RlpItem::Bytes(data.to_vec()), rest))
        }
        0xc0..=0xf7 => {
            let len = (first - 0xc0) as usize;
            let (mut payload, rest) = split_checked(&input[1..], len)?;
            let mut items = Vec::new();
            while !payload.is_empty() {
                let (item, remaining) = decode_item(payload)?;
                items.push(item);
                payload = remaining;
            }
            Ok((RlpItem::List(items), rest))
        }
        0xf8..=0xff => {
            let len_of_len = (first - 0xf7) as usize;
            let (len, rest) = decode_long_length(&input[1..], len_of_len)?;
            let (mut payload, rest) = split_checked(rest, len)?;
            let mut items = Vec::new();
            while !payload.is_empty() {
                let (item, remaining) = decode_item(payload)?;
                items.push(item);
                payload = remaining;
            }
            Ok((RlpItem::List(items), rest))
        }
    }
}

fn decode_long_length(input: &[u8], len_of_len: usize) -> Result<(usize, &[u8]), RlpDecodeError> {
    let (len_bytes, rest) = split_checked(input, len_of_len)?;
    if len_bytes[0] == 0 {
        return Err(RlpDecodeError::NonCanonicalLength);
    }
    let mut buf = [0u8; 8];
    buf[8 - len_bytes.len()..].copy_from_slice(len_bytes);
    let len = u64::from_be_bytes(buf) as usize;
    if len < 56 {
        return Err(RlpDecodeError::NonCanonicalLength);
    }
    Ok((len, rest))
}

fn split_checked(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), RlpDecodeError> {
    if input.len() < len {
        return Err(RlpDecodeError::InvalidLength);
    }
    Ok(input.split_at(len))
}
