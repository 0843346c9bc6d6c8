//! Response decoding for model output that should contain JSON.
//!
//! Models wrap JSON in prose or code fences often enough that requiring a pure
//! JSON body is useless. Instead we scan for balanced `{...}` / `[...]` spans,
//! skipping brackets that appear inside string literals, and deserialize the
//! first span that fits the expected type.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
}

impl JsonKind {
    fn open(self) -> u8 {
        match self {
            JsonKind::Object => b'{',
            JsonKind::Array => b'[',
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no JSON value found in model output")]
    NotFound,

    #[error("JSON value did not match the expected shape: {0}")]
    Invalid(#[source] serde_json::Error),
}

/// Returns the first balanced JSON value of `kind` in `text`.
#[cfg(test)]
pub fn find_json(text: &str, kind: JsonKind) -> Option<&str> {
    candidates(text, kind).next()
}

/// Deserializes the first balanced span of `kind` that parses as `T`.
pub fn decode_first<T: DeserializeOwned>(text: &str, kind: JsonKind) -> Result<T, DecodeError> {
    let mut first_error = None;
    for span in candidates(text, kind) {
        match serde_json::from_str::<T>(span) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.map_or(DecodeError::NotFound, DecodeError::Invalid))
}

/// Every balanced span starting at an opening bracket of `kind`, in order of start position.
fn candidates(text: &str, kind: JsonKind) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let open = kind.open();
    bytes
        .iter()
        .enumerate()
        .filter(move |&(_, &b)| b == open)
        .filter_map(move |(start, _)| balanced_end(bytes, start).map(|end| &text[start..=end]))
}

/// Index of the bracket that closes the one at `start`, if the span balances.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => stack.push(b'}'),
            b'[' => stack.push(b']'),
            b'}' | b']' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
