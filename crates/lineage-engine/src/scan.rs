//! Locating a JSON object embedded in an HTML page.
//!
//! The detail page assigns its data to a script variable. The object has to
//! be cut out of the surrounding markup before it can be parsed, and braces
//! inside string literals must not count towards nesting.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
  #[error("no object follows the marker")]
  NoObject,

  #[error("string literal opened at byte {0} is never closed")]
  UnterminatedString(usize),

  #[error("{0} brace(s) still open at end of input")]
  Unbalanced(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Normal,
  InString,
  Escaped,
}

/// Find `marker` in `haystack` and return the balanced object that follows
/// it. `Ok(None)` means the marker is absent.
pub fn extract_after<'a>(
  haystack: &'a str,
  marker: &str,
) -> Result<Option<&'a str>, ScanError> {
  match haystack.find(marker) {
    Some(at) => slice_object(&haystack[at + marker.len()..]).map(Some),
    None => Ok(None),
  }
}

/// Return the balanced `{...}` at the start of `input`, after optional
/// whitespace.
pub fn slice_object(input: &str) -> Result<&str, ScanError> {
  let start = input.len() - input.trim_start().len();
  let bytes = input.as_bytes();
  if bytes.get(start) != Some(&b'{') {
    return Err(ScanError::NoObject);
  }

  let mut state = State::Normal;
  let mut depth = 0usize;
  let mut string_start = start;

  // Structural characters are ASCII and never appear inside a multi-byte
  // UTF-8 sequence, so byte offsets found here are char boundaries.
  for (i, &b) in bytes.iter().enumerate().skip(start) {
    state = match (state, b) {
      (State::Normal, b'"') => {
        string_start = i;
        State::InString
      }
      (State::Normal, b'{') => {
        depth += 1;
        State::Normal
      }
      (State::Normal, b'}') => {
        depth -= 1;
        if depth == 0 {
          return Ok(&input[start..=i]);
        }
        State::Normal
      }
      (State::Normal, _) => State::Normal,
      (State::InString, b'\\') => State::Escaped,
      (State::InString, b'"') => State::Normal,
      (State::InString, _) => State::InString,
      (State::Escaped, _) => State::InString,
    };
  }

  match state {
    State::Normal => Err(ScanError::Unbalanced(depth)),
    State::InString | State::Escaped => {
      Err(ScanError::UnterminatedString(string_start))
    }
  }
}
