//! Cache key construction
//!
//! Callers compose keys from whichever arguments identify a value, instead of
//! deriving them implicitly from a call signature.

use std::fmt;

const SEPARATOR: char = ':';
const ESCAPE: char = '\\';
/// Written in place of an empty part, so that it still occupies a slot.
const EMPTY_PART: &str = "\\_";

/// A composite cache key built from ordered parts.
///
/// Parts are joined with `:`; occurrences of `:` and `\` inside a part are
/// escaped and an empty part is written as `\_`, so that different part lists
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CacheKey {
    encoded: String,
    parts: usize,
}

impl CacheKey {
    /// Starts an empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one part.
    pub fn part(mut self, part: impl fmt::Display) -> Self {
        if self.parts > 0 {
            self.encoded.push(SEPARATOR);
        }
        self.parts += 1;

        let part = part.to_string();
        if part.is_empty() {
            self.encoded.push_str(EMPTY_PART);
            return self;
        }
        for c in part.chars() {
            if c == SEPARATOR || c == ESCAPE {
                self.encoded.push(ESCAPE);
            }
            self.encoded.push(c);
        }
        self
    }

    /// Number of parts appended so far.
    pub fn len(&self) -> usize {
        self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts == 0
    }

    /// Builds a key from a list of parts.
    pub fn from_parts<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: fmt::Display,
    {
        parts.into_iter().fold(Self::new(), |key, part| key.part(part))
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.encoded
    }
}
