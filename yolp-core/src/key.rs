//! Structured cache keys.
//!
//! A [`CacheKey`] is an ordered sequence of string tokens such as
//! `["restaurant", "7"]`. Equality and hashing are token-wise, so two keys
//! built from the same tokens always address the same entry, and no amount
//! of creative token content can make two different keys collide the way
//! joined strings can (`["a:b"]` vs `["a", "b"]`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized composite key addressing one logical resource in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey {
    tokens: Vec<String>,
}

impl CacheKey {
    /// Create a single-token key.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            tokens: vec![root.into()],
        }
    }

    /// Create a key from any sequence of displayable tokens.
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Self {
            tokens: tokens.into_iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Append a token, returning the extended key.
    pub fn with(mut self, token: impl ToString) -> Self {
        self.tokens.push(token.to_string());
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// True if every token of `prefix` matches the leading tokens of `self`.
    ///
    /// The empty key is a prefix of every key.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.tokens.starts_with(&prefix.tokens)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(":"))
    }
}

impl From<&str> for CacheKey {
    fn from(root: &str) -> Self {
        Self::new(root)
    }
}
