//! Wish records and the ordered collection that holds them.
//!
//! The serialized collection is a JSON array of
//! `{"id", "text", "author", "timestamp"}` records. That is the whole slot
//! format; there is no header or version field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One submitted wish. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wish {
    /// Unique within the store, derived from the creation millisecond.
    pub id: i64,
    /// Trimmed, non-empty wish text.
    pub text: String,
    /// Display identity captured at submission time.
    pub author: String,
    /// Creation instant in epoch milliseconds.
    pub timestamp: i64,
}

impl Wish {
    /// Creation instant as a UTC datetime, if the timestamp is in range.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Ordered, append-only sequence of wishes, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WishCollection {
    wishes: Vec<Wish>,
}

impl WishCollection {
    #[must_use]
    pub const fn new() -> Self {
        Self { wishes: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.wishes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wishes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Wish> {
        self.wishes.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Wish] {
        &self.wishes
    }

    /// Most recently appended wish.
    #[must_use]
    pub fn last(&self) -> Option<&Wish> {
        self.wishes.last()
    }

    /// Largest id in the collection.
    #[must_use]
    pub fn max_id(&self) -> Option<i64> {
        self.wishes.iter().map(|wish| wish.id).max()
    }

    pub(crate) fn push(&mut self, wish: Wish) {
        self.wishes.push(wish);
    }

    /// Serialize the whole collection into slot bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse slot bytes back into a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a JSON array of wish records.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl<'a> IntoIterator for &'a WishCollection {
    type Item = &'a Wish;
    type IntoIter = std::slice::Iter<'a, Wish>;

    fn into_iter(self) -> Self::IntoIter {
        self.wishes.iter()
    }
}

impl From<Vec<Wish>> for WishCollection {
    fn from(wishes: Vec<Wish>) -> Self {
        Self { wishes }
    }
}
