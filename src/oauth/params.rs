//! Signature parameter multimap and OAuth percent-encoding.

use std::collections::BTreeMap;

/// Percent-encodes a value with the OAuth reserved-character rule.
///
/// Starts from strict RFC 3986 encoding (every byte except ASCII alphanumerics
/// and `-._~` is escaped), then maps a raw `+` to a space and `%7E` back to `~`.
///
/// # Examples
///
/// ```
/// use garmin_connect::oauth::oauth_urlencode;
///
/// assert_eq!(oauth_urlencode("a b"), "a%20b");
/// assert_eq!(oauth_urlencode("~"), "~");
/// ```
#[must_use]
pub fn oauth_urlencode(value: &str) -> String {
    urlencoding::encode(value)
        .replace('+', " ")
        .replace("%7E", "~")
        .replace("%7e", "~")
}

/// Ordered multimap of OAuth and request parameters used to build a base string.
///
/// Keys are unique; a key may hold several values, each rendered as its own
/// `key=value` pair. Normalization sorts keys bytewise, then values bytewise
/// within a key, and percent-encodes both sides with [`oauth_urlencode`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureParameters {
    entries: BTreeMap<String, Vec<String>>,
}

impl SignatureParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a parameter set from `(key, value)` pairs, keeping repeated keys.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    /// Appends a value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// Merges every entry of `other` into this set.
    pub fn extend(&mut self, other: &SignatureParameters) {
        for (key, values) in &other.entries {
            self.entries
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    /// Returns the values stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens the set into `(key, value)` pairs in normalized order.
    ///
    /// Used to send the same parameters as a query string.
    #[must_use]
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, values) in &self.entries {
            let mut sorted = values.clone();
            sorted.sort();
            for value in sorted {
                pairs.push((key.clone(), value));
            }
        }
        pairs
    }

    /// Renders the normalized, encoded parameter string (`a=1&a=3&b=2`).
    #[must_use]
    pub fn normalized(&self) -> String {
        self.pairs()
            .iter()
            .map(|(key, value)| format!("{}={}", oauth_urlencode(key), oauth_urlencode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
