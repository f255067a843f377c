//! Case-insensitive, multi-valued header mapping.

use std::collections::BTreeMap;

/// HTTP headers keyed by lower-cased name.
///
/// Every header may carry several values; signers join them with `,` when the
/// header takes part in a canonical form. Iteration is in sorted key order,
/// which is the order both signature versions canonicalize in.
///
/// # Examples
///
/// ```
/// use rustack_client_core::HttpHeaders;
///
/// let mut headers = HttpHeaders::new();
/// headers.insert("Content-Type", "text/plain");
/// headers.set_if_blank("content-type", "application/xml");
/// assert_eq!(headers.first("CONTENT-TYPE"), Some("text/plain"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: BTreeMap<String, Vec<String>>,
}

impl HttpHeaders {
    /// Create an empty header mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values of `name` with a single `value`.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.inner
            .insert(name.as_ref().to_ascii_lowercase(), vec![value.into()]);
    }

    /// Add one more value to `name`.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.inner
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Set `name` only if it is absent or all of its values are blank.
    ///
    /// Returns `true` if the value was written.
    pub fn set_if_blank(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> bool {
        if self.is_blank(name.as_ref()) {
            self.insert(name, value);
            true
        } else {
            false
        }
    }

    /// All values for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// The first value for `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Values of `name` joined with `,`, the form used in canonical strings.
    #[must_use]
    pub fn joined(&self, name: &str) -> Option<String> {
        self.get(name).map(|values| values.join(","))
    }

    /// Whether `name` is absent or carries only empty values.
    #[must_use]
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name)
            .is_none_or(|values| values.iter().all(|v| v.trim().is_empty()))
    }

    /// Whether `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.inner.remove(&name.to_ascii_lowercase())
    }

    /// Whether there are no headers at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterate `(name, values)` in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HttpHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}
