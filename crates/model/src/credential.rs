use std::fmt::{self, Debug};

/// An API key supplied by the operator.
///
/// The value never shows up in `Debug` output, so it is safe to log
/// structures that carry it.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Creates a credential from the raw key.
    #[inline]
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// Returns `true` if the key is empty or consists only of whitespace.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the raw key, for use in a transport header.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

impl From<String> for Credential {
    #[inline]
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for Credential {
    #[inline]
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}
