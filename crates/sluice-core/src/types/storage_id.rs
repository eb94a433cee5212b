//! Storage identifiers for promoted files.

use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Identifier under which a promoted file is stored, of the form
/// `<hex millis>-<12 hex>`, e.g. `18f2a1c3b4d-5e6f7a8b9c0d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageIdentifier(String);

impl StorageIdentifier {
    /// Generates a new identifier from the current time and random bits.
    #[must_use]
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{millis:x}-{}", &random[..12]))
    }

    /// Returns the identifier text.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
