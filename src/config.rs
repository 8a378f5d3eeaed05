//! Configuration for lock verification.
//!
//! [`Config`] carries the caller-side expectations checked before a replay
//! starts: which provider the lock must belong to, which schema version is
//! accepted, and whether the raw capture hash is verified.

/// Schema version written by [`crate::replay::seal`] when none is given
pub const DEFAULT_SCHEMA_VERSION: &str = "1";

/// Configuration for [`crate::replay::verify_capture`]
///
/// # Example
///
/// ```rust
/// use book_replay::Config;
///
/// let config = Config::new("okx-books");
///
/// // Pin the schema version
/// let pinned = Config::new("okx-books").with_schema_version("2");
///
/// // Trust the capture bytes (already checked upstream)
/// let trusted = Config::new("okx-books").with_raw_digest_check(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Provider the lock must name
    provider_id: String,

    /// Accepted schema version (any when `None`)
    schema_version: Option<String>,

    /// Verify `raw_sha256` before replaying
    check_raw_digest: bool,
}

impl Config {
    /// Create a configuration for the given provider
    ///
    /// The raw digest check is on and any schema version is accepted.
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            schema_version: None,
            check_raw_digest: true,
        }
    }

    /// Only accept locks with this schema version
    #[must_use]
    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = Some(version.into());
        self
    }

    /// Enable or disable the raw capture hash check
    #[must_use]
    pub fn with_raw_digest_check(mut self, enabled: bool) -> Self {
        self.check_raw_digest = enabled;
        self
    }

    /// Get the expected provider
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Get the pinned schema version
    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    /// Whether the raw capture hash is checked
    pub fn check_raw_digest(&self) -> bool {
        self.check_raw_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new("okx-books");
        assert_eq!(config.provider_id(), "okx-books");
        assert_eq!(config.schema_version(), None);
        assert!(config.check_raw_digest());
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::new("p")
            .with_schema_version("2")
            .with_raw_digest_check(false);

        assert_eq!(config.schema_version(), Some("2"));
        assert!(!config.check_raw_digest());
    }
}
