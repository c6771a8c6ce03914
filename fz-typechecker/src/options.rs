//! Resolver settings.
//!
//! Limits bound the identifier space of a session. Exceeding `max_features`
//! or `max_types` is the one fatal condition of resolution.

use std::env;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Diagnostics stored before further errors are only counted
    pub max_errors: usize,
    pub max_features: usize,
    pub max_types: usize,
    /// Load the built-in declarations (`Any`, `bool`, `i32`, ...) before the program
    pub load_prelude: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_errors: 100,
            max_features: 1 << 20,
            max_types: 1 << 20,
            load_prelude: true,
        }
    }
}

impl ResolverOptions {
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_max_types(mut self, max_types: usize) -> Self {
        self.max_types = max_types;
        self
    }

    pub fn without_prelude(mut self) -> Self {
        self.load_prelude = false;
        self
    }

    /// Defaults overridden by `FZ_MAX_ERRORS`, `FZ_MAX_FEATURES` and
    /// `FZ_MAX_TYPES`. Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(n) = read_limit("FZ_MAX_ERRORS") {
            options.max_errors = n;
        }
        if let Some(n) = read_limit("FZ_MAX_FEATURES") {
            options.max_features = n;
        }
        if let Some(n) = read_limit("FZ_MAX_TYPES") {
            options.max_types = n;
        }
        options
    }
}

fn read_limit(var: &str) -> Option<usize> {
    let value = env::var(var).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(var, value = value.as_str(), error = %e, "ignoring invalid limit");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builders() {
        let options = ResolverOptions::default()
            .with_max_errors(3)
            .with_max_types(50)
            .without_prelude();

        assert_eq!(options.max_errors, 3);
        assert_eq!(options.max_types, 50);
        assert_eq!(options.max_features, ResolverOptions::default().max_features);
        assert!(!options.load_prelude);
    }

    #[test]
    fn test_unset_limit_keeps_default() {
        assert_eq!(read_limit("FZ_TEST_UNSET_LIMIT_VARIABLE"), None);
    }
}
