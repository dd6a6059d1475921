//! Call-scoped settings for cooking a raw journal.

use chrono::{Datelike, Local};

/// Settings passed to [`crate::lower_to_cooked_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookConfig {
    /// Year used for dates written as `m/d`.
    pub default_year: i32,
}

impl CookConfig {
    /// Settings with an explicit default year.
    #[must_use]
    pub const fn new(default_year: i32) -> Self {
        Self { default_year }
    }

    /// Replace the default year.
    #[must_use]
    pub const fn with_default_year(mut self, default_year: i32) -> Self {
        self.default_year = default_year;
        self
    }
}

impl Default for CookConfig {
    /// The current local calendar year.
    fn default() -> Self {
        Self::new(Local::now().year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_current_year() {
        assert_eq!(CookConfig::default().default_year, Local::now().year());
    }

    #[test]
    fn test_with_default_year() {
        let config = CookConfig::default().with_default_year(1999);
        assert_eq!(config, CookConfig::new(1999));
    }
}
