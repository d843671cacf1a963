//! Field validation helpers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("static regex is valid")
});

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
    .expect("static regex is valid")
});

/// Whether `value` looks like an email address
pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Whether `value` is an http(s) URL
pub fn is_valid_url(value: &str) -> bool {
    URL.is_match(value)
}

/// Collects every failed check so a response lists all of them at once
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    /// Start with no violations
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `ok`
    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.0.push(message.into());
        }
        self
    }

    /// Record `message` if the string is blank
    pub fn require(&mut self, value: &str, message: impl Into<String>) -> &mut Self {
        self.check(!value.trim().is_empty(), message)
    }

    /// Record `message` if `value` has more than `max` characters
    pub fn max_len(&mut self, value: &str, max: usize, message: impl Into<String>) -> &mut Self {
        self.check(value.chars().count() <= max, message)
    }

    /// `Ok` when nothing failed, otherwise a validation error joining the messages
    pub fn finish(&mut self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationError(std::mem::take(&mut self.0).join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("john@gmail.com"));
        assert!(is_valid_email("mary.jane@devworks.co.uk"));
        assert!(!is_valid_email("john@"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn test_url() {
        assert!(is_valid_url("https://devworks.com"));
        assert!(is_valid_url("http://www.codemasters.io/path?q=1"));
        assert!(!is_valid_url("ftp://devworks.com"));
        assert!(!is_valid_url("devworks"));
    }

    #[test]
    fn test_violations_join() {
        let err = Violations::new()
            .require("", "Please add a name")
            .max_len("abcdef", 3, "Name can not be more than 3 characters")
            .require("ok", "unused")
            .finish()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Please add a name, Name can not be more than 3 characters"
        );
    }
}
