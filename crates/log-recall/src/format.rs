//! Validated message format for recalled records.

use crate::constants::{DEFAULT_MESSAGE_FORMAT, MESSAGE_PLACEHOLDER};
use crate::error::ConfigError;
use std::fmt;
use std::sync::Arc;

/// A message format containing exactly one `%s` placeholder.
///
/// Validation happens in [`MessageFormat::new`], so a value of this type can
/// always be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormat {
    template: Arc<str>,
}

impl MessageFormat {
    /// Parses a format string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMessageFormat`] unless `template` contains
    /// exactly one `%s`.
    pub fn new(template: impl AsRef<str>) -> Result<Self, ConfigError> {
        let template = template.as_ref();
        let placeholders = template.matches(MESSAGE_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(ConfigError::InvalidMessageFormat {
                format: template.to_string(),
                placeholders,
            });
        }
        Ok(Self {
            template: Arc::from(template),
        })
    }

    /// Substitutes `message` into the placeholder.
    pub fn apply(&self, message: &str) -> String {
        self.template.replacen(MESSAGE_PLACEHOLDER, message, 1)
    }

    /// Returns the raw format string.
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for MessageFormat {
    fn default() -> Self {
        Self {
            template: Arc::from(DEFAULT_MESSAGE_FORMAT),
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl TryFrom<&str> for MessageFormat {
    type Error = ConfigError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_format() {
        let format = MessageFormat::default();
        assert_eq!(format.as_str(), "[RECALL] %s");
        assert_eq!(format.apply("ctx"), "[RECALL] ctx");
    }

    #[test]
    fn test_rejects_missing_placeholder() {
        let err = MessageFormat::new("[RECALL]").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidMessageFormat {
                format: "[RECALL]".into(),
                placeholders: 0
            }
        );
    }

    #[test]
    fn test_rejects_extra_placeholder() {
        assert!(MessageFormat::new("%s and %s").is_err());
    }

    #[test]
    fn test_message_containing_placeholder_is_not_expanded_twice() {
        let format = MessageFormat::new("<%s>").unwrap();
        assert_eq!(format.apply("100%s"), "<100%s>");
    }

    proptest! {
        /// Property: any prefix/suffix without a placeholder yields a valid format
        /// that wraps the message verbatim.
        #[test]
        fn prop_valid_format_wraps_message(
            prefix in "[a-zA-Z \\[\\]]{0,10}",
            suffix in "[a-zA-Z \\[\\]]{0,10}",
            message in "[a-z ]{0,20}"
        ) {
            let format = MessageFormat::new(format!("{}%s{}", prefix, suffix)).unwrap();
            prop_assert_eq!(format.apply(&message), format!("{}{}{}", prefix, message, suffix));
        }

        /// Property: strings without a placeholder are always rejected.
        #[test]
        fn prop_no_placeholder_rejected(template in "[a-zA-Z \\[\\]]{0,20}") {
            prop_assert!(MessageFormat::new(template).is_err());
        }
    }
}
