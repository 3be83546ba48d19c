use std::fmt::{Display, Formatter};

use rbacsync_core::{AppError, AppResult};

/// Short natural-language code scoping localized documents, e.g. `en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale(String);

impl Locale {
    /// Creates a validated locale code.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation("locale must not be empty".to_owned()));
        }

        if !trimmed
            .chars()
            .all(|character| character.is_ascii_alphanumeric())
        {
            return Err(AppError::Validation(format!(
                "locale '{trimmed}' must contain only ASCII letters and digits"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Derives the locale from a host language tag by keeping its first two characters.
    pub fn from_language(language: &str) -> AppResult<Self> {
        let code: String = language.trim().chars().take(2).collect();
        Self::new(code)
    }

    /// Returns the locale code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Locale {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}
