//! Status vocabulary used to classify the `ups.status` text.

use serde::{Deserialize, Serialize};

/// Tokens that mark one power condition.
///
/// `phrases` match as case-insensitive substrings ("On Battery");
/// `flags` match whole whitespace-separated words, case-insensitively,
/// the way NUT reports terse status flags ("OB DISCHRG").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub phrases: Vec<String>,
    pub flags: Vec<String>,
}

impl TokenSet {
    pub fn new<P, F>(phrases: P, flags: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
            flags: flags.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `status` contains any phrase or flag of this set.
    pub fn matches(&self, status: &str) -> bool {
        let lowered = status.to_lowercase();
        let phrase_hit = self
            .phrases
            .iter()
            .filter(|phrase| !phrase.is_empty())
            .any(|phrase| lowered.contains(&phrase.to_lowercase()));

        phrase_hit
            || status.split_whitespace().any(|word| {
                self.flags
                    .iter()
                    .any(|flag| !flag.is_empty() && word.eq_ignore_ascii_case(flag))
            })
    }
}

/// Token table used to derive the on-battery and low-battery flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTokens {
    pub on_battery: TokenSet,
    pub low_battery: TokenSet,
}

impl Default for StatusTokens {
    fn default() -> Self {
        Self {
            on_battery: TokenSet::new(["on battery", "onbatt"], ["OB"]),
            low_battery: TokenSet::new(["low battery", "lowbatt"], ["LB"]),
        }
    }
}

impl StatusTokens {
    /// Add extra on-battery phrases.
    pub fn with_on_battery<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_battery
            .phrases
            .extend(phrases.into_iter().map(Into::into));
        self
    }

    /// Add extra low-battery phrases.
    pub fn with_low_battery<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.low_battery
            .phrases
            .extend(phrases.into_iter().map(Into::into));
        self
    }

    pub fn is_on_battery(&self, status: &str) -> bool {
        self.on_battery.matches(status)
    }

    pub fn is_low_battery(&self, status: &str) -> bool {
        self.low_battery.matches(status)
    }
}
