use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Characters stripped from both ends of a name. SQL lookups strip the
/// same set with `TRIM(name, ...)`.
const NAME_PADDING: [char; 4] = [' ', '\t', '\n', '\r'];

/// Restaurant names are stored trimmed and ASCII upper-cased, which is what
/// SQLite's `UPPER(TRIM(..))` computes for rows written by older versions.
/// Inner whitespace is kept as typed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RestaurantName(String);

impl RestaurantName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = Self::normalize(raw);
        if normalized.is_empty() {
            return Err(DomainError::InvalidRestaurantName(raw.to_owned()));
        }
        Ok(Self(normalized))
    }

    /// The comparison form of any stored or typed name.
    pub fn normalize(raw: &str) -> String {
        raw.trim_matches(&NAME_PADDING[..]).to_ascii_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RestaurantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    /// The stored text, unnormalized.
    pub name: String,
    pub kind: String,
    pub used: i64,
    pub last_visit: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddRestaurantOutcome {
    /// Inserted with usage 0; every restaurant's usage was reset to 0.
    Added,
    /// Nothing was written.
    AlreadyExists,
}

#[cfg(test)]
mod tests {
    use super::RestaurantName;
    use crate::errors::DomainError;

    #[test]
    fn names_are_upper_cased_and_trimmed() {
        let name = RestaurantName::parse(" \tPizza Place \n").expect("valid name");
        assert_eq!(name.as_str(), "PIZZA PLACE");
    }

    #[test]
    fn inner_whitespace_is_kept() {
        let name = RestaurantName::parse("pizza  place").expect("valid name");
        assert_eq!(name.as_str(), "PIZZA  PLACE");
        assert_eq!(RestaurantName::normalize(" Pizza  Place"), name.as_str());
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(
            RestaurantName::parse("   "),
            Err(DomainError::InvalidRestaurantName("   ".to_owned()))
        );
    }
}
