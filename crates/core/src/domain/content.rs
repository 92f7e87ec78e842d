use serde::{Deserialize, Serialize};

/// Which SQLite file a table lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStore {
    Jokes,
    Functions,
}

/// Tables whose rows rotate through the least-used pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTable {
    Jokes,
    Restaurants,
    Bandito,
}

impl ContentTable {
    pub const ALL: [ContentTable; 3] = [Self::Jokes, Self::Restaurants, Self::Bandito];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Jokes => "jokes",
            Self::Restaurants => "restaurants",
            Self::Bandito => "bandito",
        }
    }

    pub fn store(&self) -> ContentStore {
        match self {
            Self::Jokes => ContentStore::Jokes,
            Self::Restaurants | Self::Bandito => ContentStore::Functions,
        }
    }
}

impl std::fmt::Display for ContentTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Narrows a pick to rows whose content column equals the given value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentFilter {
    ContentEquals(String),
}

impl ContentFilter {
    pub fn matches(&self, content: &str) -> bool {
        match self {
            Self::ContentEquals(expected) => expected == content,
        }
    }
}

/// A row chosen by the selector. `used` is the counter after the increment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedContent {
    pub table: ContentTable,
    pub id: i64,
    pub content: String,
    pub used: i64,
}

#[cfg(test)]
mod tests {
    use super::{ContentFilter, ContentStore, ContentTable};

    #[test]
    fn jokes_live_apart_from_lunch_tables() {
        assert_eq!(ContentTable::Jokes.store(), ContentStore::Jokes);
        assert_eq!(ContentTable::Restaurants.store(), ContentStore::Functions);
        assert_eq!(ContentTable::Bandito.store(), ContentStore::Functions);
    }

    #[test]
    fn content_filter_is_exact() {
        let filter = ContentFilter::ContentEquals("TONYS".to_owned());
        assert!(filter.matches("TONYS"));
        assert!(!filter.matches("tonys"));
        assert!(!filter.matches("TONYS PIZZA"));
    }
}
