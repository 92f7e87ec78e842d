use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;

use hanbot_core::{
    AddRestaurantOutcome, CommandEntry, ContentFilter, ContentTable, Restaurant, RestaurantName,
    RunRecord, SelectedContent, LAST_RUN_KEY,
};

use super::{
    CommandCatalogRepository, ContentSelector, RepositoryError, RestaurantRepository,
    RunInfoRepository,
};

#[derive(Clone, Debug)]
struct MemoryRow {
    id: i64,
    content: String,
    kind: String,
    used: i64,
    last_visit: Option<chrono::DateTime<Utc>>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    rows: HashMap<ContentTable, Vec<MemoryRow>>,
    commands: Vec<CommandEntry>,
    info: HashMap<String, String>,
}

impl MemoryState {
    fn push(&mut self, table: ContentTable, content: String, kind: String, used: i64) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        self.rows.entry(table).or_default().push(MemoryRow {
            id,
            content,
            kind,
            used,
            last_visit: None,
        });
        id
    }
}

/// One shared store backing every repository trait, so restaurants added
/// through [`RestaurantRepository`] are visible to the selector.
#[derive(Default)]
pub struct InMemoryBotStore {
    state: RwLock<MemoryState>,
}

impl InMemoryBotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` exactly as given, like a row written by hand.
    pub async fn insert(&self, table: ContentTable, content: &str, used: i64) -> i64 {
        self.state.write().await.push(table, content.to_owned(), String::new(), used)
    }

    /// Sets every counter in `table` back to `used`.
    pub async fn reset_usage(&self, table: ContentTable, used: i64) {
        let mut state = self.state.write().await;
        for row in state.rows.entry(table).or_default() {
            row.used = used;
        }
    }

    pub async fn insert_command(&self, entry: CommandEntry) {
        self.state.write().await.commands.push(entry);
    }

    /// Usage counters keyed by content, for assertions.
    pub async fn usage(&self, table: ContentTable) -> HashMap<String, i64> {
        let state = self.state.read().await;
        state
            .rows
            .get(&table)
            .map(|rows| rows.iter().map(|row| (row.content.clone(), row.used)).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContentSelector for InMemoryBotStore {
    async fn select_and_consume(
        &self,
        table: ContentTable,
        filter: Option<&ContentFilter>,
    ) -> Result<Option<SelectedContent>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(rows) = state.rows.get_mut(&table) else {
            return Ok(None);
        };

        let candidates = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| filter.map_or(true, |f| f.matches(&row.content)))
            .map(|(index, row)| (index, row.used))
            .collect::<Vec<_>>();
        let Some(min_used) = candidates.iter().map(|(_, used)| *used).min() else {
            return Ok(None);
        };
        let tied = candidates
            .into_iter()
            .filter(|(_, used)| *used == min_used)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        let Some(index) = tied.choose(&mut rand::thread_rng()).copied() else {
            return Ok(None);
        };

        let row = &mut rows[index];
        row.used += 1;
        if table == ContentTable::Restaurants {
            row.last_visit = Some(Utc::now());
        }

        Ok(Some(SelectedContent { table, id: row.id, content: row.content.clone(), used: row.used }))
    }
}

#[async_trait]
impl RestaurantRepository for InMemoryBotStore {
    async fn find_by_name(
        &self,
        name: &RestaurantName,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let state = self.state.read().await;
        let found = state
            .rows
            .get(&ContentTable::Restaurants)
            .and_then(|rows| rows.iter().find(|row| same_name(row, name)))
            .map(to_restaurant);
        Ok(found)
    }

    async fn add(&self, name: &RestaurantName) -> Result<AddRestaurantOutcome, RepositoryError> {
        let mut state = self.state.write().await;
        let rows = state.rows.entry(ContentTable::Restaurants).or_default();
        if rows.iter().any(|row| same_name(row, name)) {
            return Ok(AddRestaurantOutcome::AlreadyExists);
        }

        state.push(ContentTable::Restaurants, name.to_string(), String::new(), 0);
        for row in state.rows.entry(ContentTable::Restaurants).or_default() {
            row.used = 0;
        }
        Ok(AddRestaurantOutcome::Added)
    }

    async fn delete_by_name(&self, name: &RestaurantName) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let rows = state.rows.entry(ContentTable::Restaurants).or_default();
        let before = rows.len();
        rows.retain(|row| !same_name(row, name));
        Ok(rows.len() != before)
    }

    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .get(&ContentTable::Restaurants)
            .map(|rows| rows.iter().map(to_restaurant).collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CommandCatalogRepository for InMemoryBotStore {
    async fn list(&self) -> Result<Vec<CommandEntry>, RepositoryError> {
        Ok(self.state.read().await.commands.clone())
    }
}

#[async_trait]
impl RunInfoRepository for InMemoryBotStore {
    async fn last_run(&self) -> Result<Option<String>, RepositoryError> {
        Ok(self.state.read().await.info.get(LAST_RUN_KEY).cloned())
    }

    async fn record_run(&self, timestamp: &str) -> Result<RunRecord, RepositoryError> {
        let mut state = self.state.write().await;
        let previous = state.info.insert(LAST_RUN_KEY.to_owned(), timestamp.to_owned());
        Ok(match previous {
            Some(previous) => RunRecord::Repeat { previous },
            None => RunRecord::FirstRun,
        })
    }
}

fn same_name(row: &MemoryRow, name: &RestaurantName) -> bool {
    RestaurantName::normalize(&row.content) == name.as_str()
}

fn to_restaurant(row: &MemoryRow) -> Restaurant {
    Restaurant {
        id: row.id,
        name: row.content.clone(),
        kind: row.kind.clone(),
        used: row.used,
        last_visit: row.last_visit,
    }
}
