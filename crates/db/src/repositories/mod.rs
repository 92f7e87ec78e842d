use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use hanbot_core::{
    AddRestaurantOutcome, ApplicationError, CommandEntry, ContentFilter, ContentTable, Restaurant,
    RestaurantName, RunRecord, SelectedContent,
};

use crate::StoragePools;

pub mod catalog;
pub mod memory;
pub mod restaurant;
pub mod run_info;
pub mod selector;

pub use catalog::SqlCommandCatalogRepository;
pub use memory::InMemoryBotStore;
pub use restaurant::SqlRestaurantRepository;
pub use run_info::SqlRunInfoRepository;
pub use selector::SqlContentSelector;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Least-used pick with a random tie-break. The chosen row's `used` counter
/// is incremented before the row is returned.
#[async_trait]
pub trait ContentSelector: Send + Sync {
    /// `Ok(None)` means no row matched; storage failures are `Err`.
    async fn select_and_consume(
        &self,
        table: ContentTable,
        filter: Option<&ContentFilter>,
    ) -> Result<Option<SelectedContent>, RepositoryError>;
}

#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    async fn find_by_name(
        &self,
        name: &RestaurantName,
    ) -> Result<Option<Restaurant>, RepositoryError>;

    /// Inserts with usage 0 and resets every restaurant's usage, or does
    /// nothing when the name is already present.
    async fn add(&self, name: &RestaurantName) -> Result<AddRestaurantOutcome, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete_by_name(&self, name: &RestaurantName) -> Result<bool, RepositoryError>;

    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError>;
}

#[async_trait]
pub trait CommandCatalogRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<CommandEntry>, RepositoryError>;
}

#[async_trait]
pub trait RunInfoRepository: Send + Sync {
    async fn last_run(&self) -> Result<Option<String>, RepositoryError>;

    /// Stores `timestamp` as the latest run and reports whether a run had
    /// been recorded before.
    async fn record_run(&self, timestamp: &str) -> Result<RunRecord, RepositoryError>;
}

/// Every repository the bot talks to, behind trait objects.
#[derive(Clone)]
pub struct BotRepositories {
    pub selector: Arc<dyn ContentSelector>,
    pub restaurants: Arc<dyn RestaurantRepository>,
    pub catalog: Arc<dyn CommandCatalogRepository>,
    pub run_info: Arc<dyn RunInfoRepository>,
}

impl BotRepositories {
    pub fn sql(pools: &StoragePools) -> Self {
        Self {
            selector: Arc::new(SqlContentSelector::new(pools.clone())),
            restaurants: Arc::new(SqlRestaurantRepository::new(pools.functions.clone())),
            catalog: Arc::new(SqlCommandCatalogRepository::new(pools.functions.clone())),
            run_info: Arc::new(SqlRunInfoRepository::new(pools.jokes.clone())),
        }
    }

    pub fn in_memory(store: Arc<InMemoryBotStore>) -> Self {
        Self {
            selector: store.clone(),
            restaurants: store.clone(),
            catalog: store.clone(),
            run_info: store,
        }
    }
}
