pub mod config;
pub mod domain;
pub mod errors;

pub use domain::catalog::CommandEntry;
pub use domain::content::{ContentFilter, ContentStore, ContentTable, SelectedContent};
pub use domain::restaurant::{AddRestaurantOutcome, Restaurant, RestaurantName};
pub use domain::run_info::{run_timestamp, RunRecord, LAST_RUN_KEY};
pub use errors::{ApplicationError, DomainError, InterfaceError};
