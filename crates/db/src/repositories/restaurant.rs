use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use hanbot_core::{run_timestamp, AddRestaurantOutcome, Restaurant, RestaurantName};

use super::{RepositoryError, RestaurantRepository};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT rowid AS id, IFNULL(CAST(name AS TEXT), '') AS name,
        IFNULL(CAST(type AS TEXT), '') AS kind, IFNULL(used, 0) AS used,
        CAST(last_visit AS TEXT) AS last_visit
     FROM restaurants";

/// SQL side of `RestaurantName::normalize`: the same padding characters
/// trimmed, then ASCII upper-cased.
const NORMALIZED_NAME: &str = "UPPER(TRIM(name, ' ' || char(9) || char(10) || char(13)))";

pub struct SqlRestaurantRepository {
    pool: DbPool,
}

impl SqlRestaurantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantRepository for SqlRestaurantRepository {
    async fn find_by_name(
        &self,
        name: &RestaurantName,
    ) -> Result<Option<Restaurant>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE {NORMALIZED_NAME} = ?1 LIMIT 1"))
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_restaurant(&row)).transpose()
    }

    async fn add(&self, name: &RestaurantName) -> Result<AddRestaurantOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM restaurants WHERE {NORMALIZED_NAME} = ?1)"
        ))
        .bind(name.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if exists != 0 {
            tx.rollback().await?;
            return Ok(AddRestaurantOutcome::AlreadyExists);
        }

        sqlx::query(
            "INSERT INTO restaurants (name, type, used, last_visit) VALUES (?1, '', 0, ?2)",
        )
        .bind(name.as_str())
        .bind(run_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE restaurants SET used = 0").execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(AddRestaurantOutcome::Added)
    }

    async fn delete_by_name(&self, name: &RestaurantName) -> Result<bool, RepositoryError> {
        let result = sqlx::query(&format!("DELETE FROM restaurants WHERE {NORMALIZED_NAME} = ?1"))
            .bind(name.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rows in insertion order, names exactly as stored.
    async fn list(&self) -> Result<Vec<Restaurant>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY rowid ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_restaurant).collect()
    }
}

fn row_to_restaurant(row: &SqliteRow) -> Result<Restaurant, RepositoryError> {
    let last_visit: Option<String> =
        row.try_get("last_visit").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Restaurant {
        id: row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        name: row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        kind: row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        used: row.try_get("used").map_err(|e| RepositoryError::Decode(e.to_string()))?,
        last_visit: last_visit.as_deref().and_then(parse_visit_timestamp),
    })
}

/// Accepts RFC 3339 (what this crate writes) and the plain
/// `YYYY-MM-DD HH:MM:SS` form SQLite's date functions produce.
fn parse_visit_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok().map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use hanbot_core::{AddRestaurantOutcome, RestaurantName};

    use super::{parse_visit_timestamp, SqlRestaurantRepository};
    use crate::repositories::RestaurantRepository;
    use crate::{migrations, DbPool, StoragePools};

    async fn setup() -> (StoragePools, SqlRestaurantRepository) {
        let pools = StoragePools::in_memory().await.expect("connect");
        migrations::run_pending(&pools).await.expect("migrate");
        let repo = SqlRestaurantRepository::new(pools.functions.clone());
        (pools, repo)
    }

    fn name(raw: &str) -> RestaurantName {
        RestaurantName::parse(raw).expect("valid name")
    }

    async fn usage(pool: &DbPool) -> Vec<(String, i64)> {
        sqlx::query_as("SELECT name, used FROM restaurants ORDER BY name")
            .fetch_all(pool)
            .await
            .expect("load usage")
    }

    #[tokio::test]
    async fn add_inserts_normalized_name_and_resets_rotation() {
        let (pools, repo) = setup().await;
        sqlx::query("INSERT INTO restaurants (name, used) VALUES ('DELI', 3), ('TACOS', 7)")
            .execute(&pools.functions)
            .await
            .expect("seed");

        let outcome = repo.add(&name("Pizza Place")).await.expect("add");

        assert_eq!(outcome, AddRestaurantOutcome::Added);
        assert_eq!(
            usage(&pools.functions).await,
            vec![("DELI".to_owned(), 0), ("PIZZA PLACE".to_owned(), 0), ("TACOS".to_owned(), 0)]
        );
    }

    #[tokio::test]
    async fn add_existing_name_writes_nothing() {
        let (pools, repo) = setup().await;
        sqlx::query("INSERT INTO restaurants (name, used) VALUES ('PIZZA PLACE', 2), ('DELI', 5)")
            .execute(&pools.functions)
            .await
            .expect("seed");

        let outcome = repo.add(&name("pizza place")).await.expect("add");

        assert_eq!(outcome, AddRestaurantOutcome::AlreadyExists);
        assert_eq!(
            usage(&pools.functions).await,
            vec![("DELI".to_owned(), 5), ("PIZZA PLACE".to_owned(), 2)]
        );
    }

    #[tokio::test]
    async fn delete_removes_exactly_the_named_row() {
        let (pools, repo) = setup().await;
        repo.add(&name("Tonys")).await.expect("add tonys");
        repo.add(&name("Deli")).await.expect("add deli");

        assert!(repo.delete_by_name(&name("tonys")).await.expect("delete"));
        assert!(!repo.delete_by_name(&name("tonys")).await.expect("delete again"));

        assert_eq!(usage(&pools.functions).await, vec![("DELI".to_owned(), 0)]);
    }

    #[tokio::test]
    async fn lookups_match_rows_stored_with_other_casing() {
        let (pools, repo) = setup().await;
        sqlx::query("INSERT INTO restaurants (name, type, used) VALUES ('Tonys', 'pizza', 1)")
            .execute(&pools.functions)
            .await
            .expect("seed legacy row");

        let found = repo.find_by_name(&name("TONYS")).await.expect("find").expect("present");

        assert_eq!(found.name, "Tonys");
        assert_eq!(found.kind, "pizza");
        assert_eq!(found.used, 1);
        assert_eq!(repo.add(&name("tonys")).await.expect("add"), AddRestaurantOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn legacy_rows_with_padding_and_inner_spacing_are_matched() {
        let (pools, repo) = setup().await;
        sqlx::query(
            "INSERT INTO restaurants (name, used) VALUES ('Pizza  Place ', 4), (char(9) || 'deli', 2)",
        )
        .execute(&pools.functions)
        .await
        .expect("seed legacy rows");

        assert_eq!(
            repo.add(&name("pizza  place")).await.expect("add"),
            AddRestaurantOutcome::AlreadyExists
        );
        assert!(repo.find_by_name(&name("DELI")).await.expect("find").is_some());
        assert!(repo.delete_by_name(&name("Deli")).await.expect("delete"));
        assert_eq!(usage(&pools.functions).await, vec![("Pizza  Place ".to_owned(), 4)]);
    }

    #[tokio::test]
    async fn blank_legacy_rows_do_not_break_the_list() {
        let (pools, repo) = setup().await;
        sqlx::query("INSERT INTO restaurants (name, used) VALUES ('TONYS', 0), (' ', 0)")
            .execute(&pools.functions)
            .await
            .expect("seed legacy rows");

        let names: Vec<String> = repo
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|restaurant| restaurant.name)
            .collect();

        assert_eq!(names, vec!["TONYS".to_owned(), " ".to_owned()]);
    }

    #[tokio::test]
    async fn list_returns_rows_in_insertion_order() {
        let (_pools, repo) = setup().await;
        for raw in ["Tacos", "Deli", "Pho"] {
            repo.add(&name(raw)).await.expect("add");
        }

        let names: Vec<String> = repo
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|restaurant| restaurant.name)
            .collect();

        assert_eq!(names, vec!["TACOS", "DELI", "PHO"]);
    }

    #[test]
    fn visit_timestamps_accept_both_stored_forms() {
        assert!(parse_visit_timestamp("2026-10-19T08:23:19.000Z").is_some());
        assert!(parse_visit_timestamp("2026-10-19 08:23:19").is_some());
        assert!(parse_visit_timestamp("yesterday").is_none());
    }
}
