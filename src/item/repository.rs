use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{RepositoryError, UNICODE_LOWER};
use crate::item::domain::{Item, ItemId, NewItem};
use crate::pagination::Page;
use crate::state::DbPool;
use crate::user::UserId;

pub(crate) const ITEM_COLUMNS: &str = "id, name, description, available, owner_id, request_id";

pub(crate) fn map_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        available: row.get(3)?,
        owner_id: row.get(4)?,
        request_id: row.get(5)?,
    })
}

/// Turns free text into a LIKE pattern that matches it literally anywhere.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create(&self, owner: UserId, item: &NewItem) -> Result<Item, RepositoryError>;

    async fn find(&self, id: ItemId) -> Result<Option<Item>, RepositoryError>;

    /// Persists name, description and availability.
    async fn update(&self, item: &Item) -> Result<bool, RepositoryError>;

    /// Items of one owner, ordered by id.
    async fn find_by_owner(&self, owner: UserId, page: Page)
        -> Result<Vec<Item>, RepositoryError>;

    /// Available items whose name or description contains `text`, ignoring case.
    async fn search(&self, text: &str, page: Page) -> Result<Vec<Item>, RepositoryError>;
}

pub struct SqliteItemRepository {
    pool: DbPool,
}

impl SqliteItemRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn create(&self, owner: UserId, item: &NewItem) -> Result<Item, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO items (name, description, available, owner_id, request_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item.name,
                item.description,
                item.available,
                owner,
                item.request_id
            ],
        )?;

        Ok(Item {
            id: conn.last_insert_rowid(),
            name: item.name.clone(),
            description: item.description.clone(),
            available: item.available,
            owner_id: owner,
            request_id: item.request_id,
        })
    }

    async fn find(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let conn = self.pool.get()?;
        let item = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
                params![id],
                map_item,
            )
            .optional()?;
        Ok(item)
    }

    async fn update(&self, item: &Item) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE items SET name = ?1, description = ?2, available = ?3 WHERE id = ?4",
            params![item.name, item.description, item.available, item.id],
        )?;
        Ok(rows > 0)
    }

    async fn find_by_owner(
        &self,
        owner: UserId,
        page: Page,
    ) -> Result<Vec<Item>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items WHERE owner_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map(params![owner, page.limit, page.offset], map_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn search(&self, text: &str, page: Page) -> Result<Vec<Item>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM items
             WHERE available = 1
               AND ({lower}(name) LIKE ?1 ESCAPE '\\'
                    OR {lower}(description) LIKE ?1 ESCAPE '\\')
             ORDER BY id LIMIT ?2 OFFSET ?3",
            ITEM_COLUMNS,
            lower = UNICODE_LOWER
        ))?;
        let items = stmt
            .query_map(
                params![contains_pattern(&text.to_lowercase()), page.limit, page.offset],
                map_item,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::user::{NewUser, SqliteUserRepository, UserRepository};

    async fn setup() -> (SqliteItemRepository, UserId) {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let owner = SqliteUserRepository::new(pool.clone())
            .create(&NewUser {
                name: "Owner".into(),
                email: "owner@example.com".into(),
            })
            .await
            .unwrap();
        (SqliteItemRepository::new(pool), owner.id)
    }

    fn new_item(name: &str, description: &str, available: bool) -> NewItem {
        NewItem {
            name: name.into(),
            description: description.into(),
            available,
            request_id: None,
        }
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("drill"), "%drill%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn create_find_update() {
        let (repo, owner) = setup().await;
        let mut item = repo
            .create(owner, &new_item("Drill", "Cordless drill", true))
            .await
            .unwrap();

        item.available = false;
        assert!(repo.update(&item).await.unwrap());
        assert_eq!(repo.find(item.id).await.unwrap().unwrap(), item);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_skips_unavailable() {
        let (repo, owner) = setup().await;
        repo.create(owner, &new_item("Drill", "Cordless DRILL", true))
            .await
            .unwrap();
        repo.create(owner, &new_item("Saw", "hand saw", true))
            .await
            .unwrap();
        repo.create(owner, &new_item("Old drill", "broken", false))
            .await
            .unwrap();

        repo.create(owner, &new_item("Дрель", "ударная", true))
            .await
            .unwrap();

        let found = repo.search("dRiLl", Page::new(0, 10).unwrap()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Drill");

        let found = repo.search("дРЕЛЬ", Page::new(0, 10).unwrap()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Дрель");
    }

    #[tokio::test]
    async fn find_by_owner_pages_in_id_order() {
        let (repo, owner) = setup().await;
        for n in 0..5 {
            repo.create(owner, &new_item(&format!("Item {}", n), "thing", true))
                .await
                .unwrap();
        }

        let page = repo
            .find_by_owner(owner, Page::new(2, 2).unwrap())
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Item 2", "Item 3"]);
    }
}
