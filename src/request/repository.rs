use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::RepositoryError;
use crate::item::repository::{map_item, ITEM_COLUMNS};
use crate::item::Item;
use crate::pagination::Page;
use crate::request::domain::{ItemRequest, RequestId};
use crate::state::DbPool;
use crate::user::UserId;

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create(
        &self,
        requester: UserId,
        description: &str,
        created: NaiveDateTime,
    ) -> Result<ItemRequest, RepositoryError>;

    async fn find(&self, id: RequestId) -> Result<Option<ItemRequest>, RepositoryError>;

    /// The user's own requests, newest first.
    async fn find_by_requester(
        &self,
        requester: UserId,
    ) -> Result<Vec<ItemRequest>, RepositoryError>;

    /// Everyone else's requests, newest first.
    async fn find_by_others(
        &self,
        user: UserId,
        page: Page,
    ) -> Result<Vec<ItemRequest>, RepositoryError>;
}

pub struct SqliteRequestRepository {
    pool: DbPool,
}

impl SqliteRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_request(row: &Row<'_>) -> rusqlite::Result<ItemRequest> {
    Ok(ItemRequest {
        id: row.get(0)?,
        description: row.get(1)?,
        requester_id: row.get(2)?,
        created: row.get(3)?,
        items: Vec::new(),
    })
}

fn items_for(conn: &Connection, request: RequestId) -> Result<Vec<Item>, RepositoryError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM items WHERE request_id = ?1 ORDER BY id",
        ITEM_COLUMNS
    ))?;
    let items = stmt
        .query_map(params![request], map_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn with_items(
    conn: &Connection,
    mut requests: Vec<ItemRequest>,
) -> Result<Vec<ItemRequest>, RepositoryError> {
    for request in &mut requests {
        request.items = items_for(conn, request.id)?;
    }
    Ok(requests)
}

#[async_trait]
impl RequestRepository for SqliteRequestRepository {
    async fn create(
        &self,
        requester: UserId,
        description: &str,
        created: NaiveDateTime,
    ) -> Result<ItemRequest, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO requests (description, requester_id, created) VALUES (?1, ?2, ?3)",
            params![description, requester, created],
        )?;

        Ok(ItemRequest {
            id: conn.last_insert_rowid(),
            description: description.to_string(),
            requester_id: requester,
            created,
            items: Vec::new(),
        })
    }

    async fn find(&self, id: RequestId) -> Result<Option<ItemRequest>, RepositoryError> {
        let conn = self.pool.get()?;
        let request = conn
            .query_row(
                "SELECT id, description, requester_id, created FROM requests WHERE id = ?1",
                params![id],
                map_request,
            )
            .optional()?;

        match request {
            Some(mut request) => {
                request.items = items_for(&conn, request.id)?;
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    async fn find_by_requester(
        &self,
        requester: UserId,
    ) -> Result<Vec<ItemRequest>, RepositoryError> {
        let conn = self.pool.get()?;
        let requests = {
            let mut stmt = conn.prepare(
                "SELECT id, description, requester_id, created FROM requests
                 WHERE requester_id = ?1
                 ORDER BY created DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![requester], map_request)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        with_items(&conn, requests)
    }

    async fn find_by_others(
        &self,
        user: UserId,
        page: Page,
    ) -> Result<Vec<ItemRequest>, RepositoryError> {
        let conn = self.pool.get()?;
        let requests = {
            let mut stmt = conn.prepare(
                "SELECT id, description, requester_id, created FROM requests
                 WHERE requester_id != ?1
                 ORDER BY created DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(params![user, page.limit, page.offset], map_request)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        with_items(&conn, requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::item::{ItemRepository, NewItem, SqliteItemRepository};
    use crate::user::{NewUser, SqliteUserRepository, UserRepository};
    use chrono::{Duration, NaiveDate};

    #[tokio::test]
    async fn requests_list_newest_first_with_answering_items() {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let users = SqliteUserRepository::new(pool.clone());
        let asker = users
            .create(&NewUser {
                name: "Asker".into(),
                email: "asker@example.com".into(),
            })
            .await
            .unwrap();
        let lender = users
            .create(&NewUser {
                name: "Lender".into(),
                email: "lender@example.com".into(),
            })
            .await
            .unwrap();

        let repo = SqliteRequestRepository::new(pool.clone());
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let ladder = repo.create(asker.id, "ladder", t0).await.unwrap();
        let kayak = repo
            .create(asker.id, "kayak", t0 + Duration::days(1))
            .await
            .unwrap();

        SqliteItemRepository::new(pool.clone())
            .create(
                lender.id,
                &NewItem {
                    name: "Ladder".into(),
                    description: "Three metre ladder".into(),
                    available: true,
                    request_id: Some(ladder.id),
                },
            )
            .await
            .unwrap();

        let own = repo.find_by_requester(asker.id).await.unwrap();
        let ids: Vec<_> = own.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![kayak.id, ladder.id]);
        assert_eq!(own[1].items.len(), 1);
        assert_eq!(own[1].items[0].owner_id, lender.id);

        let found = repo.find(ladder.id).await.unwrap().unwrap();
        assert_eq!(found.items[0].name, "Ladder");

        let others_for_lender = repo.find_by_others(lender.id, Page::new(0, 1).unwrap()).await.unwrap();
        assert_eq!(others_for_lender.len(), 1);
        assert_eq!(others_for_lender[0].id, kayak.id);

        let others_for_asker = repo.find_by_others(asker.id, Page::all()).await.unwrap();
        assert!(others_for_asker.is_empty());
    }
}
