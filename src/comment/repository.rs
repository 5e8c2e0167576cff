use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{params, Row};

use crate::comment::domain::Comment;
use crate::db::RepositoryError;
use crate::item::ItemId;
use crate::state::DbPool;
use crate::user::UserId;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(
        &self,
        item: ItemId,
        author: UserId,
        text: &str,
        created: NaiveDateTime,
    ) -> Result<Comment, RepositoryError>;

    /// Comments on an item, oldest first.
    async fn find_by_item(&self, item: ItemId) -> Result<Vec<Comment>, RepositoryError>;
}

pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        text: row.get(1)?,
        author_name: row.get(2)?,
        created: row.get(3)?,
    })
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn create(
        &self,
        item: ItemId,
        author: UserId,
        text: &str,
        created: NaiveDateTime,
    ) -> Result<Comment, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (text, item_id, author_id, created) VALUES (?1, ?2, ?3, ?4)",
            params![text, item, author, created],
        )?;

        let id = conn.last_insert_rowid();
        let comment = conn.query_row(
            "SELECT c.id, c.text, u.name, c.created
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.id = ?1",
            params![id],
            map_comment,
        )?;
        Ok(comment)
    }

    async fn find_by_item(&self, item: ItemId) -> Result<Vec<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.text, u.name, c.created
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.item_id = ?1
             ORDER BY c.created, c.id",
        )?;
        let comments = stmt
            .query_map(params![item], map_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}
