use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::booking::domain::{
    Booking, BookingId, BookingState, BookingStatus, BookingSummary, NewBooking, Party,
};
use crate::db::RepositoryError;
use crate::item::ItemId;
use crate::pagination::Page;
use crate::state::DbPool;
use crate::user::UserId;

impl ToSql for BookingStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BookingStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<BookingStatus>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

const BOOKING_SELECT: &str = "
    SELECT b.id, b.start_date, b.end_date, b.status,
           i.id, i.name, i.owner_id,
           u.id, u.name
    FROM bookings b
    JOIN items i ON i.id = b.item_id
    JOIN users u ON u.id = b.booker_id";

fn map_booking(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        start: row.get(1)?,
        end: row.get(2)?,
        status: row.get(3)?,
        item: Party {
            id: row.get(4)?,
            name: row.get(5)?,
        },
        item_owner_id: row.get(6)?,
        booker: Party {
            id: row.get(7)?,
            name: row.get(8)?,
        },
    })
}

fn map_summary(row: &Row<'_>) -> rusqlite::Result<BookingSummary> {
    Ok(BookingSummary {
        id: row.get(0)?,
        booker_id: row.get(1)?,
        start: row.get(2)?,
        end: row.get(3)?,
    })
}

/// SQL predicate for a state, plus how many times `now` is bound into it.
/// Must agree with `BookingState::matches`.
fn state_clause(state: BookingState) -> (&'static str, usize) {
    match state {
        BookingState::All => ("", 0),
        BookingState::Current => (" AND b.start_date <= ? AND b.end_date >= ?", 2),
        BookingState::Past => (" AND b.end_date < ?", 1),
        BookingState::Future => (" AND b.start_date > ?", 1),
        BookingState::Waiting => (" AND b.status = 'WAITING'", 0),
        BookingState::Rejected => (" AND b.status = 'REJECTED'", 0),
    }
}

fn load(conn: &Connection, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
    let booking = conn
        .query_row(
            &format!("{} WHERE b.id = ?1", BOOKING_SELECT),
            params![id],
            map_booking,
        )
        .optional()?;
    Ok(booking)
}

/// Shared body of the booker and owner listings; `party_column` picks whose bookings.
fn list(
    conn: &Connection,
    party_column: &str,
    user: UserId,
    state: BookingState,
    now: NaiveDateTime,
    page: Page,
) -> Result<Vec<Booking>, RepositoryError> {
    let (clause, now_binds) = state_clause(state);
    let sql = format!(
        "{} WHERE {} = ?{} ORDER BY b.start_date DESC, b.id DESC LIMIT ? OFFSET ?",
        BOOKING_SELECT, party_column, clause
    );

    let mut args: Vec<&dyn ToSql> = vec![&user];
    for _ in 0..now_binds {
        args.push(&now);
    }
    args.push(&page.limit);
    args.push(&page.offset);

    let mut stmt = conn.prepare(&sql)?;
    let bookings = stmt
        .query_map(args.as_slice(), map_booking)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bookings)
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Stores a new booking in `WAITING` status.
    async fn create(&self, booker: UserId, booking: &NewBooking)
        -> Result<Booking, RepositoryError>;

    async fn find(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;

    async fn update_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<bool, RepositoryError>;

    /// Bookings made by `booker`, newest start first.
    async fn find_by_booker(
        &self,
        booker: UserId,
        state: BookingState,
        now: NaiveDateTime,
        page: Page,
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// Bookings of every item owned by `owner`, newest start first.
    async fn find_by_owner(
        &self,
        owner: UserId,
        state: BookingState,
        now: NaiveDateTime,
        page: Page,
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// Latest-ending approved booking of the item that has already started.
    async fn last_for_item(
        &self,
        item: ItemId,
        now: NaiveDateTime,
    ) -> Result<Option<BookingSummary>, RepositoryError>;

    /// Earliest approved booking of the item that has not started yet.
    async fn next_for_item(
        &self,
        item: ItemId,
        now: NaiveDateTime,
    ) -> Result<Option<BookingSummary>, RepositoryError>;

    /// Whether `booker` has an approved booking of the item that already ended.
    async fn has_completed_booking(
        &self,
        item: ItemId,
        booker: UserId,
        now: NaiveDateTime,
    ) -> Result<bool, RepositoryError>;
}

pub struct SqliteBookingRepository {
    pool: DbPool,
}

impl SqliteBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(
        &self,
        booker: UserId,
        booking: &NewBooking,
    ) -> Result<Booking, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO bookings (start_date, end_date, item_id, booker_id, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                booking.start,
                booking.end,
                booking.item_id,
                booker,
                BookingStatus::Waiting
            ],
        )?;

        let id = conn.last_insert_rowid();
        load(&conn, id)?.ok_or_else(|| {
            RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    async fn find(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let conn = self.pool.get()?;
        load(&conn, id)
    }

    async fn update_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE bookings SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(rows > 0)
    }

    async fn find_by_booker(
        &self,
        booker: UserId,
        state: BookingState,
        now: NaiveDateTime,
        page: Page,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let conn = self.pool.get()?;
        list(&conn, "b.booker_id", booker, state, now, page)
    }

    async fn find_by_owner(
        &self,
        owner: UserId,
        state: BookingState,
        now: NaiveDateTime,
        page: Page,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let conn = self.pool.get()?;
        list(&conn, "i.owner_id", owner, state, now, page)
    }

    async fn last_for_item(
        &self,
        item: ItemId,
        now: NaiveDateTime,
    ) -> Result<Option<BookingSummary>, RepositoryError> {
        let conn = self.pool.get()?;
        let summary = conn
            .query_row(
                "SELECT id, booker_id, start_date, end_date FROM bookings
                 WHERE item_id = ?1 AND status = ?2 AND start_date < ?3
                 ORDER BY end_date DESC LIMIT 1",
                params![item, BookingStatus::Approved, now],
                map_summary,
            )
            .optional()?;
        Ok(summary)
    }

    async fn next_for_item(
        &self,
        item: ItemId,
        now: NaiveDateTime,
    ) -> Result<Option<BookingSummary>, RepositoryError> {
        let conn = self.pool.get()?;
        let summary = conn
            .query_row(
                "SELECT id, booker_id, start_date, end_date FROM bookings
                 WHERE item_id = ?1 AND status = ?2 AND start_date > ?3
                 ORDER BY start_date ASC LIMIT 1",
                params![item, BookingStatus::Approved, now],
                map_summary,
            )
            .optional()?;
        Ok(summary)
    }

    async fn has_completed_booking(
        &self,
        item: ItemId,
        booker: UserId,
        now: NaiveDateTime,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let found: bool = conn.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE item_id = ?1 AND booker_id = ?2 AND status = ?3 AND end_date < ?4
             )",
            params![item, booker, BookingStatus::Approved, now],
            |row| row.get(0),
        )?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::item::{ItemRepository, NewItem, SqliteItemRepository};
    use crate::user::{NewUser, SqliteUserRepository, UserRepository};
    use chrono::{Duration, NaiveDate};

    struct Fixture {
        repo: SqliteBookingRepository,
        owner: UserId,
        booker: UserId,
        item: ItemId,
        now: NaiveDateTime,
    }

    async fn fixture() -> Fixture {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();

        let users = SqliteUserRepository::new(pool.clone());
        let owner = users
            .create(&NewUser {
                name: "Owner".into(),
                email: "owner@example.com".into(),
            })
            .await
            .unwrap();
        let booker = users
            .create(&NewUser {
                name: "Booker".into(),
                email: "booker@example.com".into(),
            })
            .await
            .unwrap();
        let item = SqliteItemRepository::new(pool.clone())
            .create(
                owner.id,
                &NewItem {
                    name: "Drill".into(),
                    description: "Cordless".into(),
                    available: true,
                    request_id: None,
                },
            )
            .await
            .unwrap();

        Fixture {
            repo: SqliteBookingRepository::new(pool),
            owner: owner.id,
            booker: booker.id,
            item: item.id,
            now: NaiveDate::from_ymd_opt(2030, 6, 15)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    impl Fixture {
        async fn book(&self, from_hours: i64, to_hours: i64, status: BookingStatus) -> Booking {
            let booking = self
                .repo
                .create(
                    self.booker,
                    &NewBooking {
                        item_id: self.item,
                        start: self.now + Duration::hours(from_hours),
                        end: self.now + Duration::hours(to_hours),
                    },
                )
                .await
                .unwrap();
            if status != BookingStatus::Waiting {
                self.repo.update_status(booking.id, status).await.unwrap();
            }
            self.repo.find(booking.id).await.unwrap().unwrap()
        }
    }

    fn ids(bookings: &[Booking]) -> Vec<BookingId> {
        bookings.iter().map(|b| b.id).collect()
    }

    #[tokio::test]
    async fn create_starts_waiting_with_parties() {
        let f = fixture().await;
        let b = f.book(1, 2, BookingStatus::Waiting).await;
        assert_eq!(b.status, BookingStatus::Waiting);
        assert_eq!(b.booker.id, f.booker);
        assert_eq!(b.item.name, "Drill");
        assert_eq!(b.item_owner_id, f.owner);
    }

    #[tokio::test]
    async fn store_rejects_inverted_window() {
        let f = fixture().await;
        let err = f
            .repo
            .create(
                f.booker,
                &NewBooking {
                    item_id: f.item,
                    start: f.now + Duration::hours(2),
                    end: f.now + Duration::hours(1),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn sql_filters_agree_with_domain_predicate() {
        let f = fixture().await;
        let all = vec![
            f.book(-48, -24, BookingStatus::Approved).await,
            f.book(-1, 1, BookingStatus::Approved).await,
            f.book(0, 3, BookingStatus::Waiting).await,
            f.book(24, 48, BookingStatus::Waiting).await,
            f.book(72, 96, BookingStatus::Rejected).await,
        ];
        let page = Page::all();

        for state in [
            BookingState::All,
            BookingState::Current,
            BookingState::Past,
            BookingState::Future,
            BookingState::Waiting,
            BookingState::Rejected,
        ] {
            let mut expected: Vec<&Booking> =
                all.iter().filter(|b| state.matches(b, f.now)).collect();
            expected.sort_by(|a, b| b.start.cmp(&a.start));
            let expected: Vec<BookingId> = expected.iter().map(|b| b.id).collect();

            let by_booker = f
                .repo
                .find_by_booker(f.booker, state, f.now, page)
                .await
                .unwrap();
            let by_owner = f
                .repo
                .find_by_owner(f.owner, state, f.now, page)
                .await
                .unwrap();

            assert_eq!(ids(&by_booker), expected, "booker view, {:?}", state);
            assert_eq!(ids(&by_owner), expected, "owner view, {:?}", state);
        }
    }

    #[tokio::test]
    async fn views_are_scoped_to_the_user() {
        let f = fixture().await;
        f.book(1, 2, BookingStatus::Waiting).await;

        let as_owner = f
            .repo
            .find_by_booker(f.owner, BookingState::All, f.now, Page::all())
            .await
            .unwrap();
        let as_booker = f
            .repo
            .find_by_owner(f.booker, BookingState::All, f.now, Page::all())
            .await
            .unwrap();
        assert!(as_owner.is_empty());
        assert!(as_booker.is_empty());
    }

    #[tokio::test]
    async fn listing_is_paginated_by_start_desc() {
        let f = fixture().await;
        let first = f.book(1, 2, BookingStatus::Waiting).await;
        let second = f.book(3, 4, BookingStatus::Waiting).await;
        let third = f.book(5, 6, BookingStatus::Waiting).await;

        let page = f
            .repo
            .find_by_booker(f.booker, BookingState::All, f.now, Page::new(0, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![third.id, second.id]);

        let page = f
            .repo
            .find_by_booker(f.booker, BookingState::All, f.now, Page::new(2, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![first.id]);
    }

    #[tokio::test]
    async fn last_and_next_only_consider_approved() {
        let f = fixture().await;
        let last = f.book(-10, -5, BookingStatus::Approved).await;
        f.book(-4, -3, BookingStatus::Rejected).await;
        let next = f.book(5, 10, BookingStatus::Approved).await;
        f.book(2, 3, BookingStatus::Waiting).await;
        f.book(20, 30, BookingStatus::Approved).await;

        let found_last = f.repo.last_for_item(f.item, f.now).await.unwrap().unwrap();
        let found_next = f.repo.next_for_item(f.item, f.now).await.unwrap().unwrap();
        assert_eq!(found_last.id, last.id);
        assert_eq!(found_next.id, next.id);
        assert_eq!(found_next.booker_id, f.booker);
    }

    #[tokio::test]
    async fn completed_booking_requires_approved_and_ended() {
        let f = fixture().await;
        f.book(-10, -5, BookingStatus::Rejected).await;
        f.book(-1, 1, BookingStatus::Approved).await;
        assert!(!f
            .repo
            .has_completed_booking(f.item, f.booker, f.now)
            .await
            .unwrap());

        f.book(-30, -20, BookingStatus::Approved).await;
        assert!(f
            .repo
            .has_completed_booking(f.item, f.booker, f.now)
            .await
            .unwrap());
        assert!(!f
            .repo
            .has_completed_booking(f.item, f.owner, f.now)
            .await
            .unwrap());
    }
}
