//! PostgreSQL implementation of `Storage` and `StatsStorage`.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate builds without a
//! live database. Schema lives in `migrations/`.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::Storage;
use crate::domain::{
    AnyRequest, Category, CategoryId, Event, EventId, EventState, NewCategory, NewEvent,
    NewRequest, NewUser, Page, ParticipationRequest, RequestData, RequestId, RequestState,
    RequestStatus, User, UserId,
};
use crate::error::{Result, TurnoutError};
use crate::stats::{Hit, StatsFilter, StatsStorage, ViewStats};

pub mod pool_provider;

pub use pool_provider::{PoolProvider, TestDbPools};

/// Postgres error code for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Open a connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to connect to database: {}", e)))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: EventId,
    title: String,
    category_id: CategoryId,
    initiator_id: UserId,
    state: EventState,
    participant_limit: i32,
    request_moderation: bool,
    created_on: DateTime<Utc>,
    published_on: Option<DateTime<Utc>>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            category: row.category_id,
            initiator: row.initiator_id,
            state: row.state,
            participant_limit: row.participant_limit,
            request_moderation: row.request_moderation,
            created_on: row.created_on,
            published_on: row.published_on,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: RequestId,
    requester_id: UserId,
    event_id: EventId,
    status: RequestStatus,
    created: DateTime<Utc>,
}

impl From<RequestRow> for AnyRequest {
    fn from(row: RequestRow) -> Self {
        AnyRequest::from_parts(
            RequestData {
                id: row.id,
                requester: row.requester_id,
                event: row.event_id,
                created: row.created,
            },
            row.status,
        )
    }
}

const EVENT_COLUMNS: &str = "id, title, category_id, initiator_id, state, participant_limit, \
     request_moderation, created_on, published_on";

const REQUEST_COLUMNS: &str = "id, requester_id, event_id, status, created";

/// PostgreSQL storage for the main service and the stats service.
///
/// # Example
/// ```ignore
/// let pool = create_pool("postgresql://localhost/turnout", 5).await?;
/// let storage = Arc::new(PostgresStorage::new(pool));
/// let service = ParticipationService::new(storage);
/// ```
pub struct PostgresStorage<P: PoolProvider = PgPool> {
    pools: P,
}

impl<P: PoolProvider> PostgresStorage<P> {
    pub fn new(pools: P) -> Self {
        Self { pools }
    }
}

#[async_trait]
impl<P: PoolProvider> Storage for PostgresStorage<P> {
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    async fn create_user(&self, input: NewUser) -> Result<User> {
        let (id,): (UserId,) =
            sqlx::query_as("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id")
                .bind(&input.name)
                .bind(&input.email)
                .fetch_one(self.pools.write())
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        return TurnoutError::AlreadyExists(format!(
                            "User with email = {} already exists.",
                            input.email
                        ));
                    }
                    TurnoutError::Other(anyhow!("Failed to create user: {}", e))
                })?;

        Ok(User {
            id,
            name: input.name,
            email: input.email,
        })
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(self.pools.read())
            .await
            .map_err(|e| TurnoutError::Other(anyhow!("Failed to check user: {}", e)))?;
        Ok(exists)
    }

    #[tracing::instrument(skip(self))]
    async fn create_category(&self, input: NewCategory) -> Result<Category> {
        let (id,): (CategoryId,) =
            sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING id")
                .bind(&input.name)
                .fetch_one(self.pools.write())
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        return TurnoutError::AlreadyExists(format!(
                            "Category with name = {} already exists.",
                            input.name
                        ));
                    }
                    TurnoutError::Other(anyhow!("Failed to create category: {}", e))
                })?;

        Ok(Category {
            id,
            name: input.name,
        })
    }

    async fn get_category(&self, category_id: CategoryId) -> Result<Category> {
        let row: Option<(CategoryId, String)> =
            sqlx::query_as("SELECT id, name FROM categories WHERE id = $1")
                .bind(category_id)
                .fetch_optional(self.pools.read())
                .await
                .map_err(|e| TurnoutError::Other(anyhow!("Failed to fetch category: {}", e)))?;

        row.map(|(id, name)| Category { id, name })
            .ok_or(TurnoutError::CategoryNotFound(category_id))
    }

    async fn list_categories(&self, page: Page) -> Result<Vec<Category>> {
        let rows: Vec<(CategoryId, String)> =
            sqlx::query_as("SELECT id, name FROM categories ORDER BY id OFFSET $1 LIMIT $2")
                .bind(page.from)
                .bind(page.size)
                .fetch_all(self.pools.read())
                .await
                .map_err(|e| TurnoutError::Other(anyhow!("Failed to list categories: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }

    #[tracing::instrument(
        skip(self, input),
        fields(initiator = %initiator, category = %input.category)
    )]
    async fn create_event(&self, initiator: UserId, input: NewEvent) -> Result<Event> {
        if !self.user_exists(initiator).await? {
            return Err(TurnoutError::UserNotFound(initiator));
        }
        self.get_category(input.category).await?;

        let row: EventRow = sqlx::query_as(&format!(
            "INSERT INTO events (title, category_id, initiator_id, state, participant_limit, \
             request_moderation, created_on) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(input.category)
        .bind(initiator)
        .bind(EventState::Pending)
        .bind(input.participant_limit)
        .bind(input.request_moderation)
        .bind(Utc::now())
        .fetch_one(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to create event: {}", e)))?;

        Ok(row.into())
    }

    async fn get_event(&self, event_id: EventId) -> Result<Event> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(event_id)
                .fetch_optional(self.pools.read())
                .await
                .map_err(|e| TurnoutError::Other(anyhow!("Failed to fetch event: {}", e)))?;

        row.map(Event::from)
            .ok_or(TurnoutError::EventNotFound(event_id))
    }

    async fn find_event_by_initiator(
        &self,
        event_id: EventId,
        initiator: UserId,
    ) -> Result<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND initiator_id = $2"
        ))
        .bind(event_id)
        .bind(initiator)
        .fetch_optional(self.pools.read())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to fetch event: {}", e)))?;

        Ok(row.map(Event::from))
    }

    async fn list_events_by_initiator(&self, initiator: UserId, page: Page) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE initiator_id = $1 \
             ORDER BY id OFFSET $2 LIMIT $3"
        ))
        .bind(initiator)
        .bind(page.from)
        .bind(page.size)
        .fetch_all(self.pools.read())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to list events: {}", e)))?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    #[tracing::instrument(skip(self, event), fields(event_id = %event.id))]
    async fn update_event(&self, event: &Event) -> Result<Event> {
        self.get_category(event.category).await?;

        let row: Option<EventRow> = sqlx::query_as(&format!(
            "UPDATE events SET title = $2, category_id = $3, participant_limit = $4, \
             request_moderation = $5, state = $6 \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(event.category)
        .bind(event.participant_limit)
        .bind(event.request_moderation)
        .bind(event.state)
        .fetch_optional(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to update event: {}", e)))?;

        row.map(Event::from)
            .ok_or(TurnoutError::EventNotFound(event.id))
    }

    #[tracing::instrument(skip(self))]
    async fn update_event_state(
        &self,
        event_id: EventId,
        state: EventState,
        published_on: Option<DateTime<Utc>>,
    ) -> Result<Event> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "UPDATE events SET state = $2, published_on = COALESCE($3, published_on) \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event_id)
        .bind(state)
        .bind(published_on)
        .fetch_optional(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to update event state: {}", e)))?;

        row.map(Event::from)
            .ok_or(TurnoutError::EventNotFound(event_id))
    }

    async fn request_exists(&self, requester: UserId, event_id: EventId) -> Result<bool> {
        // Read from the primary: this check guards an insert.
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM participation_requests \
             WHERE requester_id = $1 AND event_id = $2)",
        )
        .bind(requester)
        .bind(event_id)
        .fetch_one(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to check request: {}", e)))?;
        Ok(exists)
    }

    async fn count_requests(&self, event_id: EventId, status: RequestStatus) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM participation_requests WHERE event_id = $1 AND status = $2",
        )
        .bind(event_id)
        .bind(status)
        .fetch_one(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to count requests: {}", e)))?;
        Ok(count)
    }

    #[tracing::instrument(
        skip(self, input),
        fields(requester = %input.requester, event = %input.event)
    )]
    async fn create_request(&self, input: NewRequest) -> Result<AnyRequest> {
        let row: RequestRow = sqlx::query_as(&format!(
            "INSERT INTO participation_requests (requester_id, event_id, status, created) \
             VALUES ($1, $2, $3, $4) RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(input.requester)
        .bind(input.event)
        .bind(input.status)
        .bind(input.created)
        .fetch_one(self.pools.write())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return TurnoutError::DuplicateRequest {
                    requester: input.requester,
                    event: input.event,
                };
            }
            TurnoutError::Other(anyhow!("Failed to create request: {}", e))
        })?;

        Ok(row.into())
    }

    async fn find_request_for_requester(
        &self,
        request_id: RequestId,
        requester: UserId,
    ) -> Result<Option<AnyRequest>> {
        let row: Option<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM participation_requests \
             WHERE id = $1 AND requester_id = $2"
        ))
        .bind(request_id)
        .bind(requester)
        .fetch_optional(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to fetch request: {}", e)))?;

        Ok(row.map(AnyRequest::from))
    }

    async fn list_requests_by_requester(&self, requester: UserId) -> Result<Vec<AnyRequest>> {
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM participation_requests \
             WHERE requester_id = $1 ORDER BY id"
        ))
        .bind(requester)
        .fetch_all(self.pools.read())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to list requests: {}", e)))?;

        Ok(rows.into_iter().map(AnyRequest::from).collect())
    }

    async fn list_requests_for_event(&self, event_id: EventId) -> Result<Vec<AnyRequest>> {
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM participation_requests \
             WHERE event_id = $1 ORDER BY id"
        ))
        .bind(event_id)
        .fetch_all(self.pools.read())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to list requests: {}", e)))?;

        Ok(rows.into_iter().map(AnyRequest::from).collect())
    }

    async fn get_event_requests(
        &self,
        event_id: EventId,
        ids: &[RequestId],
    ) -> Result<Vec<AnyRequest>> {
        let raw_ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows: Vec<RequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM participation_requests \
             WHERE event_id = $1 AND id = ANY($2)"
        ))
        .bind(event_id)
        .bind(&raw_ids)
        .fetch_all(self.pools.write())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to fetch requests: {}", e)))?;

        Ok(rows.into_iter().map(AnyRequest::from).collect())
    }

    async fn persist<T: RequestState + Clone>(
        &self,
        request: &ParticipationRequest<T>,
    ) -> Result<()>
    where
        AnyRequest: From<ParticipationRequest<T>>,
    {
        let rows_affected =
            sqlx::query("UPDATE participation_requests SET status = $2 WHERE id = $1")
                .bind(request.data.id)
                .bind(T::STATUS)
                .execute(self.pools.write())
                .await
                .map_err(|e| TurnoutError::Other(anyhow!("Failed to update request: {}", e)))?
                .rows_affected();

        if rows_affected == 0 {
            return Err(TurnoutError::RequestNotFound(request.data.id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, requests), fields(count = requests.len()))]
    async fn persist_all(&self, requests: &[AnyRequest]) -> Result<()> {
        let mut tx =
            self.pools.write().begin().await.map_err(|e| {
                TurnoutError::Other(anyhow!("Failed to begin transaction: {}", e))
            })?;

        for request in requests {
            let rows_affected =
                sqlx::query("UPDATE participation_requests SET status = $2 WHERE id = $1")
                    .bind(request.id())
                    .bind(request.status())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        TurnoutError::Other(anyhow!("Failed to update request: {}", e))
                    })?
                    .rows_affected();

            // Dropping the transaction rolls back earlier updates.
            if rows_affected == 0 {
                return Err(TurnoutError::RequestNotFound(request.id()));
            }
        }

        tx.commit()
            .await
            .map_err(|e| TurnoutError::Other(anyhow!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl<P: PoolProvider> StatsStorage for PostgresStorage<P> {
    async fn record_hit(&self, hit: &Hit) -> Result<()> {
        sqlx::query("INSERT INTO hits (app, uri, ip, timestamp) VALUES ($1, $2, $3, $4)")
            .bind(&hit.app)
            .bind(&hit.uri)
            .bind(&hit.ip)
            .bind(hit.timestamp)
            .execute(self.pools.write())
            .await
            .map_err(|e| TurnoutError::Other(anyhow!("Failed to record hit: {}", e)))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, filter), fields(unique = filter.unique))]
    async fn query_stats(&self, filter: &StatsFilter) -> Result<Vec<ViewStats>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT app, uri, \
                    CASE WHEN $3 THEN COUNT(DISTINCT ip) ELSE COUNT(ip) END AS hits \
             FROM hits \
             WHERE timestamp BETWEEN $1 AND $2 \
               AND ($4::text[] IS NULL OR uri = ANY($4)) \
             GROUP BY app, uri \
             ORDER BY hits DESC",
        )
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.unique)
        .bind(filter.uris.as_deref())
        .fetch_all(self.pools.read())
        .await
        .map_err(|e| TurnoutError::Other(anyhow!("Failed to query stats: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(app, uri, hits)| ViewStats { app, uri, hits })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::parse_timestamp;

    async fn seed(storage: &PostgresStorage<TestDbPools>) -> (User, User, Event) {
        let organizer = storage
            .create_user(NewUser {
                name: "Olga".into(),
                email: "olga@example.com".into(),
            })
            .await
            .expect("Failed to create organizer");
        let requester = storage
            .create_user(NewUser {
                name: "Ravi".into(),
                email: "ravi@example.com".into(),
            })
            .await
            .expect("Failed to create requester");
        let category = storage
            .create_category(NewCategory {
                name: "concerts".into(),
            })
            .await
            .expect("Failed to create category");
        let event = storage
            .create_event(
                organizer.id,
                NewEvent {
                    title: "Night at the Opera".into(),
                    category: category.id,
                    participant_limit: 2,
                    request_moderation: true,
                },
            )
            .await
            .expect("Failed to create event");
        (organizer, requester, event)
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_duplicate_email_is_already_exists(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let input = NewUser {
            name: "Ann".into(),
            email: "ann@example.com".into(),
        };
        storage.create_user(input.clone()).await.unwrap();

        let err = storage.create_user(input).await.unwrap_err();
        assert!(matches!(err, TurnoutError::AlreadyExists(_)));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_event_lifecycle_columns(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let (organizer, _, event) = seed(&storage).await;

        assert_eq!(event.state, EventState::Pending);
        assert!(event.published_on.is_none());

        let now = Utc::now();
        let published = storage
            .update_event_state(event.id, EventState::Published, Some(now))
            .await
            .unwrap();
        assert_eq!(published.state, EventState::Published);
        assert!(published.published_on.is_some());

        let owned = storage
            .find_event_by_initiator(event.id, organizer.id)
            .await
            .unwrap();
        assert_eq!(owned.map(|e| e.id), Some(event.id));

        let foreign = storage
            .find_event_by_initiator(event.id, UserId(organizer.id.0 + 1000))
            .await
            .unwrap();
        assert!(foreign.is_none());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_organizer_event_update_and_listing(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let (organizer, requester, event) = seed(&storage).await;

        let mut changed = event.clone();
        changed.participant_limit = 5;
        changed.request_moderation = false;
        changed.state = EventState::Canceled;
        let updated = storage.update_event(&changed).await.unwrap();
        assert_eq!(updated.participant_limit, 5);
        assert!(!updated.request_moderation);
        assert_eq!(updated.state, EventState::Canceled);
        assert_eq!(updated.created_on, event.created_on);

        changed.category = CategoryId(event.category.0 + 1000);
        let err = storage.update_event(&changed).await.unwrap_err();
        assert!(matches!(err, TurnoutError::CategoryNotFound(_)));

        let page = Page::new(0, 10).unwrap();
        let own = storage
            .list_events_by_initiator(organizer.id, page)
            .await
            .unwrap();
        assert_eq!(own.iter().map(|e| e.id).collect::<Vec<_>>(), vec![event.id]);
        let none = storage
            .list_events_by_initiator(requester.id, page)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_unique_requester_event_pair(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let (_, requester, event) = seed(&storage).await;

        let input = NewRequest {
            requester: requester.id,
            event: event.id,
            status: RequestStatus::Pending,
            created: Utc::now(),
        };
        let created = storage.create_request(input.clone()).await.unwrap();
        assert_eq!(created.status(), RequestStatus::Pending);
        assert!(storage.request_exists(requester.id, event.id).await.unwrap());

        let err = storage.create_request(input).await.unwrap_err();
        assert!(matches!(err, TurnoutError::DuplicateRequest { .. }));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_persist_all_rolls_back_on_missing_row(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let (_, requester, event) = seed(&storage).await;

        let request = storage
            .create_request(NewRequest {
                requester: requester.id,
                event: event.id,
                status: RequestStatus::Pending,
                created: Utc::now(),
            })
            .await
            .unwrap();

        let confirmed = AnyRequest::from(request.clone().into_pending().unwrap().confirm());
        let ghost = AnyRequest::from_parts(
            RequestData {
                id: RequestId(i64::MAX),
                requester: requester.id,
                event: event.id,
                created: Utc::now(),
            },
            RequestStatus::Rejected,
        );

        let err = storage.persist_all(&[confirmed, ghost]).await.unwrap_err();
        assert!(matches!(err, TurnoutError::RequestNotFound(_)));

        let pending = storage
            .count_requests(event.id, RequestStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending, 1, "first update should have been rolled back");
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_event_requests_skips_foreign_ids(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let (_, requester, event) = seed(&storage).await;

        let request = storage
            .create_request(NewRequest {
                requester: requester.id,
                event: event.id,
                status: RequestStatus::Pending,
                created: Utc::now(),
            })
            .await
            .unwrap();

        let found = storage
            .get_event_requests(event.id, &[request.id(), RequestId(i64::MAX)])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), request.id());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_query_stats_groups_and_orders(pool: PgPool) {
        let storage = PostgresStorage::new(TestDbPools::new(pool).await.unwrap());
        let ts = |raw: &str| parse_timestamp("timestamp", raw).unwrap();

        for (uri, ip, at) in [
            ("/events/1", "1.1.1.1", "2024-05-01 10:00:00"),
            ("/events/2", "1.1.1.1", "2024-05-01 10:00:00"),
            ("/events/2", "1.1.1.1", "2024-05-01 11:00:00"),
            ("/events/2", "2.2.2.2", "2024-05-01 12:00:00"),
            ("/events/3", "3.3.3.3", "2023-01-01 00:00:00"),
        ] {
            storage
                .record_hit(&Hit {
                    app: "main-service".into(),
                    uri: uri.into(),
                    ip: ip.into(),
                    timestamp: ts(at),
                })
                .await
                .unwrap();
        }

        let filter = StatsFilter {
            start: ts("2024-01-01 00:00:00"),
            end: ts("2024-12-31 00:00:00"),
            uris: None,
            unique: false,
        };
        let stats = storage.query_stats(&filter).await.unwrap();
        let summary: Vec<_> = stats.iter().map(|s| (s.uri.as_str(), s.hits)).collect();
        assert_eq!(summary, vec![("/events/2", 3), ("/events/1", 1)]);

        let unique = storage
            .query_stats(&StatsFilter {
                uris: Some(vec!["/events/2".into()]),
                unique: true,
                ..filter
            })
            .await
            .unwrap();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].hits, 2);
    }
}
