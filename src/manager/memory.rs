//! In-memory implementation of `Storage` and `StatsStorage`.
//!
//! Backs the test suites and lets the services run without a database. Every
//! operation takes a single lock, so each call is atomic with respect to the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::Storage;
use crate::domain::{
    AnyRequest, Category, CategoryId, Event, EventId, EventState, NewCategory, NewEvent,
    NewRequest, NewUser, Page, ParticipationRequest, RequestData, RequestId, RequestState,
    RequestStatus, User, UserId,
};
use crate::error::{Result, TurnoutError};
use crate::stats::{Hit, StatsFilter, StatsStorage, ViewStats, aggregate};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, Category>,
    events: BTreeMap<EventId, Event>,
    requests: BTreeMap<RequestId, (RequestData, RequestStatus)>,
    hits: Vec<Hit>,
    sequences: Sequences,
    fail_batch_writes: bool,
}

/// One id sequence per table, matching the `BIGSERIAL` columns.
#[derive(Default)]
struct Sequences {
    users: i64,
    categories: i64,
    events: i64,
    requests: i64,
}

fn next_id(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

impl Tables {

    fn rows<'a>(
        &'a self,
        filter: impl Fn(&RequestData) -> bool + 'a,
    ) -> impl Iterator<Item = AnyRequest> + 'a {
        self.requests
            .values()
            .filter(move |(data, _)| filter(data))
            .map(|(data, status)| AnyRequest::from_parts(data.clone(), *status))
    }
}

/// Storage that keeps everything in process memory.
///
/// Cloning is cheap and clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `persist_all` calls fail without writing anything.
    pub fn set_failing_batch_writes(&self, fail: bool) {
        self.tables.lock().fail_batch_writes = fail;
    }

    /// Number of recorded hits.
    pub fn hit_count(&self) -> usize {
        self.tables.lock().hits.len()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user(&self, input: NewUser) -> Result<User> {
        let mut tables = self.tables.lock();
        if tables.users.values().any(|u| u.email == input.email) {
            return Err(TurnoutError::AlreadyExists(format!(
                "User with email = {} already exists.",
                input.email
            )));
        }
        let user = User {
            id: UserId(next_id(&mut tables.sequences.users)),
            name: input.name,
            email: input.email,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_exists(&self, user_id: UserId) -> Result<bool> {
        Ok(self.tables.lock().users.contains_key(&user_id))
    }

    async fn create_category(&self, input: NewCategory) -> Result<Category> {
        let mut tables = self.tables.lock();
        if tables.categories.values().any(|c| c.name == input.name) {
            return Err(TurnoutError::AlreadyExists(format!(
                "Category with name = {} already exists.",
                input.name
            )));
        }
        let category = Category {
            id: CategoryId(next_id(&mut tables.sequences.categories)),
            name: input.name,
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, category_id: CategoryId) -> Result<Category> {
        self.tables
            .lock()
            .categories
            .get(&category_id)
            .cloned()
            .ok_or(TurnoutError::CategoryNotFound(category_id))
    }

    async fn list_categories(&self, page: Page) -> Result<Vec<Category>> {
        Ok(self
            .tables
            .lock()
            .categories
            .values()
            .skip(page.from as usize)
            .take(page.size as usize)
            .cloned()
            .collect())
    }

    async fn create_event(&self, initiator: UserId, input: NewEvent) -> Result<Event> {
        let mut tables = self.tables.lock();
        if !tables.users.contains_key(&initiator) {
            return Err(TurnoutError::UserNotFound(initiator));
        }
        if !tables.categories.contains_key(&input.category) {
            return Err(TurnoutError::CategoryNotFound(input.category));
        }
        let event = Event {
            id: EventId(next_id(&mut tables.sequences.events)),
            title: input.title,
            category: input.category,
            initiator,
            state: EventState::Pending,
            participant_limit: input.participant_limit,
            request_moderation: input.request_moderation,
            created_on: Utc::now(),
            published_on: None,
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, event_id: EventId) -> Result<Event> {
        self.tables
            .lock()
            .events
            .get(&event_id)
            .cloned()
            .ok_or(TurnoutError::EventNotFound(event_id))
    }

    async fn find_event_by_initiator(
        &self,
        event_id: EventId,
        initiator: UserId,
    ) -> Result<Option<Event>> {
        Ok(self
            .tables
            .lock()
            .events
            .get(&event_id)
            .filter(|e| e.initiator == initiator)
            .cloned())
    }

    async fn list_events_by_initiator(&self, initiator: UserId, page: Page) -> Result<Vec<Event>> {
        Ok(self
            .tables
            .lock()
            .events
            .values()
            .filter(|e| e.initiator == initiator)
            .skip(page.from as usize)
            .take(page.size as usize)
            .cloned()
            .collect())
    }

    async fn update_event(&self, event: &Event) -> Result<Event> {
        let mut tables = self.tables.lock();
        if !tables.categories.contains_key(&event.category) {
            return Err(TurnoutError::CategoryNotFound(event.category));
        }
        let stored = tables
            .events
            .get_mut(&event.id)
            .ok_or(TurnoutError::EventNotFound(event.id))?;
        stored.title = event.title.clone();
        stored.category = event.category;
        stored.participant_limit = event.participant_limit;
        stored.request_moderation = event.request_moderation;
        stored.state = event.state;
        Ok(stored.clone())
    }

    async fn update_event_state(
        &self,
        event_id: EventId,
        state: EventState,
        published_on: Option<DateTime<Utc>>,
    ) -> Result<Event> {
        let mut tables = self.tables.lock();
        let event = tables
            .events
            .get_mut(&event_id)
            .ok_or(TurnoutError::EventNotFound(event_id))?;
        event.state = state;
        if published_on.is_some() {
            event.published_on = published_on;
        }
        Ok(event.clone())
    }

    async fn request_exists(&self, requester: UserId, event_id: EventId) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .requests
            .values()
            .any(|(data, _)| data.requester == requester && data.event == event_id))
    }

    async fn count_requests(&self, event_id: EventId, status: RequestStatus) -> Result<i64> {
        Ok(self
            .tables
            .lock()
            .requests
            .values()
            .filter(|(data, s)| data.event == event_id && *s == status)
            .count() as i64)
    }

    async fn create_request(&self, input: NewRequest) -> Result<AnyRequest> {
        let mut tables = self.tables.lock();
        if tables
            .requests
            .values()
            .any(|(data, _)| data.requester == input.requester && data.event == input.event)
        {
            return Err(TurnoutError::DuplicateRequest {
                requester: input.requester,
                event: input.event,
            });
        }
        if !tables.users.contains_key(&input.requester) {
            return Err(TurnoutError::UserNotFound(input.requester));
        }
        if !tables.events.contains_key(&input.event) {
            return Err(TurnoutError::EventNotFound(input.event));
        }
        let data = RequestData {
            id: RequestId(next_id(&mut tables.sequences.requests)),
            requester: input.requester,
            event: input.event,
            created: input.created,
        };
        tables.requests.insert(data.id, (data.clone(), input.status));
        Ok(AnyRequest::from_parts(data, input.status))
    }

    async fn find_request_for_requester(
        &self,
        request_id: RequestId,
        requester: UserId,
    ) -> Result<Option<AnyRequest>> {
        Ok(self
            .tables
            .lock()
            .rows(|data| data.id == request_id && data.requester == requester)
            .next())
    }

    async fn list_requests_by_requester(&self, requester: UserId) -> Result<Vec<AnyRequest>> {
        Ok(self
            .tables
            .lock()
            .rows(|data| data.requester == requester)
            .collect())
    }

    async fn list_requests_for_event(&self, event_id: EventId) -> Result<Vec<AnyRequest>> {
        Ok(self
            .tables
            .lock()
            .rows(|data| data.event == event_id)
            .collect())
    }

    async fn get_event_requests(
        &self,
        event_id: EventId,
        ids: &[RequestId],
    ) -> Result<Vec<AnyRequest>> {
        Ok(self
            .tables
            .lock()
            .rows(|data| data.event == event_id && ids.contains(&data.id))
            .collect())
    }

    async fn persist<T: RequestState + Clone>(
        &self,
        request: &ParticipationRequest<T>,
    ) -> Result<()>
    where
        AnyRequest: From<ParticipationRequest<T>>,
    {
        let mut tables = self.tables.lock();
        let row = tables
            .requests
            .get_mut(&request.data.id)
            .ok_or(TurnoutError::RequestNotFound(request.data.id))?;
        row.1 = T::STATUS;
        Ok(())
    }

    async fn persist_all(&self, requests: &[AnyRequest]) -> Result<()> {
        let mut tables = self.tables.lock();
        if tables.fail_batch_writes {
            return Err(TurnoutError::Other(anyhow::anyhow!(
                "Failed to persist requests: storage unavailable"
            )));
        }
        if let Some(missing) = requests
            .iter()
            .find(|r| !tables.requests.contains_key(&r.id()))
        {
            return Err(TurnoutError::RequestNotFound(missing.id()));
        }
        for request in requests {
            if let Some(row) = tables.requests.get_mut(&request.id()) {
                row.1 = request.status();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StatsStorage for InMemoryStorage {
    async fn record_hit(&self, hit: &Hit) -> Result<()> {
        self.tables.lock().hits.push(hit.clone());
        Ok(())
    }

    async fn query_stats(&self, filter: &StatsFilter) -> Result<Vec<ViewStats>> {
        Ok(aggregate(&self.tables.lock().hits, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let storage = InMemoryStorage::new();
        let input = NewUser {
            name: "Ann".into(),
            email: "ann@example.com".into(),
        };
        storage.create_user(input.clone()).await.unwrap();
        let err = storage.create_user(input).await.unwrap_err();
        assert!(matches!(err, TurnoutError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_list_categories_pages_by_offset() {
        let storage = InMemoryStorage::new();
        for name in ["a", "b", "c", "d"] {
            storage
                .create_category(NewCategory { name: name.into() })
                .await
                .unwrap();
        }
        let page = storage
            .list_categories(Page::new(1, 2).unwrap())
            .await
            .unwrap();
        let names: Vec<_> = page.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_persist_all_is_all_or_nothing() {
        let storage = InMemoryStorage::new();
        let user = storage
            .create_user(NewUser {
                name: "Ann".into(),
                email: "ann@example.com".into(),
            })
            .await
            .unwrap();
        let org = storage
            .create_user(NewUser {
                name: "Bob".into(),
                email: "bob@example.com".into(),
            })
            .await
            .unwrap();
        let category = storage
            .create_category(NewCategory { name: "x".into() })
            .await
            .unwrap();
        let event = storage
            .create_event(
                org.id,
                NewEvent {
                    title: "t".into(),
                    category: category.id,
                    participant_limit: 0,
                    request_moderation: true,
                },
            )
            .await
            .unwrap();
        let request = storage
            .create_request(NewRequest {
                requester: user.id,
                event: event.id,
                status: RequestStatus::Pending,
                created: Utc::now(),
            })
            .await
            .unwrap();

        let confirmed = AnyRequest::from(request.clone().into_pending().unwrap().confirm());
        let ghost = AnyRequest::from_parts(
            RequestData {
                id: RequestId(999),
                requester: user.id,
                event: event.id,
                created: Utc::now(),
            },
            RequestStatus::Rejected,
        );

        let err = storage
            .persist_all(&[confirmed, ghost])
            .await
            .unwrap_err();
        assert!(matches!(err, TurnoutError::RequestNotFound(RequestId(999))));
        assert_eq!(
            storage
                .count_requests(event.id, RequestStatus::Pending)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_each_table_numbers_its_own_rows() {
        let storage = InMemoryStorage::new();
        for email in ["a@example.com", "b@example.com"] {
            storage
                .create_user(NewUser {
                    name: "User".into(),
                    email: email.into(),
                })
                .await
                .unwrap();
        }
        let category = storage
            .create_category(NewCategory {
                name: "Music".into(),
            })
            .await
            .unwrap();
        assert_eq!(category.id, CategoryId(1));

        let event = storage
            .create_event(
                UserId(1),
                NewEvent {
                    title: "Gig".into(),
                    category: category.id,
                    participant_limit: 0,
                    request_moderation: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(event.id, EventId(1));
    }
}
