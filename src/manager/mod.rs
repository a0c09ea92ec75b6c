//! Persistence gateway for the participation platform.
//!
//! This module defines the `Storage` trait, which provides the interface for persisting
//! users, categories, events and participation requests. The lifecycle engine only ever
//! talks to storage through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AnyRequest, Category, CategoryId, Event, EventId, EventState, NewCategory, NewEvent,
    NewRequest, NewUser, Page, ParticipationRequest, RequestId, RequestState, RequestStatus, User,
    UserId,
};
use crate::error::Result;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// Storage trait for persisting and querying platform records.
///
/// Implementations don't validate state transitions; the typestate request
/// types and the lifecycle engine do that before anything reaches storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Register a user. Fails with `AlreadyExists` if the email is taken.
    async fn create_user(&self, input: NewUser) -> Result<User>;

    /// Check whether a user exists.
    async fn user_exists(&self, user_id: UserId) -> Result<bool>;

    /// Create a category. Fails with `AlreadyExists` if the name is taken.
    async fn create_category(&self, input: NewCategory) -> Result<Category>;

    /// Get a category by ID.
    async fn get_category(&self, category_id: CategoryId) -> Result<Category>;

    /// List categories ordered by ID.
    async fn list_categories(&self, page: Page) -> Result<Vec<Category>>;

    /// Create an event in the `PENDING` state.
    ///
    /// Fails with `UserNotFound` / `CategoryNotFound` if the references don't resolve.
    async fn create_event(&self, initiator: UserId, input: NewEvent) -> Result<Event>;

    /// Get an event by ID.
    async fn get_event(&self, event_id: EventId) -> Result<Event>;

    /// Get an event only if it was initiated by the given user.
    async fn find_event_by_initiator(
        &self,
        event_id: EventId,
        initiator: UserId,
    ) -> Result<Option<Event>>;

    /// Events initiated by a user, ordered by ID.
    async fn list_events_by_initiator(&self, initiator: UserId, page: Page) -> Result<Vec<Event>>;

    /// Overwrite an event's title, category, participant limit, moderation flag and state.
    ///
    /// Fails with `CategoryNotFound` if the category doesn't resolve.
    async fn update_event(&self, event: &Event) -> Result<Event>;

    /// Move an event to a new publication state.
    async fn update_event_state(
        &self,
        event_id: EventId,
        state: EventState,
        published_on: Option<DateTime<Utc>>,
    ) -> Result<Event>;

    /// Check whether the requester already has a request for the event, in any status.
    async fn request_exists(&self, requester: UserId, event_id: EventId) -> Result<bool>;

    /// Count an event's requests in the given status.
    async fn count_requests(&self, event_id: EventId, status: RequestStatus) -> Result<i64>;

    /// Insert a new request.
    ///
    /// Fails with `DuplicateRequest` if the (requester, event) pair already exists.
    async fn create_request(&self, input: NewRequest) -> Result<AnyRequest>;

    /// Get a request only if it was filed by the given requester.
    async fn find_request_for_requester(
        &self,
        request_id: RequestId,
        requester: UserId,
    ) -> Result<Option<AnyRequest>>;

    /// All requests filed by a user, in insertion order.
    async fn list_requests_by_requester(&self, requester: UserId) -> Result<Vec<AnyRequest>>;

    /// All requests against an event, in insertion order.
    async fn list_requests_for_event(&self, event_id: EventId) -> Result<Vec<AnyRequest>>;

    /// Fetch the requests among `ids` that belong to `event_id`.
    ///
    /// Unknown ids and ids belonging to other events are silently skipped; the
    /// result order is unspecified.
    async fn get_event_requests(
        &self,
        event_id: EventId,
        ids: &[RequestId],
    ) -> Result<Vec<AnyRequest>>;

    /// Persist the state of a single request.
    async fn persist<T: RequestState + Clone>(
        &self,
        request: &ParticipationRequest<T>,
    ) -> Result<()>
    where
        AnyRequest: From<ParticipationRequest<T>>;

    /// Persist the states of several requests atomically: all are written or none are.
    async fn persist_all(&self, requests: &[AnyRequest]) -> Result<()>;
}
