//! Users, categories and events.
//!
//! The records participation requests refer to. Admin moderation of events lives here
//! too: an event only accepts requests once it is published.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    Category, CategoryId, Event, EventId, EventState, EventStateAction, EventUpdate, NewCategory,
    NewEvent, NewUser, Page, RequestStatus, User, UserId,
};
use crate::error::{Result, TurnoutError};
use crate::manager::Storage;

/// Operations on the records participation requests refer to.
pub struct CatalogService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: Storage> CatalogService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: NewUser) -> Result<User> {
        input.validate()?;
        let user = self.storage.create_user(input).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, input: NewCategory) -> Result<Category> {
        input.validate()?;
        let category = self.storage.create_category(input).await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn get_category(&self, category_id: CategoryId) -> Result<Category> {
        self.storage.get_category(category_id).await
    }

    pub async fn list_categories(&self, page: Page) -> Result<Vec<Category>> {
        self.storage.list_categories(page).await
    }

    /// Create an event owned by `initiator`, awaiting admin review.
    #[tracing::instrument(skip(self, input), fields(initiator = %initiator))]
    pub async fn create_event(&self, initiator: UserId, input: NewEvent) -> Result<Event> {
        input.validate()?;
        let event = self.storage.create_event(initiator, input).await?;
        tracing::info!(event_id = %event.id, "Event created");
        Ok(event)
    }

    /// Events created by `initiator`, ordered by ID.
    pub async fn list_user_events(&self, initiator: UserId, page: Page) -> Result<Vec<Event>> {
        if !self.storage.user_exists(initiator).await? {
            return Err(TurnoutError::UserNotFound(initiator));
        }
        self.storage.list_events_by_initiator(initiator, page).await
    }

    /// One of `initiator`'s own events, in any state.
    pub async fn get_user_event(&self, initiator: UserId, event_id: EventId) -> Result<Event> {
        self.storage
            .find_event_by_initiator(event_id, initiator)
            .await?
            .ok_or(TurnoutError::InitiatorEventNotFound {
                event_id,
                user_id: initiator,
            })
    }

    /// Change one of `initiator`'s own events before it is published.
    ///
    /// A new participant limit or moderation flag applies to every later submission and
    /// bulk update against the event.
    #[tracing::instrument(skip(self, update), fields(initiator = %initiator, event_id = %event_id))]
    pub async fn update_user_event(
        &self,
        initiator: UserId,
        event_id: EventId,
        update: EventUpdate,
    ) -> Result<Event> {
        update.validate()?;
        let event = self.get_user_event(initiator, event_id).await?;
        let previous = event.state;
        let updated = self.storage.update_event(&event.apply_update(update)?).await?;

        tracing::info!(from = %previous, to = %updated.state, "Event updated by organizer");
        Ok(updated)
    }

    /// Number of confirmed participants of an event.
    pub async fn confirmed_requests(&self, event_id: EventId) -> Result<i64> {
        self.storage
            .count_requests(event_id, RequestStatus::Confirmed)
            .await
    }

    /// Publish or reject an event.
    ///
    /// Publishing is only allowed from `PENDING` and stamps the publication time.
    /// Rejecting is allowed from any state but `PUBLISHED` and cancels the event.
    #[tracing::instrument(skip(self))]
    pub async fn moderate_event(
        &self,
        event_id: EventId,
        action: EventStateAction,
    ) -> Result<Event> {
        let event = self.storage.get_event(event_id).await?;
        let state = event.apply_action(action)?;

        let published_on = (state == EventState::Published).then(Utc::now);
        let updated = self
            .storage
            .update_event_state(event_id, state, published_on)
            .await?;

        tracing::info!(from = %event.state, to = %updated.state, "Event moderated");
        Ok(updated)
    }

    /// Get an event visible to the public. Unpublished events are reported as missing.
    pub async fn get_published_event(&self, event_id: EventId) -> Result<Event> {
        let event = self.storage.get_event(event_id).await?;
        if event.state != EventState::Published {
            return Err(TurnoutError::EventNotFound(event_id));
        }
        Ok(event)
    }
}
