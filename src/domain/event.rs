//! Events: schedulable activities with a capacity and a moderation policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, UserId};
use crate::error::{Result, TurnoutError};

id_type!(
    /// Unique identifier for an event.
    EventId
);

/// Publication state of an event.
///
/// Stored as uppercase text in the `events.state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "text", rename_all = "UPPERCASE")
)]
pub enum EventState {
    Pending,
    Published,
    Canceled,
}

impl std::fmt::Display for EventState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventState::Pending => "PENDING",
            EventState::Published => "PUBLISHED",
            EventState::Canceled => "CANCELED",
        };
        f.write_str(s)
    }
}

/// Admin decision on a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStateAction {
    PublishEvent,
    RejectEvent,
}

/// Organizer decision on their own unpublished event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewAction {
    SendToReview,
    CancelReview,
}

/// An event users can request participation in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub category: CategoryId,
    /// The user who created (and organizes) the event
    pub initiator: UserId,
    pub state: EventState,
    /// Maximum number of confirmed participants; 0 means unlimited
    pub participant_limit: i32,
    /// When false, participation requests are confirmed on submission
    pub request_moderation: bool,
    pub created_on: DateTime<Utc>,
    pub published_on: Option<DateTime<Utc>>,
}

impl Event {
    /// Whether submitted or approved requests skip the capacity-limited path.
    ///
    /// True when the event has no participant limit or does not require moderation.
    pub fn auto_confirms(&self) -> bool {
        self.participant_limit == 0 || !self.request_moderation
    }

    /// Work out the state an admin action moves this event into.
    pub fn apply_action(&self, action: EventStateAction) -> Result<EventState> {
        match action {
            EventStateAction::PublishEvent if self.state == EventState::Pending => {
                Ok(EventState::Published)
            }
            EventStateAction::PublishEvent => Err(TurnoutError::EventStateConflict {
                event_id: self.id,
                state: self.state,
                action: "publish",
            }),
            EventStateAction::RejectEvent if self.state != EventState::Published => {
                Ok(EventState::Canceled)
            }
            EventStateAction::RejectEvent => Err(TurnoutError::EventStateConflict {
                event_id: self.id,
                state: self.state,
                action: "reject",
            }),
        }
    }

    /// Apply an organizer's changes. Published events can no longer be changed.
    ///
    /// Sending an event to review moves it back to `PENDING`; cancelling the review
    /// moves it to `CANCELED`.
    pub fn apply_update(mut self, update: EventUpdate) -> Result<Event> {
        if self.state == EventState::Published {
            return Err(TurnoutError::PublishedEventNotEditable(self.id));
        }

        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(limit) = update.participant_limit {
            self.participant_limit = limit;
        }
        if let Some(moderation) = update.request_moderation {
            self.request_moderation = moderation;
        }
        match update.state_action {
            Some(ReviewAction::SendToReview) => self.state = EventState::Pending,
            Some(ReviewAction::CancelReview) => self.state = EventState::Canceled,
            None => {}
        }
        Ok(self)
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TurnoutError::ValidationError(
            "Field: title. Error: must not be blank.".to_string(),
        ));
    }
    Ok(())
}

fn validate_participant_limit(limit: i32) -> Result<()> {
    if limit < 0 {
        return Err(TurnoutError::ValidationError(format!(
            "Field: participantLimit. Error: must be positive or zero, got {limit}."
        )));
    }
    Ok(())
}

fn default_moderation() -> bool {
    true
}

/// Input for creating an event. New events start out `PENDING`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    pub category: CategoryId,
    #[serde(default)]
    pub participant_limit: i32,
    #[serde(default = "default_moderation")]
    pub request_moderation: bool,
}

impl NewEvent {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_participant_limit(self.participant_limit)
    }
}

/// Organizer changes to an unpublished event. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: Option<String>,
    pub category: Option<CategoryId>,
    pub participant_limit: Option<i32>,
    pub request_moderation: Option<bool>,
    pub state_action: Option<ReviewAction>,
}

impl EventUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(limit) = self.participant_limit {
            validate_participant_limit(limit)?;
        }
        Ok(())
    }
}
