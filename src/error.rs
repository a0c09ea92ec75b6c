//! Error types for the participation platform.

use thiserror::Error;

use crate::domain::{CategoryId, EventId, EventState, RequestId, UserId};

/// Result type alias using the turnout error type.
pub type Result<T> = std::result::Result<T, TurnoutError>;

/// Coarse classification of an error, used by the HTTP boundary to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// A business rule or state transition was violated.
    Conflict,
    /// The input was malformed.
    Validation,
    /// Infrastructure failure (database, HTTP client, serialization).
    Internal,
}

/// Main error type for the participation platform.
#[derive(Error, Debug)]
pub enum TurnoutError {
    /// User not found
    #[error("User with id = {0} was not found.")]
    UserNotFound(UserId),

    /// Event not found
    #[error("Event with id = {0} doesn't exist.")]
    EventNotFound(EventId),

    /// Event not found among the events initiated by the given user
    #[error("Event with id = {event_id} and user id = {user_id} doesn't exist.")]
    InitiatorEventNotFound { event_id: EventId, user_id: UserId },

    /// Category not found
    #[error("Category with id = {0} was not found.")]
    CategoryNotFound(CategoryId),

    /// Participation request not found (or not owned by the caller)
    #[error("Participation request with id = {0} doesn't exist.")]
    RequestNotFound(RequestId),

    /// A bulk update referenced ids that are unknown or belong to another event
    #[error("Incorrect request id(s) received in the request body.")]
    UnknownRequestIds,

    /// The requester already has a request for the event
    #[error("Participation request with userId = {requester} eventId = {event} already exists.")]
    DuplicateRequest { requester: UserId, event: EventId },

    /// Requests can only target published events
    #[error("Users are not allowed to register for unpublished events.")]
    EventNotPublished(EventId),

    /// Organizers cannot request participation in their own events
    #[error("Event organizers are not allowed to request participation in their own events.")]
    OwnEvent(EventId),

    /// The event's participant limit has been reached
    #[error("Participant limit reached.")]
    ParticipantLimitReached(EventId),

    /// A confirmed request cannot be cancelled by the requester
    #[error("Participation request with id = {0} is already confirmed.")]
    AlreadyConfirmed(RequestId),

    /// The caller is not the initiator of the event
    #[error("Access denied. User with id = {user_id} is not an event initiator.")]
    NotInitiator { user_id: UserId, event_id: EventId },

    /// Only pending requests may be confirmed or rejected
    #[error("Only requests with status 'Pending' can be accepted or rejected.")]
    RequestNotPending(RequestId),

    /// Event is in a state that does not allow the requested admin action
    #[error("Cannot {action} event {event_id}: event is in state {state}.")]
    EventStateConflict {
        event_id: EventId,
        state: EventState,
        action: &'static str,
    },

    /// Organizers can only change events that aren't published yet
    #[error("Only pending or canceled events can be changed, event {0} is published.")]
    PublishedEventNotEditable(EventId),

    /// A unique value (email, category name) is already taken
    #[error("{0}")]
    AlreadyExists(String),

    /// Validation error (malformed input, missing fields)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TurnoutError {
    /// Classify this error for the HTTP boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TurnoutError::UserNotFound(_)
            | TurnoutError::EventNotFound(_)
            | TurnoutError::InitiatorEventNotFound { .. }
            | TurnoutError::CategoryNotFound(_)
            | TurnoutError::RequestNotFound(_)
            | TurnoutError::UnknownRequestIds => ErrorKind::NotFound,
            TurnoutError::DuplicateRequest { .. }
            | TurnoutError::EventNotPublished(_)
            | TurnoutError::OwnEvent(_)
            | TurnoutError::ParticipantLimitReached(_)
            | TurnoutError::AlreadyConfirmed(_)
            | TurnoutError::NotInitiator { .. }
            | TurnoutError::RequestNotPending(_)
            | TurnoutError::EventStateConflict { .. }
            | TurnoutError::PublishedEventNotEditable(_)
            | TurnoutError::AlreadyExists(_) => ErrorKind::Conflict,
            TurnoutError::ValidationError(_) => ErrorKind::Validation,
            TurnoutError::HttpClient(_)
            | TurnoutError::Serialization(_)
            | TurnoutError::Other(_) => ErrorKind::Internal,
        }
    }
}
