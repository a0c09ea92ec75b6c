//! Participation request types.
//!
//! This module defines the type-safe request lifecycle using the typestate pattern.
//! Each request is in exactly one of four states, and the state is part of its type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, UserId};

id_type!(
    /// Unique identifier for a participation request.
    RequestId
);

/// Database status for filtering and counting requests.
///
/// This enum represents the string values stored in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "text", rename_all = "UPPERCASE")
)]
pub enum RequestStatus {
    Pending,
    Confirmed,
    Rejected,
    Canceled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Confirmed => "CONFIRMED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker trait for valid request states.
///
/// This trait enables the typestate pattern, ensuring that transitions
/// are only available on requests in valid source states.
pub trait RequestState: Send + Sync {
    const STATUS: RequestStatus;
}

/// A user's application to join an event.
///
/// The generic parameter `T` represents the current state of the request.
///
/// # Example
/// ```ignore
/// let pending: ParticipationRequest<Pending> = storage.create_request(..)?.into_pending()?;
/// let confirmed = pending.confirm();
/// // confirmed.cancel(..) does not compile: confirmed requests are final for the requester
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ParticipationRequest<T: RequestState> {
    /// The current state of the request.
    pub state: T,
    /// Immutable request data.
    pub data: RequestData,
}

/// Data fixed at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestData {
    pub id: RequestId,
    /// The user applying to join
    pub requester: UserId,
    /// The event being applied to
    pub event: EventId,
    /// When the request was submitted
    pub created: DateTime<Utc>,
}

/// Input for inserting a request. The status is decided by the lifecycle engine.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub requester: UserId,
    pub event: EventId,
    pub status: RequestStatus,
    pub created: DateTime<Utc>,
}

// ============================================================================
// Request States
// ============================================================================

/// Waiting for the organizer's decision.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Pending;

impl RequestState for Pending {
    const STATUS: RequestStatus = RequestStatus::Pending;
}

/// Accepted; counts against the participant limit.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Confirmed;

impl RequestState for Confirmed {
    const STATUS: RequestStatus = RequestStatus::Confirmed;
}

/// Declined by the organizer or by the capacity limit.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Rejected;

impl RequestState for Rejected {
    const STATUS: RequestStatus = RequestStatus::Rejected;
}

/// Withdrawn by the requester.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Canceled;

impl RequestState for Canceled {
    const STATUS: RequestStatus = RequestStatus::Canceled;
}

impl<T: RequestState> ParticipationRequest<T> {
    pub fn status(&self) -> RequestStatus {
        T::STATUS
    }
}

// ============================================================================
// Unified Request Representation
// ============================================================================

/// Enum that can hold a request in any state.
///
/// This is used for storage and API responses where we need to handle
/// requests uniformly regardless of their current state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "request")]
pub enum AnyRequest {
    Pending(ParticipationRequest<Pending>),
    Confirmed(ParticipationRequest<Confirmed>),
    Rejected(ParticipationRequest<Rejected>),
    Canceled(ParticipationRequest<Canceled>),
}

impl AnyRequest {
    /// Rebuild a typed request from stored data and a status column.
    pub fn from_parts(data: RequestData, status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => AnyRequest::Pending(ParticipationRequest {
                state: Pending,
                data,
            }),
            RequestStatus::Confirmed => AnyRequest::Confirmed(ParticipationRequest {
                state: Confirmed,
                data,
            }),
            RequestStatus::Rejected => AnyRequest::Rejected(ParticipationRequest {
                state: Rejected,
                data,
            }),
            RequestStatus::Canceled => AnyRequest::Canceled(ParticipationRequest {
                state: Canceled,
                data,
            }),
        }
    }

    /// Get the request ID regardless of state.
    pub fn id(&self) -> RequestId {
        self.data().id
    }

    /// Get the request data regardless of state.
    pub fn data(&self) -> &RequestData {
        match self {
            AnyRequest::Pending(r) => &r.data,
            AnyRequest::Confirmed(r) => &r.data,
            AnyRequest::Rejected(r) => &r.data,
            AnyRequest::Canceled(r) => &r.data,
        }
    }

    /// Get the status of the current state.
    pub fn status(&self) -> RequestStatus {
        match self {
            AnyRequest::Pending(_) => RequestStatus::Pending,
            AnyRequest::Confirmed(_) => RequestStatus::Confirmed,
            AnyRequest::Rejected(_) => RequestStatus::Rejected,
            AnyRequest::Canceled(_) => RequestStatus::Canceled,
        }
    }

    /// Check if this request is in the Pending state.
    pub fn is_pending(&self) -> bool {
        matches!(self, AnyRequest::Pending(_))
    }

    /// Try to take as a Pending request, consuming self.
    pub fn into_pending(self) -> Option<ParticipationRequest<Pending>> {
        match self {
            AnyRequest::Pending(r) => Some(r),
            _ => None,
        }
    }
}

// Conversion traits for going from typed requests to AnyRequest

impl From<ParticipationRequest<Pending>> for AnyRequest {
    fn from(r: ParticipationRequest<Pending>) -> Self {
        AnyRequest::Pending(r)
    }
}

impl From<ParticipationRequest<Confirmed>> for AnyRequest {
    fn from(r: ParticipationRequest<Confirmed>) -> Self {
        AnyRequest::Confirmed(r)
    }
}

impl From<ParticipationRequest<Rejected>> for AnyRequest {
    fn from(r: ParticipationRequest<Rejected>) -> Self {
        AnyRequest::Rejected(r)
    }
}

impl From<ParticipationRequest<Canceled>> for AnyRequest {
    fn from(r: ParticipationRequest<Canceled>) -> Self {
        AnyRequest::Canceled(r)
    }
}
