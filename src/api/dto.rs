//! JSON shapes returned by the main service.

use serde::{Deserialize, Serialize};

use crate::domain::category::DEFAULT_PAGE_SIZE;
use crate::domain::{
    AnyRequest, CategoryId, DATE_TIME_FORMAT, Event, EventId, EventState, EventStateAction, Page,
    ParticipationRequest, RequestId, RequestState, RequestStatus, UserId, datetime_format,
};
use crate::error::Result;
use crate::participation::StatusUpdateResult;

/// A participation request as seen by API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationRequestDto {
    pub id: RequestId,
    pub requester: UserId,
    pub event: EventId,
    pub status: RequestStatus,
    #[serde(with = "datetime_format")]
    pub created: chrono::DateTime<chrono::Utc>,
}

impl From<&AnyRequest> for ParticipationRequestDto {
    fn from(request: &AnyRequest) -> Self {
        let data = request.data();
        Self {
            id: data.id,
            requester: data.requester,
            event: data.event,
            status: request.status(),
            created: data.created,
        }
    }
}

impl From<AnyRequest> for ParticipationRequestDto {
    fn from(request: AnyRequest) -> Self {
        Self::from(&request)
    }
}

impl<T: RequestState> From<&ParticipationRequest<T>> for ParticipationRequestDto {
    fn from(request: &ParticipationRequest<T>) -> Self {
        Self {
            id: request.data.id,
            requester: request.data.requester,
            event: request.data.event,
            status: T::STATUS,
            created: request.data.created,
        }
    }
}

/// Response body of an organizer bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResultDto {
    pub confirmed_requests: Vec<ParticipationRequestDto>,
    pub rejected_requests: Vec<ParticipationRequestDto>,
}

impl From<StatusUpdateResult> for StatusUpdateResultDto {
    fn from(result: StatusUpdateResult) -> Self {
        Self {
            confirmed_requests: result.confirmed.iter().map(Into::into).collect(),
            rejected_requests: result.rejected.iter().map(Into::into).collect(),
        }
    }
}

/// An event as seen by API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: EventId,
    pub title: String,
    pub category: CategoryId,
    pub initiator: UserId,
    pub state: EventState,
    pub participant_limit: i32,
    pub request_moderation: bool,
    pub created_on: String,
    pub published_on: Option<String>,
    pub confirmed_requests: i64,
    /// Distinct client addresses that viewed the public event page
    pub views: i64,
}

impl EventDto {
    pub fn new(event: Event, confirmed_requests: i64, views: i64) -> Self {
        Self {
            id: event.id,
            title: event.title,
            category: event.category,
            initiator: event.initiator,
            state: event.state,
            participant_limit: event.participant_limit,
            request_moderation: event.request_moderation,
            created_on: event.created_on.format(DATE_TIME_FORMAT).to_string(),
            published_on: event
                .published_on
                .map(|at| at.format(DATE_TIME_FORMAT).to_string()),
            confirmed_requests,
            views,
        }
    }
}

/// Body of `PATCH /admin/events/{eventId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEventUpdate {
    pub state_action: EventStateAction,
}

/// Query of `POST /users/{userId}/requests`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitParams {
    pub event_id: EventId,
}

/// Offset paging query of the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub from: Option<i64>,
    pub size: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> Result<Page> {
        Page::new(self.from.unwrap_or(0), self.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}
