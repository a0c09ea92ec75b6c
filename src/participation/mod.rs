//! Participation request lifecycle engine.
//!
//! [`ParticipationService`] enforces every rule governing participation requests:
//! who may submit, which requests may be cancelled, and how organizer bulk updates
//! are applied against an event's participant limit. Storage is reached only through
//! the [`Storage`] trait.
//!
//! # Capacity
//!
//! An event with `participant_limit > 0` and `request_moderation == true` never has more
//! confirmed requests than its limit, as long as calls for the same event don't overlap.
//! Concurrent submits or bulk updates can each read the same confirmed count before
//! either writes; nothing here serializes them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use metrics::counter;

use crate::domain::{
    AnyRequest, Canceled, EventId, EventState, NewRequest, ParticipationRequest, Pending,
    RequestId, RequestStatus, UserId,
};
use crate::error::{Result, TurnoutError};
use crate::manager::Storage;

pub mod types;

pub use types::{Decision, StatusUpdate, StatusUpdateResult};

/// Enforces the participation request state machine.
pub struct ParticipationService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for ParticipationService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

impl<S: Storage> ParticipationService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Submit a participation request for `requester` to join `event_id`.
    ///
    /// The request is confirmed immediately when the event has no participant limit or
    /// does not require moderation, and left pending otherwise.
    #[tracing::instrument(skip(self), fields(requester = %requester, event_id = %event_id))]
    pub async fn submit(&self, requester: UserId, event_id: EventId) -> Result<AnyRequest> {
        if self.storage.request_exists(requester, event_id).await? {
            return Err(TurnoutError::DuplicateRequest {
                requester,
                event: event_id,
            });
        }

        if !self.storage.user_exists(requester).await? {
            return Err(TurnoutError::UserNotFound(requester));
        }

        let event = self.storage.get_event(event_id).await?;

        if event.state != EventState::Published {
            return Err(TurnoutError::EventNotPublished(event_id));
        }

        if event.initiator == requester {
            return Err(TurnoutError::OwnEvent(event_id));
        }

        if event.participant_limit != 0 {
            let confirmed = self
                .storage
                .count_requests(event_id, RequestStatus::Confirmed)
                .await?;
            if confirmed >= i64::from(event.participant_limit) {
                tracing::info!(
                    confirmed,
                    participant_limit = event.participant_limit,
                    "Rejecting submission, participant limit reached"
                );
                return Err(TurnoutError::ParticipantLimitReached(event_id));
            }
        }

        let status = if event.auto_confirms() {
            RequestStatus::Confirmed
        } else {
            RequestStatus::Pending
        };

        let request = self
            .storage
            .create_request(NewRequest {
                requester,
                event: event_id,
                status,
                created: Utc::now(),
            })
            .await?;

        counter!("turnout_requests_total", "status" => "submitted").increment(1);
        tracing::info!(request_id = %request.id(), %status, "Participation request submitted");

        Ok(request)
    }

    /// Withdraw one of the requester's own requests.
    ///
    /// Confirmed requests cannot be withdrawn this way.
    #[tracing::instrument(skip(self), fields(requester = %requester, request_id = %request_id))]
    pub async fn cancel(
        &self,
        requester: UserId,
        request_id: RequestId,
    ) -> Result<ParticipationRequest<Canceled>> {
        let request = self
            .storage
            .find_request_for_requester(request_id, requester)
            .await?
            .ok_or(TurnoutError::RequestNotFound(request_id))?;

        let storage = self.storage.as_ref();
        let canceled = match request {
            AnyRequest::Confirmed(_) => return Err(TurnoutError::AlreadyConfirmed(request_id)),
            AnyRequest::Pending(r) => r.cancel(storage).await?,
            AnyRequest::Rejected(r) => r.cancel(storage).await?,
            AnyRequest::Canceled(r) => r.cancel(storage).await?,
        };

        tracing::info!("Participation request canceled by requester");
        Ok(canceled)
    }

    /// All requests filed by `requester`, in submission order.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_requester(&self, requester: UserId) -> Result<Vec<AnyRequest>> {
        self.storage.list_requests_by_requester(requester).await
    }

    /// All requests against an event owned by `organizer`, in submission order.
    ///
    /// Fails with `InitiatorEventNotFound` when the event does not exist or belongs to
    /// someone else.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_organizer_event(
        &self,
        organizer: UserId,
        event_id: EventId,
    ) -> Result<Vec<AnyRequest>> {
        self.storage
            .find_event_by_initiator(event_id, organizer)
            .await?
            .ok_or(TurnoutError::InitiatorEventNotFound {
                event_id,
                user_id: organizer,
            })?;

        self.storage.list_requests_for_event(event_id).await
    }

    /// Confirm or reject a batch of pending requests for an event owned by `organizer`.
    ///
    /// Every request in the batch must belong to the event and be pending, otherwise the
    /// whole batch fails and nothing is written. When confirming against a limited,
    /// moderated event, requests are confirmed in the order given until the limit is
    /// reached and the rest are rejected. All changes are persisted in one storage call.
    #[tracing::instrument(
        skip(self, update),
        fields(
            organizer = %organizer,
            event_id = %event_id,
            count = update.request_ids.len(),
            status = ?update.status
        )
    )]
    pub async fn bulk_update_status(
        &self,
        organizer: UserId,
        event_id: EventId,
        update: StatusUpdate,
    ) -> Result<StatusUpdateResult> {
        let event = self
            .storage
            .find_event_by_initiator(event_id, organizer)
            .await?
            .ok_or(TurnoutError::InitiatorEventNotFound {
                event_id,
                user_id: organizer,
            })?;

        if event.initiator != organizer {
            return Err(TurnoutError::NotInitiator {
                user_id: organizer,
                event_id,
            });
        }

        let batch = self.load_pending_batch(event_id, &update.request_ids).await?;

        let mut result = StatusUpdateResult::default();

        match update.status {
            Decision::Rejected => {
                result.rejected = batch.into_iter().map(|r| r.reject()).collect();
            }
            Decision::Confirmed if event.auto_confirms() => {
                result.confirmed = batch.into_iter().map(|r| r.confirm()).collect();
            }
            Decision::Confirmed => {
                let limit = i64::from(event.participant_limit);
                let mut confirmed_count = self
                    .storage
                    .count_requests(event_id, RequestStatus::Confirmed)
                    .await?;

                if confirmed_count >= limit {
                    tracing::info!(
                        confirmed_count,
                        limit,
                        "Bulk confirm refused, participant limit already reached"
                    );
                    return Err(TurnoutError::ParticipantLimitReached(event_id));
                }

                for request in batch {
                    if confirmed_count < limit {
                        result.confirmed.push(request.confirm());
                        confirmed_count += 1;
                    } else {
                        result.rejected.push(request.reject());
                    }
                }
            }
        }

        let mutated: Vec<AnyRequest> = result
            .confirmed
            .iter()
            .cloned()
            .map(AnyRequest::from)
            .chain(result.rejected.iter().cloned().map(AnyRequest::from))
            .collect();
        self.storage.persist_all(&mutated).await?;

        counter!("turnout_requests_total", "status" => "confirmed")
            .increment(result.confirmed.len() as u64);
        counter!("turnout_requests_total", "status" => "rejected")
            .increment(result.rejected.len() as u64);
        tracing::info!(
            confirmed = result.confirmed.len(),
            rejected = result.rejected.len(),
            "Bulk status update applied"
        );

        Ok(result)
    }

    /// Fetch the requests named by `ids`, in the order given, and check they're all pending.
    async fn load_pending_batch(
        &self,
        event_id: EventId,
        ids: &[RequestId],
    ) -> Result<Vec<ParticipationRequest<Pending>>> {
        let fetched = self.storage.get_event_requests(event_id, ids).await?;

        if fetched.len() != ids.len() {
            tracing::debug!(
                requested = ids.len(),
                found = fetched.len(),
                "Bulk update references unknown or foreign request ids"
            );
            return Err(TurnoutError::UnknownRequestIds);
        }

        let mut by_id: HashMap<RequestId, AnyRequest> =
            fetched.into_iter().map(|r| (r.id(), r)).collect();

        // Check every status before transitioning anything.
        let ordered = ids
            .iter()
            .map(|id| by_id.remove(id).ok_or(TurnoutError::UnknownRequestIds))
            .collect::<Result<Vec<_>>>()?;

        if let Some(blocked) = ordered.iter().find(|r| !r.is_pending()) {
            return Err(TurnoutError::RequestNotPending(blocked.id()));
        }

        Ok(ordered.into_iter().filter_map(AnyRequest::into_pending).collect())
    }
}
