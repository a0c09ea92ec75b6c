//! State transitions for participation requests using the typestate pattern.
//!
//! Each request state is a distinct type parameter on `ParticipationRequest<State>`,
//! so a transition is only callable on the states it is valid for:
//!
//! ```text
//! Request<Pending> ──confirm()──> Request<Confirmed>
//!       │
//!       ├──reject()───> Request<Rejected> ──cancel()──> Request<Canceled>
//!       │
//!       └──cancel()───> Request<Canceled> ──cancel()──> Request<Canceled>
//! ```
//!
//! `Request<Confirmed>` has no transitions: once confirmed, a request can no longer be
//! withdrawn by its requester.
//!
//! `confirm()` and `reject()` only build the new value. They are applied by organizer bulk
//! updates, which persist and count the whole batch once the storage call succeeds.
//! `cancel()` acts on a single request and persists it immediately.

use metrics::counter;

use crate::{error::Result, manager::Storage};

use super::state::{Canceled, Confirmed, ParticipationRequest, Pending, Rejected};

impl ParticipationRequest<Pending> {
    /// Accept the request. The caller persists it.
    pub fn confirm(self) -> ParticipationRequest<Confirmed> {
        ParticipationRequest {
            data: self.data,
            state: Confirmed,
        }
    }

    /// Decline the request. The caller persists it.
    pub fn reject(self) -> ParticipationRequest<Rejected> {
        ParticipationRequest {
            data: self.data,
            state: Rejected,
        }
    }

    pub async fn cancel<S: Storage + ?Sized>(
        self,
        storage: &S,
    ) -> Result<ParticipationRequest<Canceled>> {
        cancel_and_persist(self.data, storage).await
    }
}

impl ParticipationRequest<Rejected> {
    pub async fn cancel<S: Storage + ?Sized>(
        self,
        storage: &S,
    ) -> Result<ParticipationRequest<Canceled>> {
        cancel_and_persist(self.data, storage).await
    }
}

impl ParticipationRequest<Canceled> {
    /// Cancelling twice is allowed and leaves the request canceled.
    pub async fn cancel<S: Storage + ?Sized>(
        self,
        storage: &S,
    ) -> Result<ParticipationRequest<Canceled>> {
        cancel_and_persist(self.data, storage).await
    }
}

async fn cancel_and_persist<S: Storage + ?Sized>(
    data: super::state::RequestData,
    storage: &S,
) -> Result<ParticipationRequest<Canceled>> {
    let request = ParticipationRequest {
        data,
        state: Canceled,
    };
    storage.persist(&request).await?;
    counter!("turnout_requests_total", "status" => "canceled").increment(1);
    tracing::debug!(
        request_id = %request.data.id,
        event_id = %request.data.event,
        "Participation request canceled"
    );
    Ok(request)
}
