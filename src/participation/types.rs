//! Inputs and outputs of organizer bulk updates.

use serde::{Deserialize, Serialize};

use crate::domain::{Confirmed, ParticipationRequest, Rejected, RequestId};

/// The status an organizer moves pending requests into.
///
/// Only the two organizer decisions are representable; anything else is rejected when
/// the request body is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Confirmed,
    Rejected,
}

/// Organizer request to confirm or reject a batch of pending requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Requests to update. When capacity runs out, earlier ids win.
    pub request_ids: Vec<RequestId>,
    pub status: Decision,
}

/// Outcome of a bulk update, each list in input order.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdateResult {
    pub confirmed: Vec<ParticipationRequest<Confirmed>>,
    pub rejected: Vec<ParticipationRequest<Rejected>>,
}
