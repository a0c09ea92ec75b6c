use std::sync::Arc;

use chrono::Utc;

use turnout::catalog::CatalogService;
use turnout::domain::{
    AnyRequest, Category, Event, EventStateAction, NewCategory, NewEvent, NewRequest, NewUser,
    RequestId, RequestStatus, User,
};
use turnout::error::{ErrorKind, TurnoutError};
use turnout::manager::Storage;
use turnout::manager::memory::InMemoryStorage;
use turnout::participation::{Decision, ParticipationService, StatusUpdate};

struct Fixture {
    storage: Arc<InMemoryStorage>,
    service: ParticipationService<InMemoryStorage>,
    catalog: CatalogService<InMemoryStorage>,
    organizer: User,
    category: Category,
}

impl Fixture {
    async fn new() -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let service = ParticipationService::new(storage.clone());
        let catalog = CatalogService::new(storage.clone());

        let organizer = catalog
            .create_user(NewUser {
                name: "Olga".into(),
                email: "olga@example.com".into(),
            })
            .await
            .expect("Failed to create organizer");
        let category = catalog
            .create_category(NewCategory {
                name: "concerts".into(),
            })
            .await
            .expect("Failed to create category");

        Self {
            storage,
            service,
            catalog,
            organizer,
            category,
        }
    }

    async fn user(&self, name: &str) -> User {
        self.catalog
            .create_user(NewUser {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
            })
            .await
            .expect("Failed to create user")
    }

    async fn draft_event(&self, participant_limit: i32, request_moderation: bool) -> Event {
        self.catalog
            .create_event(
                self.organizer.id,
                NewEvent {
                    title: "Night at the Opera".into(),
                    category: self.category.id,
                    participant_limit,
                    request_moderation,
                },
            )
            .await
            .expect("Failed to create event")
    }

    async fn published_event(&self, participant_limit: i32, request_moderation: bool) -> Event {
        let event = self.draft_event(participant_limit, request_moderation).await;
        self.catalog
            .moderate_event(event.id, EventStateAction::PublishEvent)
            .await
            .expect("Failed to publish event")
    }

    /// Submit one pending request per new user.
    async fn pending_requests(&self, event: &Event, names: &[&str]) -> Vec<RequestId> {
        let mut ids = Vec::new();
        for name in names {
            let user = self.user(name).await;
            let request = self
                .service
                .submit(user.id, event.id)
                .await
                .expect("Failed to submit request");
            assert_eq!(request.status(), RequestStatus::Pending);
            ids.push(request.id());
        }
        ids
    }

    async fn status_of(&self, event: &Event, id: RequestId) -> RequestStatus {
        self.storage
            .list_requests_for_event(event.id)
            .await
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .map(AnyRequest::status)
            .expect("request should exist")
    }

    async fn confirmed_count(&self, event: &Event) -> i64 {
        self.storage
            .count_requests(event.id, RequestStatus::Confirmed)
            .await
            .unwrap()
    }

    async fn bulk(
        &self,
        event: &Event,
        ids: &[RequestId],
        status: Decision,
    ) -> turnout::Result<turnout::StatusUpdateResult> {
        self.service
            .bulk_update_status(
                self.organizer.id,
                event.id,
                StatusUpdate {
                    request_ids: ids.to_vec(),
                    status,
                },
            )
            .await
    }
}

fn ids_of<T: turnout::RequestState>(
    requests: &[turnout::ParticipationRequest<T>],
) -> Vec<RequestId> {
    requests.iter().map(|r| r.data.id).collect()
}

#[test_log::test(tokio::test)]
async fn test_bulk_confirm_fills_capacity_in_input_order() {
    let fx = Fixture::new().await;
    let event = fx.published_event(2, true).await;
    let ids = fx.pending_requests(&event, &["Ann", "Ben", "Cid"]).await;

    let result = fx.bulk(&event, &ids, Decision::Confirmed).await.unwrap();

    assert_eq!(ids_of(&result.confirmed), vec![ids[0], ids[1]]);
    assert_eq!(ids_of(&result.rejected), vec![ids[2]]);
    assert_eq!(fx.confirmed_count(&event).await, 2);
    assert_eq!(fx.status_of(&event, ids[2]).await, RequestStatus::Rejected);
}

#[test_log::test(tokio::test)]
async fn test_bulk_confirm_follows_given_order_not_id_order() {
    let fx = Fixture::new().await;
    let event = fx.published_event(2, true).await;
    let ids = fx.pending_requests(&event, &["Ann", "Ben", "Cid"]).await;

    let reordered = vec![ids[2], ids[0], ids[1]];
    let result = fx.bulk(&event, &reordered, Decision::Confirmed).await.unwrap();

    assert_eq!(ids_of(&result.confirmed), vec![ids[2], ids[0]]);
    assert_eq!(ids_of(&result.rejected), vec![ids[1]]);
}

#[test_log::test(tokio::test)]
async fn test_bulk_confirm_uses_remaining_capacity() {
    let fx = Fixture::new().await;
    let event = fx.published_event(3, true).await;
    let ids = fx
        .pending_requests(&event, &["Ann", "Ben", "Cid", "Dee", "Eve"])
        .await;

    // One seat taken, two remaining.
    fx.bulk(&event, &ids[..1], Decision::Confirmed).await.unwrap();

    let result = fx.bulk(&event, &ids[1..], Decision::Confirmed).await.unwrap();
    assert_eq!(ids_of(&result.confirmed), vec![ids[1], ids[2]]);
    assert_eq!(ids_of(&result.rejected), vec![ids[3], ids[4]]);
    assert_eq!(fx.confirmed_count(&event).await, 3);
}

#[test_log::test(tokio::test)]
async fn test_bulk_confirm_on_full_event_mutates_nothing() {
    let fx = Fixture::new().await;
    let event = fx.published_event(1, true).await;
    let ids = fx.pending_requests(&event, &["Ann", "Ben"]).await;

    fx.bulk(&event, &ids[..1], Decision::Confirmed).await.unwrap();

    let err = fx
        .bulk(&event, &ids[1..], Decision::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoutError::ParticipantLimitReached(_)));
    assert_eq!(err.to_string(), "Participant limit reached.");
    assert_eq!(fx.status_of(&event, ids[1]).await, RequestStatus::Pending);
}

#[test_log::test(tokio::test)]
async fn test_bulk_reject_ignores_capacity() {
    let fx = Fixture::new().await;
    let event = fx.published_event(1, true).await;
    let ids = fx.pending_requests(&event, &["Ann", "Ben", "Cid"]).await;

    fx.bulk(&event, &ids[..1], Decision::Confirmed).await.unwrap();

    let result = fx.bulk(&event, &ids[1..], Decision::Rejected).await.unwrap();
    assert!(result.confirmed.is_empty());
    assert_eq!(ids_of(&result.rejected), vec![ids[1], ids[2]]);
}

#[test_log::test(tokio::test)]
async fn test_bulk_with_non_pending_request_fails_atomically() {
    let fx = Fixture::new().await;
    let event = fx.published_event(5, true).await;
    let ids = fx.pending_requests(&event, &["Ann", "Ben"]).await;

    fx.bulk(&event, &ids[..1], Decision::Confirmed).await.unwrap();

    let err = fx
        .bulk(&event, &[ids[1], ids[0]], Decision::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoutError::RequestNotPending(id) if id == ids[0]));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(fx.status_of(&event, ids[1]).await, RequestStatus::Pending);
    assert_eq!(fx.status_of(&event, ids[0]).await, RequestStatus::Confirmed);
}

#[test_log::test(tokio::test)]
async fn test_bulk_write_failure_leaves_batch_pending() {
    let fx = Fixture::new().await;
    let event = fx.published_event(1, true).await;
    let ids = fx.pending_requests(&event, &["Ann", "Ben"]).await;

    fx.storage.set_failing_batch_writes(true);
    let err = fx.bulk(&event, &ids, Decision::Confirmed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    for id in &ids {
        assert_eq!(fx.status_of(&event, *id).await, RequestStatus::Pending);
    }

    fx.storage.set_failing_batch_writes(false);
    let result = fx.bulk(&event, &ids, Decision::Confirmed).await.unwrap();
    assert_eq!(ids_of(&result.confirmed), vec![ids[0]]);
}

#[test_log::test(tokio::test)]
async fn test_bulk_auto_confirm_persists_whole_batch() {
    let fx = Fixture::new().await;
    let event = fx.published_event(0, true).await;

    // Submissions on an unlimited event confirm immediately, so seed pending rows directly.
    let mut ids = Vec::new();
    for name in ["Ann", "Ben", "Cid"] {
        let user = fx.user(name).await;
        let request = fx
            .storage
            .create_request(NewRequest {
                requester: user.id,
                event: event.id,
                status: RequestStatus::Pending,
                created: Utc::now(),
            })
            .await
            .unwrap();
        ids.push(request.id());
    }

    let result = fx.bulk(&event, &ids, Decision::Confirmed).await.unwrap();
    assert_eq!(ids_of(&result.confirmed), ids);
    assert!(result.rejected.is_empty());
    assert_eq!(fx.confirmed_count(&event).await, 3);
}

#[test_log::test(tokio::test)]
async fn test_bulk_rejects_unknown_foreign_and_duplicate_ids() {
    let fx = Fixture::new().await;
    let event = fx.published_event(5, true).await;
    let other = fx.published_event(5, true).await;
    let ids = fx.pending_requests(&event, &["Ann"]).await;
    let foreign = fx.pending_requests(&other, &["Ben"]).await;

    for batch in [
        vec![ids[0], foreign[0]],
        vec![ids[0], RequestId(9999)],
        vec![ids[0], ids[0]],
    ] {
        let err = fx.bulk(&event, &batch, Decision::Confirmed).await.unwrap_err();
        assert!(matches!(err, TurnoutError::UnknownRequestIds));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    assert_eq!(fx.status_of(&event, ids[0]).await, RequestStatus::Pending);
    assert_eq!(fx.status_of(&other, foreign[0]).await, RequestStatus::Pending);
}

#[test_log::test(tokio::test)]
async fn test_organizer_operations_require_ownership() {
    let fx = Fixture::new().await;
    let event = fx.published_event(5, true).await;
    let ids = fx.pending_requests(&event, &["Ann"]).await;
    let stranger = fx.user("Mallory").await;

    let err = fx
        .service
        .list_for_organizer_event(stranger.id, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoutError::InitiatorEventNotFound { .. }));

    let err = fx
        .service
        .bulk_update_status(
            stranger.id,
            event.id,
            StatusUpdate {
                request_ids: ids.clone(),
                status: Decision::Confirmed,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let listed = fx
        .service
        .list_for_organizer_event(fx.organizer.id, event.id)
        .await
        .unwrap();
    assert_eq!(listed.iter().map(AnyRequest::id).collect::<Vec<_>>(), ids);
}

#[test_log::test(tokio::test)]
async fn test_submit_auto_confirms_without_limit_or_moderation() {
    let fx = Fixture::new().await;
    let unlimited = fx.published_event(0, true).await;
    let unmoderated = fx.published_event(1, false).await;
    let ann = fx.user("Ann").await;
    let ben = fx.user("Ben").await;

    let request = fx.service.submit(ann.id, unlimited.id).await.unwrap();
    assert_eq!(request.status(), RequestStatus::Confirmed);

    let request = fx.service.submit(ann.id, unmoderated.id).await.unwrap();
    assert_eq!(request.status(), RequestStatus::Confirmed);

    // The single seat is gone.
    let err = fx.service.submit(ben.id, unmoderated.id).await.unwrap_err();
    assert!(matches!(err, TurnoutError::ParticipantLimitReached(_)));
}

#[test_log::test(tokio::test)]
async fn test_submit_rule_order() {
    let fx = Fixture::new().await;
    let draft = fx.draft_event(5, true).await;
    let event = fx.published_event(5, true).await;
    let ann = fx.user("Ann").await;

    let err = fx.service.submit(ann.id, draft.id).await.unwrap_err();
    assert!(matches!(err, TurnoutError::EventNotPublished(_)));

    let err = fx.service.submit(fx.organizer.id, event.id).await.unwrap_err();
    assert!(matches!(err, TurnoutError::OwnEvent(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("organizers are not allowed"));

    let err = fx
        .service
        .submit(turnout::UserId(9999), event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoutError::UserNotFound(_)));

    let err = fx
        .service
        .submit(ann.id, turnout::EventId(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoutError::EventNotFound(_)));

    fx.service.submit(ann.id, event.id).await.unwrap();
    let err = fx.service.submit(ann.id, event.id).await.unwrap_err();
    assert!(matches!(err, TurnoutError::DuplicateRequest { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test_log::test(tokio::test)]
async fn test_cancel_confirmed_request_fails_and_keeps_status() {
    let fx = Fixture::new().await;
    let event = fx.published_event(0, true).await;
    let ann = fx.user("Ann").await;
    let request = fx.service.submit(ann.id, event.id).await.unwrap();

    let err = fx.service.cancel(ann.id, request.id()).await.unwrap_err();
    assert!(matches!(err, TurnoutError::AlreadyConfirmed(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        fx.status_of(&event, request.id()).await,
        RequestStatus::Confirmed
    );
}

#[test_log::test(tokio::test)]
async fn test_cancel_pending_and_rejected_requests() {
    let fx = Fixture::new().await;
    let event = fx.published_event(5, true).await;
    let ann = fx.user("Ann").await;
    let ben = fx.user("Ben").await;
    let pending = fx.service.submit(ann.id, event.id).await.unwrap();
    let rejected = fx.service.submit(ben.id, event.id).await.unwrap();
    fx.bulk(&event, &[rejected.id()], Decision::Rejected)
        .await
        .unwrap();

    let canceled = fx.service.cancel(ann.id, pending.id()).await.unwrap();
    assert_eq!(canceled.status(), RequestStatus::Canceled);
    assert_eq!(
        fx.status_of(&event, pending.id()).await,
        RequestStatus::Canceled
    );

    fx.service.cancel(ben.id, rejected.id()).await.unwrap();
    assert_eq!(
        fx.status_of(&event, rejected.id()).await,
        RequestStatus::Canceled
    );

    // Someone else's request looks like a missing one.
    let err = fx.service.cancel(ann.id, rejected.id()).await.unwrap_err();
    assert!(matches!(err, TurnoutError::RequestNotFound(_)));
}

#[test_log::test(tokio::test)]
async fn test_list_by_requester_across_events() {
    let fx = Fixture::new().await;
    let first = fx.published_event(0, true).await;
    let second = fx.published_event(5, true).await;
    let ann = fx.user("Ann").await;

    let a = fx.service.submit(ann.id, first.id).await.unwrap();
    let b = fx.service.submit(ann.id, second.id).await.unwrap();

    let own = fx.service.list_by_requester(ann.id).await.unwrap();
    let summary: Vec<_> = own.iter().map(|r| (r.id(), r.status())).collect();
    assert_eq!(
        summary,
        vec![
            (a.id(), RequestStatus::Confirmed),
            (b.id(), RequestStatus::Pending)
        ]
    );

    assert!(fx.service.list_by_requester(fx.organizer.id).await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_confirmed_never_exceeds_limit() {
    let fx = Fixture::new().await;
    let event = fx.published_event(3, true).await;
    let names = ["Ann", "Ben", "Cid", "Dee", "Eve", "Fay", "Gus"];
    let ids = fx.pending_requests(&event, &names).await;

    for chunk in ids.chunks(2) {
        let _ = fx.bulk(&event, chunk, Decision::Confirmed).await;
        assert!(fx.confirmed_count(&event).await <= 3);
    }

    let late = fx.user("Hal").await;
    let err = fx.service.submit(late.id, event.id).await.unwrap_err();
    assert!(matches!(err, TurnoutError::ParticipantLimitReached(_)));
    assert_eq!(fx.confirmed_count(&event).await, 3);
}
