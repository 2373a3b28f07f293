use std::collections::HashSet;

use eventdraw::utils::events::models::{EventDraft, GeoPoint};
use eventdraw::utils::users::models::Role;
use eventdraw::store::errors::StoreError;
use eventdraw::utils::waitlist::errors::WaitlistError;
use time::{Duration, OffsetDateTime};
use tracing_test::traced_test;
use uuid::Uuid;

use crate::tools::{draft, uid, ContestedStore, Core, RETRIES};

mod tools;

#[traced_test]
#[tokio::test]
async fn second_join_is_rejected() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.open_event(&organizer, draft("Yoga")).await;

    core.services.waitlist.join(event.id, "u1", None).await.unwrap();
    let again = core.services.waitlist.join(event.id, "u1", None).await;

    assert!(matches!(again, Err(WaitlistError::AlreadyOnList)));
    assert_eq!(core.services.waitlist.size(event.id).await.unwrap(), 1);
}

#[traced_test]
#[tokio::test]
async fn leave_restores_the_list() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.open_event(&organizer, draft("Chess")).await;
    core.services.waitlist.join(event.id, "a", None).await.unwrap();
    let before = core.services.events.get(event.id).await.unwrap().waiting_list;

    core.services.waitlist.join(event.id, "b", None).await.unwrap();
    let after = core.services.waitlist.leave(event.id, "b").await.unwrap();
    assert_eq!(after.waiting_list, before);

    let again = core.services.waitlist.leave(event.id, "b").await;
    assert!(matches!(again, Err(WaitlistError::NotOnList)));
}

#[traced_test]
#[tokio::test]
async fn concurrent_joins_respect_capacity() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core
        .open_event(
            &organizer,
            EventDraft {
                max_waiting_list: Some(5),
                ..draft("Popular")
            },
        )
        .await;

    let joins = (0..20).map(|n| {
        let waitlist = core.services.waitlist.clone();
        // every user twice, so duplicates race too
        let user_id = format!("user-{}", n % 10);
        tokio::spawn(async move { waitlist.join(event.id, &user_id, None).await })
    });
    let results = futures::future::join_all(joins).await;

    let admitted = results
        .into_iter()
        .filter(|result| matches!(result, Ok(Ok(_))))
        .count();
    let stored = core.services.events.get(event.id).await.unwrap().waiting_list;
    let distinct: HashSet<&String> = stored.iter().collect();

    assert_eq!(admitted, 5);
    assert_eq!(stored.len(), 5);
    assert_eq!(distinct.len(), stored.len());
}

#[traced_test]
#[tokio::test]
async fn full_list_turns_entrants_away() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core
        .open_event(
            &organizer,
            EventDraft {
                max_waiting_list: Some(1),
                ..draft("Tiny")
            },
        )
        .await;

    core.services.waitlist.join(event.id, "first", None).await.unwrap();
    let late = core.services.waitlist.join(event.id, "second", None).await;
    assert!(matches!(late, Err(WaitlistError::ListFull)));
}

#[traced_test]
#[tokio::test]
async fn geolocated_events_need_a_location() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core
        .open_event(
            &organizer,
            EventDraft {
                geolocation_required: true,
                ..draft("Hike")
            },
        )
        .await;

    let missing = core.services.waitlist.join(event.id, "walker", None).await;
    assert!(matches!(missing, Err(WaitlistError::InvalidArgument(_))));

    let nonsense = GeoPoint {
        latitude: 123.0,
        longitude: 0.0,
    };
    let invalid = core
        .services
        .waitlist
        .join(event.id, "walker", Some(nonsense))
        .await;
    assert!(matches!(invalid, Err(WaitlistError::InvalidArgument(_))));

    let spot = GeoPoint {
        latitude: 53.52,
        longitude: -113.52,
    };
    core.services
        .waitlist
        .join(event.id, "walker", Some(spot))
        .await
        .unwrap();

    let locations = core
        .services
        .waitlist
        .locations(event.id, &organizer.user_id)
        .await
        .unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].user_id, "walker");
    assert_eq!(locations[0].location, spot);

    let peek = core.services.waitlist.locations(event.id, "walker").await;
    assert!(matches!(peek, Err(WaitlistError::Forbidden)));
}

#[traced_test]
#[tokio::test]
async fn completed_lottery_closes_the_list() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.open_event(&organizer, draft("Wrapped up")).await;
    core.services
        .lottery
        .complete_lottery(event.id, OffsetDateTime::now_utc())
        .await
        .unwrap();

    let join = core.services.waitlist.join(event.id, &uid(), None).await;
    assert!(matches!(join, Err(WaitlistError::RegistrationClosed)));
}

#[traced_test]
#[tokio::test]
async fn unknown_event() {
    let core = Core::new();
    let join = core.services.waitlist.join(Uuid::new_v4(), "u1", None).await;
    assert!(matches!(join, Err(WaitlistError::NotFound)));

    let blank = core.services.waitlist.join(Uuid::new_v4(), " ", None).await;
    assert!(matches!(blank, Err(WaitlistError::InvalidArgument(_))));
}

#[traced_test]
#[tokio::test]
async fn joins_wait_for_registration_to_start() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let now = OffsetDateTime::now_utc();
    let event = core
        .event(
            &organizer,
            EventDraft {
                registration_start: Some(now + Duration::days(3)),
                registration_end: Some(now + Duration::days(5)),
                ..draft("Next week")
            },
        )
        .await;

    let early = core.services.waitlist.join(event.id, "eager", None).await;
    assert!(matches!(early, Err(WaitlistError::RegistrationNotOpen)));
    assert_eq!(core.services.waitlist.size(event.id).await.unwrap(), 0);
}

#[traced_test]
#[tokio::test]
async fn joins_stop_when_registration_ends() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.closed_event(&organizer, 2).await;

    let late = core.services.waitlist.join(event.id, "tardy", None).await;
    assert!(matches!(late, Err(WaitlistError::RegistrationClosed)));
    assert_eq!(core.services.waitlist.size(event.id).await.unwrap(), 0);

    let unbounded = core.event(&organizer, draft("Any time")).await;
    core.services
        .waitlist
        .join(unbounded.id, "tardy", None)
        .await
        .unwrap();
}

#[traced_test]
#[tokio::test]
async fn join_retries_after_a_competing_write() {
    let store = ContestedStore::new();
    let core = Core::with_store(store.clone());
    let organizer = core.user(Role::Organizer).await;
    let event = core
        .open_event(
            &organizer,
            EventDraft {
                max_waiting_list: Some(2),
                ..draft("Busy")
            },
        )
        .await;

    store.arm_event_rival(1, |event| event.waiting_list.push("rival".to_string()));
    let event = core.services.waitlist.join(event.id, "me", None).await.unwrap();

    assert_eq!(store.lost_writes(), 1);
    assert_eq!(event.waiting_list, vec!["rival".to_string(), "me".to_string()]);
    let stored = core.services.events.get(event.id).await.unwrap();
    assert_eq!(stored.waiting_list, event.waiting_list);
}

#[traced_test]
#[tokio::test]
async fn join_rechecks_capacity_after_losing_a_write() {
    let store = ContestedStore::new();
    let core = Core::with_store(store.clone());
    let organizer = core.user(Role::Organizer).await;
    let event = core
        .open_event(
            &organizer,
            EventDraft {
                max_waiting_list: Some(1),
                ..draft("Last seat")
            },
        )
        .await;

    store.arm_event_rival(1, |event| event.waiting_list.push("rival".to_string()));
    let join = core.services.waitlist.join(event.id, "me", None).await;

    assert!(matches!(join, Err(WaitlistError::ListFull)));
    let stored = core.services.events.get(event.id).await.unwrap();
    assert_eq!(stored.waiting_list, vec!["rival".to_string()]);
}

#[traced_test]
#[tokio::test]
async fn endless_conflicts_make_the_store_unavailable() {
    let store = ContestedStore::new();
    let core = Core::with_store(store.clone());
    let organizer = core.user(Role::Organizer).await;
    let event = core.open_event(&organizer, draft("Stampede")).await;

    store.arm_event_rival(u32::MAX, |_| {});
    let join = core.services.waitlist.join(event.id, "me", None).await;

    assert!(matches!(join, Err(WaitlistError::Store(StoreError::Unavailable))));
    assert_eq!(store.lost_writes(), RETRIES + 1);
    let stored = core.services.events.get(event.id).await.unwrap();
    assert!(!stored.is_on_waiting_list("me"));
}

#[traced_test]
#[tokio::test]
async fn failed_location_write_keeps_the_join() {
    let store = ContestedStore::new();
    let core = Core::with_store(store.clone());
    let organizer = core.user(Role::Organizer).await;
    let event = core
        .open_event(
            &organizer,
            EventDraft {
                geolocation_required: true,
                ..draft("Trail run")
            },
        )
        .await;

    store.fail_locations();
    let spot = GeoPoint {
        latitude: 53.52,
        longitude: -113.52,
    };
    core.services
        .waitlist
        .join(event.id, "runner", Some(spot))
        .await
        .unwrap();

    let stored = core.services.events.get(event.id).await.unwrap();
    assert_eq!(stored.waiting_list, vec!["runner".to_string()]);
    let locations = core
        .services
        .waitlist
        .locations(event.id, &organizer.user_id)
        .await
        .unwrap();
    assert!(locations.is_empty());
}
