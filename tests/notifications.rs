use eventdraw::utils::notifications::errors::NotificationError;
use eventdraw::utils::notifications::models::{Audience, NotificationKind};
use eventdraw::utils::users::models::{Role, UserPreferences};
use time::OffsetDateTime;
use tracing_test::traced_test;
use uuid::Uuid;

use crate::tools::Core;

mod tools;

/// Closed event with A and B invited and C left waiting.
async fn drawn_event(core: &Core) -> (eventdraw::utils::users::models::User, Uuid) {
    let organizer = core.user(Role::Organizer).await;
    let event = core.closed_event(&organizer, 2).await;
    core.services
        .invitations
        .create_invites(event.id, &organizer.user_id, &["A".to_string(), "B".to_string()])
        .await
        .unwrap();
    core.enlist(event.id, &["A", "B", "C"]).await;
    (organizer, event.id)
}

#[traced_test]
#[tokio::test]
async fn broadcast_reaches_the_chosen_audience() {
    let core = Core::new();
    let (organizer, event_id) = drawn_event(&core).await;
    let fanout = &core.services.notifications;

    let waitlist = fanout
        .broadcast(event_id, &organizer.user_id, Audience::Waitlist, "Hang on", "More seats soon")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(waitlist.organizer_id.as_deref(), Some(organizer.user_id.as_str()));

    fanout
        .broadcast(event_id, &organizer.user_id, Audience::Selected, "See you", "Doors at 7")
        .await
        .unwrap();

    let titles = |feed: Vec<eventdraw::utils::notifications::models::Notification>| {
        feed.into_iter().map(|n| n.title).collect::<Vec<_>>()
    };
    assert_eq!(titles(fanout.feed("C").await.unwrap()), vec!["Hang on"]);
    assert_eq!(titles(fanout.feed("A").await.unwrap()), vec!["See you"]);

    let nobody = fanout
        .broadcast(event_id, &organizer.user_id, Audience::Cancelled, "Sorry", "Next time")
        .await
        .unwrap();
    assert!(nobody.is_none());
}

#[traced_test]
#[tokio::test]
async fn broadcast_is_for_the_organizer() {
    let core = Core::new();
    let (organizer, event_id) = drawn_event(&core).await;
    let fanout = &core.services.notifications;

    let stranger = fanout
        .broadcast(event_id, "A", Audience::Everyone, "Hi", "Hello")
        .await;
    assert!(matches!(stranger, Err(NotificationError::Forbidden)));

    let blank = fanout
        .broadcast(event_id, &organizer.user_id, Audience::Everyone, " ", "Hello")
        .await;
    assert!(matches!(blank, Err(NotificationError::InvalidArgument(_))));

    let missing = fanout
        .broadcast(Uuid::new_v4(), &organizer.user_id, Audience::Everyone, "Hi", "Hello")
        .await;
    assert!(matches!(missing, Err(NotificationError::EventNotFound)));
}

#[traced_test]
#[tokio::test]
async fn duplicate_recipients_get_one_row() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.closed_event(&organizer, 1).await;

    let written = core
        .services
        .notifications
        .notify_event_transition(
            &event,
            &["dup".to_string(), "dup".to_string()],
            NotificationKind::LotteryWon,
        )
        .await
        .unwrap();
    assert!(written.is_some());
    assert_eq!(core.services.notifications.feed("dup").await.unwrap().len(), 1);

    let empty = core
        .services
        .notifications
        .notify_event_transition(&event, &[], NotificationKind::LotteryLost)
        .await
        .unwrap();
    assert!(empty.is_none());
}

#[traced_test]
#[tokio::test]
async fn opted_out_users_keep_the_feed_row_without_a_push() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.closed_event(&organizer, 1).await;
    let quiet = core.user(Role::Entrant).await;
    core.services
        .users
        .update_preferences(
            &quiet.user_id,
            UserPreferences {
                system_notifications: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let loud = core.user(Role::Entrant).await;

    core.services
        .notifications
        .notify_event_transition(
            &event,
            &[quiet.user_id.clone(), loud.user_id.clone()],
            NotificationKind::LotteryLost,
        )
        .await
        .unwrap();

    assert_eq!(core.services.notifications.feed(&quiet.user_id).await.unwrap().len(), 1);
    let pushes = core.channel.wait_for(1).await;
    // give a stray push a chance to show up
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let pushes_later = core.channel.pushes().await;
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes_later.len(), 1);
    assert_eq!(pushes[0].0, loud.user_id);
}

#[traced_test]
#[tokio::test]
async fn delete_retracts_for_everyone() {
    let core = Core::new();
    let (organizer, event_id) = drawn_event(&core).await;
    let fanout = &core.services.notifications;
    let notification = fanout
        .broadcast(event_id, &organizer.user_id, Audience::Selected, "Oops", "Wrong room")
        .await
        .unwrap()
        .unwrap();
    core.channel.wait_for(2).await;

    let entrant = core.user(Role::Entrant).await;
    let denied = fanout.delete(notification.id, &entrant).await;
    assert!(matches!(denied, Err(NotificationError::Forbidden)));

    let deleted = fanout.delete(notification.id, &organizer).await.unwrap();
    assert!(deleted.deleted);
    assert!(fanout.feed("A").await.unwrap().is_empty());

    let pushes = core.channel.wait_for(4).await;
    let retractions = pushes.iter().filter(|(_, message)| message.deleted).count();
    assert_eq!(retractions, 2);

    let admin = core.user(Role::Admin).await;
    let again = fanout.delete(notification.id, &admin).await.unwrap();
    assert!(again.deleted);

    let missing = fanout.delete(Uuid::new_v4(), &admin).await;
    assert!(matches!(missing, Err(NotificationError::NotFound)));
}

#[traced_test]
#[tokio::test]
async fn feed_is_newest_first() {
    let core = Core::new();
    let organizer = core.user(Role::Organizer).await;
    let event = core.closed_event(&organizer, 1).await;
    for kind in [NotificationKind::LotteryLost, NotificationKind::LotteryWon] {
        core.services
            .notifications
            .notify_event_transition(&event, &["reader".to_string()], kind)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let feed = core.services.notifications.feed("reader").await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].title, "Won event lottery");
    assert!(feed[0].created_at >= feed[1].created_at);
    assert!(feed[1].created_at <= OffsetDateTime::now_utc());
}
