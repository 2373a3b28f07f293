//! Lottery draws for capacity-constrained events.
//!
//! A draw is a top-up: it fills the seats not yet taken by accepted or pending
//! invitations with uniformly random entrants from the part of the waiting list
//! that never held an invitation. The winners' invitations are committed
//! together with a compare-and-swap on the event, so two draws racing for the
//! same seats cannot both succeed; the loser re-reads and recomputes.

pub mod errors;
pub mod ticker;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use time::OffsetDateTime;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::store::{contended, Store};
use crate::utils::events::models::Event;
use crate::utils::invitations::models::{
    Invitation, InvitationDraft, InvitationFilter, InvitationState,
};
use crate::utils::notifications::models::NotificationKind;
use crate::utils::notifications::NotificationFanout;

use self::errors::LotteryError;

/// Whether a draw may run now. Anything else is a silent no-op for the poller.
pub fn is_eligible(event: &Event, now: OffsetDateTime) -> bool {
    !event.lottery_complete
        && event.registration_end.map_or(false, |end| now >= end)
        && !event.waiting_list.is_empty()
        && event.max_attendees.map_or(false, |max| max > 0)
}

/// Uniformly random `min(remaining_capacity, |waiting_list|)` distinct entrants.
pub fn select_winners(waiting_list: &[String], remaining_capacity: usize) -> Vec<String> {
    select_winners_with(waiting_list, remaining_capacity, &mut StdRng::from_entropy())
}

pub fn select_winners_with<R: Rng + ?Sized>(
    waiting_list: &[String],
    remaining_capacity: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut pool = waiting_list.to_vec();
    pool.shuffle(rng);
    pool.truncate(remaining_capacity);
    pool
}

/// Seats not held by an accepted or pending invitation.
pub fn open_seats(event: &Event, invitations: &[Invitation]) -> usize {
    let max = event.max_attendees.unwrap_or(0).max(0) as usize;
    let taken = invitations
        .iter()
        .filter(|inv| {
            matches!(
                inv.state(),
                InvitationState::Accepted | InvitationState::Pending
            )
        })
        .count();
    max.saturating_sub(taken)
}

/// Waiting entrants that never held an invitation for the event.
pub fn eligible_pool(event: &Event, invitations: &[Invitation]) -> Vec<String> {
    event
        .waiting_list
        .iter()
        .filter(|entrant| !invitations.iter().any(|inv| &inv.recipient_id == *entrant))
        .cloned()
        .collect()
}

/// Result of one draw attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draw {
    pub invitations: Vec<Invitation>,
    /// Entrants told they lost, only set on the first draw of an event.
    pub losers: Vec<String>,
}

impl Draw {
    pub fn winners(&self) -> Vec<String> {
        self.invitations
            .iter()
            .map(|inv| inv.recipient_id.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct LotteryEngine {
    store: Store,
    fanout: NotificationFanout,
    retries: u32,
}

impl LotteryEngine {
    pub fn new(store: Store, fanout: NotificationFanout, retries: u32) -> Self {
        Self {
            store,
            fanout,
            retries,
        }
    }

    async fn fetch(&self, event_id: Uuid) -> Result<Event, LotteryError> {
        self.store
            .fetch_event(event_id)
            .await?
            .ok_or(LotteryError::NotFound)
    }

    /// Runs a draw if the event is eligible, otherwise returns an empty draw.
    pub async fn draw(&self, event_id: Uuid, now: OffsetDateTime) -> Result<Draw, LotteryError> {
        self.run_draw(event_id, now, None).await
    }

    /// Replacement pass after `declined_count` invitations were rejected.
    pub async fn draw_replacements(
        &self,
        event_id: Uuid,
        declined_count: usize,
        now: OffsetDateTime,
    ) -> Result<Draw, LotteryError> {
        self.run_draw(event_id, now, Some(declined_count)).await
    }

    async fn run_draw(
        &self,
        event_id: Uuid,
        now: OffsetDateTime,
        limit: Option<usize>,
    ) -> Result<Draw, LotteryError> {
        for _ in 0..=self.retries {
            let mut event = self.fetch(event_id).await?;
            if !is_eligible(&event, now) {
                trace!("Event {event_id} not eligible for a draw");
                return Ok(Draw::default());
            }

            let existing = self
                .store
                .query_invitations(&InvitationFilter::event(event_id))
                .await?;
            let seats = open_seats(&event, &existing);
            let seats = limit.map_or(seats, |limit| seats.min(limit));
            let pool = eligible_pool(&event, &existing);

            let winners = select_winners(&pool, seats);
            if winners.is_empty() {
                trace!(
                    "Nothing to draw for {event_id}: {seats} seats, {} in pool",
                    pool.len()
                );
                return Ok(Draw::default());
            }

            let drafts = winners
                .iter()
                .map(|winner| InvitationDraft::new(event_id, &event.organizer_id, winner))
                .collect();
            event.touch(now);
            let Some(invitations) = self.store.commit_draw(&event, drafts, now).await? else {
                debug!("Draw for {event_id} lost a race, retrying");
                continue;
            };

            let losers = if existing.is_empty() {
                pool.into_iter()
                    .filter(|entrant| !winners.contains(entrant))
                    .collect()
            } else {
                Vec::new()
            };
            info!(
                "Drew {} winners for event {event_id} ({} not selected)",
                winners.len(),
                losers.len()
            );

            let draw = Draw {
                invitations,
                losers,
            };
            self.announce(&event, &draw).await;
            return Ok(draw);
        }

        Err(contended("event", event_id, self.retries + 1).into())
    }

    async fn announce(&self, event: &Event, draw: &Draw) {
        let winners = draw.winners();
        if let Err(e) = self
            .fanout
            .notify_event_transition(event, &winners, NotificationKind::LotteryWon)
            .await
        {
            warn!("Failed to notify winners of {}: {e}", event.id);
        }
        if let Err(e) = self
            .fanout
            .notify_event_transition(event, &draw.losers, NotificationKind::LotteryLost)
            .await
        {
            warn!("Failed to notify entrants not selected for {}: {e}", event.id);
        }
    }

    /// Organizer command: closes registration now if it is still open, then draws.
    pub async fn draw_now(
        &self,
        event_id: Uuid,
        organizer_id: &str,
        now: OffsetDateTime,
    ) -> Result<Draw, LotteryError> {
        let mut attempts = 0;
        loop {
            let mut event = self.fetch(event_id).await?;
            if !event.is_organized_by(organizer_id) {
                return Err(LotteryError::Forbidden);
            }
            if event.lottery_complete {
                return Err(LotteryError::AlreadyComplete);
            }
            if event.registration_ended(now) {
                break;
            }

            event.registration_end = Some(now);
            event.touch(now);
            if self.store.replace_event(&event).await? {
                debug!("Registration for {event_id} closed early by the organizer");
                break;
            }
            attempts += 1;
            if attempts > self.retries {
                return Err(contended("event", event_id, attempts).into());
            }
        }

        self.draw(event_id, now).await
    }

    /// Marks the lottery finished. Completing twice is fine.
    pub async fn complete_lottery(
        &self,
        event_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Event, LotteryError> {
        for _ in 0..=self.retries {
            let mut event = self.fetch(event_id).await?;
            if event.lottery_complete {
                trace!("Lottery for {event_id} already complete");
                return Ok(event);
            }

            event.lottery_complete = true;
            event.touch(now);
            if self.store.replace_event(&event).await? {
                info!("Lottery for {event_id} complete");
                event.version += 1;
                return Ok(event);
            }
        }

        Err(contended("event", event_id, self.retries + 1).into())
    }

    pub async fn complete_lottery_as(
        &self,
        event_id: Uuid,
        organizer_id: &str,
        now: OffsetDateTime,
    ) -> Result<Event, LotteryError> {
        if !self.fetch(event_id).await?.is_organized_by(organizer_id) {
            return Err(LotteryError::Forbidden);
        }
        self.complete_lottery(event_id, now).await
    }

    /// One scheduler pass over every event. Returns how many draws invited someone.
    pub async fn run_due(&self, now: OffsetDateTime) -> Result<usize, LotteryError> {
        let mut drawn = 0;
        for event in self.store.list_events().await? {
            if !is_eligible(&event, now) {
                continue;
            }
            match self.draw(event.id, now).await {
                Ok(draw) if !draw.invitations.is_empty() => drawn += 1,
                Ok(_) => {}
                Err(e) => warn!("Scheduled draw for {} failed: {e}", event.id),
            }
        }
        Ok(drawn)
    }
}

#[cfg(test)]
mod lottery_tests {
    use std::collections::{HashMap, HashSet};

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use time::macros::datetime;

    use super::*;
    use crate::utils::events::models::EventDraft;
    use crate::utils::invitations::models::InvitationDraft;

    fn entrants(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user-{i}")).collect()
    }

    fn event(waiting_list: &[&str], max_attendees: Option<i32>) -> Event {
        let mut event = Event::new(
            Uuid::new_v4(),
            "organizer",
            EventDraft {
                name: "Pottery".to_string(),
                max_attendees,
                registration_end: Some(datetime!(2024-05-01 18:00 UTC)),
                ..Default::default()
            },
            datetime!(2024-04-01 12:00 UTC),
        );
        event.waiting_list = waiting_list.iter().map(|id| id.to_string()).collect();
        event
    }

    fn invitation(event: &Event, recipient: &str, accepted: Option<bool>, cancelled: bool) -> Invitation {
        let mut inv = Invitation::new(
            Uuid::new_v4(),
            InvitationDraft::new(event.id, &event.organizer_id, recipient),
            datetime!(2024-05-01 18:00 UTC),
        );
        inv.accepted = accepted;
        inv.cancelled = cancelled;
        inv
    }

    #[test]
    fn selection_is_bounded_and_distinct() {
        let list = entrants(10);
        let mut rng = StdRng::seed_from_u64(7);
        for k in [0, 1, 3, 10, 25] {
            let winners = select_winners_with(&list, k, &mut rng);
            assert_eq!(winners.len(), k.min(10));
            let unique: HashSet<_> = winners.iter().collect();
            assert_eq!(unique.len(), winners.len());
            assert!(winners.iter().all(|w| list.contains(w)));
        }
    }

    #[test]
    fn selection_from_empty_list_is_empty() {
        assert!(select_winners(&[], 5).is_empty());
    }

    #[test]
    fn selection_is_roughly_uniform() {
        let list = entrants(10);
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 20_000;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..trials {
            for winner in select_winners_with(&list, 3, &mut rng) {
                *counts.entry(winner).or_default() += 1;
            }
        }

        // each entrant is expected 6000 times
        let expected = trials * 3 / 10;
        for entrant in &list {
            let seen = counts.get(entrant).copied().unwrap_or(0);
            assert!(
                seen.abs_diff(expected) < expected / 10,
                "{entrant} picked {seen} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn eligibility_rules() {
        let now = datetime!(2024-05-02 09:00 UTC);
        let ok = event(&["a"], Some(2));
        assert!(is_eligible(&ok, now));

        assert!(!is_eligible(&ok, datetime!(2024-05-01 17:59 UTC)));
        assert!(is_eligible(&ok, datetime!(2024-05-01 18:00 UTC)));

        let complete = Event {
            lottery_complete: true,
            ..ok.clone()
        };
        assert!(!is_eligible(&complete, now));

        let no_end = Event {
            registration_end: None,
            ..ok.clone()
        };
        assert!(!is_eligible(&no_end, now));

        assert!(!is_eligible(&event(&[], Some(2)), now));
        assert!(!is_eligible(&event(&["a"], Some(0)), now));
        assert!(!is_eligible(&event(&["a"], None), now));
    }

    #[test]
    fn open_seats_count_pending_and_accepted() {
        let event = event(&["a", "b", "c", "d"], Some(3));
        let invitations = vec![
            invitation(&event, "a", Some(true), false),
            invitation(&event, "b", None, false),
            invitation(&event, "c", Some(false), false),
            invitation(&event, "d", None, true),
        ];
        assert_eq!(open_seats(&event, &invitations), 1);
        assert_eq!(open_seats(&event, &[]), 3);
    }

    #[test]
    fn pool_excludes_everyone_ever_invited() {
        let event = event(&["a", "b", "c", "d"], Some(3));
        let invitations = vec![
            invitation(&event, "a", Some(true), false),
            invitation(&event, "c", Some(false), false),
            invitation(&event, "d", None, true),
        ];
        assert_eq!(eligible_pool(&event, &invitations), vec!["b".to_string()]);
    }
}
