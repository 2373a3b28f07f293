#![allow(dead_code)]

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventdraw::app;
use eventdraw::config::environment::Environment;
use eventdraw::config::store::StoreSettings;
use eventdraw::modules::{Modules, Services};
use eventdraw::store::errors::StoreError;
use eventdraw::store::memory::MemoryStore;
use eventdraw::store::{Change, DocumentStore, Store};
use eventdraw::utils::events::models::{Event, EventDraft, WaitlistLocation};
use eventdraw::utils::invitations::models::{Invitation, InvitationDraft, InvitationFilter};
use eventdraw::utils::notifications::models::{Notification, NotificationDraft};
use eventdraw::utils::notifications::models::PushMessage;
use eventdraw::utils::notifications::PushChannel;
use eventdraw::utils::users::models::{Role, User};
use reqwest::Client;
use time::OffsetDateTime;
use tokio::sync::{broadcast, Mutex};

pub const INSTALLATION: &str = "X-Installation-Id";

/// Push channel that keeps every delivery for inspection.
#[derive(Default)]
pub struct RecordingChannel {
    pushes: Mutex<Vec<(String, PushMessage)>>,
}

#[async_trait]
impl PushChannel for RecordingChannel {
    async fn push(
        &self,
        recipient_id: &str,
        _device_token: Option<&str>,
        message: &PushMessage,
    ) -> anyhow::Result<()> {
        self.pushes
            .lock()
            .await
            .push((recipient_id.to_string(), message.clone()));
        Ok(())
    }
}

impl RecordingChannel {
    pub async fn pushes(&self) -> Vec<(String, PushMessage)> {
        self.pushes.lock().await.clone()
    }

    /// Pushes run on spawned tasks, wait until `count` arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, PushMessage)> {
        for _ in 0..100 {
            let pushes = self.pushes().await;
            if pushes.len() >= count {
                return pushes;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.pushes().await
    }
}

pub struct Core {
    pub services: Services,
    pub channel: Arc<RecordingChannel>,
}

pub const RETRIES: u32 = 16;

impl Core {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Store) -> Self {
        let channel = Arc::new(RecordingChannel::default());
        Self {
            services: Services::new(store, channel.clone(), RETRIES),
            channel,
        }
    }

    /// Puts entrants on the list directly, bypassing the registration window.
    pub async fn enlist(&self, event_id: uuid::Uuid, user_ids: &[&str]) {
        let store = &self.services.store;
        let mut event = store.fetch_event(event_id).await.unwrap().unwrap();
        event
            .waiting_list
            .extend(user_ids.iter().map(|id| id.to_string()));
        assert!(store.replace_event(&event).await.unwrap());
    }

    pub async fn user(&self, role: Role) -> User {
        let user = User {
            role,
            ..User::entrant(&uid())
        };
        self.services.store.upsert_user(&user).await.unwrap();
        user
    }

    pub async fn event(&self, organizer: &User, draft: EventDraft) -> Event {
        self.services.events.create(organizer, draft).await.unwrap()
    }

    /// Event whose registration closed an hour ago.
    pub async fn closed_event(&self, organizer: &User, max_attendees: i32) -> Event {
        let now = OffsetDateTime::now_utc();
        self.event(
            organizer,
            EventDraft {
                name: format!("Event {}", uid()),
                max_attendees: Some(max_attendees),
                registration_start: Some(now - time::Duration::days(2)),
                registration_end: Some(now - time::Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
    }

    /// Event still accepting registrations for a day.
    pub async fn open_event(&self, organizer: &User, draft: EventDraft) -> Event {
        let now = OffsetDateTime::now_utc();
        self.event(
            organizer,
            EventDraft {
                registration_start: Some(now - time::Duration::hours(1)),
                registration_end: Some(now + time::Duration::days(1)),
                ..draft
            },
        )
        .await
    }
}

pub fn draft(name: &str) -> EventDraft {
    EventDraft {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn uid() -> String {
    nanoid::nanoid!()
}

async fn spawn_app(store: Store) -> (SocketAddr, Services) {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).unwrap();
    let addr = listener.local_addr().unwrap();

    let modules = Modules::use_custom(
        store,
        Arc::new(RecordingChannel::default()),
        addr,
        StoreSettings::default(),
        Environment::Development,
    );
    let services = modules.services().clone();
    let router = app(&modules).await;

    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service())
            .await
            .unwrap()
    });

    (addr, services)
}

pub struct AppData {
    pub addr: SocketAddr,
    pub services: Services,
}

impl AppData {
    pub async fn new() -> Self {
        let (addr, services) = spawn_app(Arc::new(MemoryStore::new())).await;
        Self { addr, services }
    }

    pub fn client(&self) -> Client {
        Client::builder()
            .build()
            .expect("Failed to build reqwest client")
    }

    pub fn api(&self, uri: &str) -> String {
        format!("http://{}{uri}", self.addr)
    }

    pub async fn user(&self, role: Role) -> User {
        let user = User {
            role,
            ..User::entrant(&uid())
        };
        self.services.store.upsert_user(&user).await.unwrap();
        user
    }
}

type EventRival = Arc<dyn Fn(&mut Event) + Send + Sync>;
type InvitationRival = Arc<dyn Fn(&mut Invitation) + Send + Sync>;

fn take(armed: &AtomicU32) -> bool {
    armed
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Memory store where a rival writer commits between a service's read and its
/// write, for as many writes as it is armed for.
#[derive(Default)]
pub struct ContestedStore {
    inner: MemoryStore,
    event_rivals: AtomicU32,
    event_rival: std::sync::Mutex<Option<EventRival>>,
    invitation_rivals: AtomicU32,
    invitation_rival: std::sync::Mutex<Option<InvitationRival>>,
    draw_rivals: AtomicU32,
    failing_locations: AtomicBool,
    lost_writes: AtomicU32,
}

impl ContestedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next `times` event writes find `rival` applied to the stored event.
    pub fn arm_event_rival(
        &self,
        times: u32,
        rival: impl Fn(&mut Event) + Send + Sync + 'static,
    ) {
        *self.event_rival.lock().unwrap() = Some(Arc::new(rival));
        self.event_rivals.store(times, Ordering::SeqCst);
    }

    pub fn arm_invitation_rival(
        &self,
        times: u32,
        rival: impl Fn(&mut Invitation) + Send + Sync + 'static,
    ) {
        *self.invitation_rival.lock().unwrap() = Some(Arc::new(rival));
        self.invitation_rivals.store(times, Ordering::SeqCst);
    }

    /// The next `times` draws find one extra entrant invited by a rival draw.
    pub fn arm_draw_rival(&self, times: u32) {
        self.draw_rivals.store(times, Ordering::SeqCst);
    }

    pub fn fail_locations(&self) {
        self.failing_locations.store(true, Ordering::SeqCst);
    }

    /// Compare-and-swap writes that found the version moved.
    pub fn lost_writes(&self) -> u32 {
        self.lost_writes.load(Ordering::SeqCst)
    }

    async fn rival_event_write(&self, event_id: uuid::Uuid) {
        if !take(&self.event_rivals) {
            return;
        }
        let rival = self.event_rival.lock().unwrap().clone();
        let mut stored = self.inner.fetch_event(event_id).await.unwrap().unwrap();
        if let Some(rival) = rival {
            rival(&mut stored);
        }
        assert!(self.inner.replace_event(&stored).await.unwrap());
    }

    async fn rival_draw(&self, event_id: uuid::Uuid, now: OffsetDateTime) {
        if !take(&self.draw_rivals) {
            return;
        }
        let stored = self.inner.fetch_event(event_id).await.unwrap().unwrap();
        let invited = self
            .inner
            .query_invitations(&InvitationFilter::event(event_id))
            .await
            .unwrap();
        let Some(entrant) = stored
            .waiting_list
            .iter()
            .find(|entrant| !invited.iter().any(|inv| &inv.recipient_id == *entrant))
        else {
            return;
        };
        let draft = InvitationDraft::new(event_id, &stored.organizer_id, entrant);
        assert!(self
            .inner
            .commit_draw(&stored, vec![draft], now)
            .await
            .unwrap()
            .is_some());
    }

    fn tally(&self, committed: bool) -> bool {
        if !committed {
            self.lost_writes.fetch_add(1, Ordering::SeqCst);
        }
        committed
    }
}

#[async_trait]
impl DocumentStore for ContestedStore {
    async fn create_event(
        &self,
        organizer_id: &str,
        draft: EventDraft,
        now: OffsetDateTime,
    ) -> Result<Event, StoreError> {
        self.inner.create_event(organizer_id, draft, now).await
    }

    async fn fetch_event(&self, event_id: uuid::Uuid) -> Result<Option<Event>, StoreError> {
        self.inner.fetch_event(event_id).await
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.inner.list_events().await
    }

    async fn replace_event(&self, event: &Event) -> Result<bool, StoreError> {
        self.rival_event_write(event.id).await;
        let committed = self.inner.replace_event(event).await?;
        Ok(self.tally(committed))
    }

    async fn commit_draw(
        &self,
        event: &Event,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<Invitation>>, StoreError> {
        self.rival_event_write(event.id).await;
        self.rival_draw(event.id, now).await;
        let committed = self.inner.commit_draw(event, drafts, now).await?;
        self.tally(committed.is_some());
        Ok(committed)
    }

    async fn record_location(&self, entry: WaitlistLocation) -> Result<(), StoreError> {
        if self.failing_locations.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        self.inner.record_location(entry).await
    }

    async fn list_locations(
        &self,
        event_id: uuid::Uuid,
    ) -> Result<Vec<WaitlistLocation>, StoreError> {
        self.inner.list_locations(event_id).await
    }

    async fn create_invitations(
        &self,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Vec<Invitation>, StoreError> {
        self.inner.create_invitations(drafts, now).await
    }

    async fn fetch_invitation(
        &self,
        invitation_id: uuid::Uuid,
    ) -> Result<Option<Invitation>, StoreError> {
        self.inner.fetch_invitation(invitation_id).await
    }

    async fn replace_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        if take(&self.invitation_rivals) {
            let rival = self.invitation_rival.lock().unwrap().clone();
            let mut stored = self
                .inner
                .fetch_invitation(invitation.id)
                .await?
                .unwrap();
            if let Some(rival) = rival {
                rival(&mut stored);
            }
            assert!(self.inner.replace_invitation(&stored).await?);
        }
        let committed = self.inner.replace_invitation(invitation).await?;
        Ok(self.tally(committed))
    }

    async fn query_invitations(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        self.inner.query_invitations(filter).await
    }

    async fn create_notification(
        &self,
        draft: NotificationDraft,
        recipients: &[String],
        now: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        self.inner.create_notification(draft, recipients, now).await
    }

    async fn fetch_notification(
        &self,
        notification_id: uuid::Uuid,
    ) -> Result<Option<(Notification, Vec<String>)>, StoreError> {
        self.inner.fetch_notification(notification_id).await
    }

    async fn mark_notification_deleted(
        &self,
        notification_id: uuid::Uuid,
    ) -> Result<bool, StoreError> {
        self.inner.mark_notification_deleted(notification_id).await
    }

    async fn user_feed(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        self.inner.user_feed(user_id).await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.inner.fetch_user(user_id).await
    }

    async fn fetch_users(&self, user_ids: &[String]) -> Result<Vec<User>, StoreError> {
        self.inner.fetch_users(user_ids).await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.upsert_user(user).await
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.inner.changes()
    }
}
